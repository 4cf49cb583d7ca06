//! The caller's own identity.

use axum::Json;
use domain::Role;
use serde::Serialize;

use crate::auth::Authenticated;
use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub role: Role,
    pub is_admin: bool,
}

/// GET /users/me
pub async fn me(Authenticated(principal): Authenticated) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::ok(MeResponse {
        id: principal.user_id.to_string(),
        role: principal.role,
        is_admin: principal.is_admin(),
    }))
}
