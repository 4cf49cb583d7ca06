//! Review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{CreateReview, ListReviews};
use serde::{Deserialize, Serialize};
use store::{CatalogStore, ProductId, Review, ReviewId};

use super::parse_id;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub product: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListReviewsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    #[serde(alias = "minRating")]
    pub min_rating: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id.to_string(),
            user_id: review.user_id.to_string(),
            product_id: review.product_id.to_string(),
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

/// POST /reviews — review a product as the caller.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    let Json(req) = payload?;

    let (Some(product), Some(rating)) = (req.product.as_deref(), req.rating) else {
        return Err(ApiError::BadRequest(
            "Product and rating are required".to_string(),
        ));
    };
    let product_id: ProductId = parse_id(product, "product")?;
    let rating = u8::try_from(rating)
        .map_err(|_| ApiError::BadRequest("Rating must be between 1 and 5".to_string()))?;

    let review = state
        .reviews
        .create(
            &principal,
            CreateReview::new(product_id, rating, req.comment.unwrap_or_default()),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ReviewResponse::from(review))),
    ))
}

/// DELETE /reviews/{id} — delete one of the caller's reviews.
#[tracing::instrument(skip(state))]
pub async fn delete<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let review_id: ReviewId = parse_id(&id, "review")?;
    state.reviews.delete(&principal, review_id).await?;
    Ok(Json(ApiResponse::ok(
        serde_json::json!({ "message": "Review removed" }),
    )))
}

/// GET /reviews/product/{id} — a product's reviews, newest first.
#[tracing::instrument(skip(state, params))]
pub async fn list_for_product<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    params: Result<Query<ListReviewsParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    let Query(params) = params?;
    let product_id: ProductId = parse_id(&id, "product")?;

    let page = state
        .reviews
        .list_for_product(
            product_id,
            ListReviews {
                min_rating: params.min_rating,
                sort: params.sort,
                page: params.page,
                limit: params.limit,
            },
        )
        .await?;
    Ok(Json(ApiResponse::page(page, ReviewResponse::from)))
}
