//! Bearer-token authentication.
//!
//! Session issuance lives outside this service. [`Authenticator`] is the
//! seam to it; [`StaticTokenAuthenticator`] is a fixed token table for
//! deployments and tests without a session service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::{Principal, Role};
use store::{CatalogStore, UserId};
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves bearer tokens to principals.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the principal for `token`, or None if it is not valid.
    async fn authenticate(&self, token: &str) -> Option<Principal>;
}

/// Errors in an `API_TOKENS` specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenSpecError {
    #[error("Token entry '{0}' is not of the form token=user-id:role")]
    Malformed(String),

    #[error("Token entry '{entry}' has an invalid user id")]
    InvalidUserId { entry: String },

    #[error("Token entry '{entry}' has an unknown role")]
    InvalidRole { entry: String },
}

/// Authenticator backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenAuthenticator {
    /// Creates an authenticator that accepts no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as `principal`.
    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    /// Parses a comma separated `token=user-id:role` list.
    pub fn parse(spec: &str) -> Result<Self, TokenSpecError> {
        let mut authenticator = Self::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let malformed = || TokenSpecError::Malformed(entry.to_string());

            let (token, identity) = entry.split_once('=').ok_or_else(malformed)?;
            let (user_id, role) = identity.split_once(':').ok_or_else(malformed)?;
            if token.trim().is_empty() {
                return Err(malformed());
            }

            let user_id: UserId =
                user_id
                    .trim()
                    .parse()
                    .map_err(|_| TokenSpecError::InvalidUserId {
                        entry: entry.to_string(),
                    })?;
            let role: Role = role.parse().map_err(|_| TokenSpecError::InvalidRole {
                entry: entry.to_string(),
            })?;

            authenticator = authenticator.with_token(token.trim(), Principal::new(user_id, role));
        }
        Ok(authenticator)
    }

    /// Number of accepted tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).copied()
    }
}

/// Extracts the authenticated principal from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the header is missing or the token is unknown.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for Authenticated
where
    S: CatalogStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

        match state.authenticator.authenticate(token).await {
            Some(principal) => Ok(Authenticated(principal)),
            None => {
                metrics::counter!("auth_failures_total").increment(1);
                tracing::debug!("bearer token rejected");
                Err(ApiError::Unauthorized(
                    "Not authorized, token failed".to_string(),
                ))
            }
        }
    }
}

/// Like [`Authenticated`], but also requires the admin predicate (403 otherwise).
#[derive(Debug, Clone, Copy)]
pub struct AdminOnly(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for AdminOnly
where
    S: CatalogStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(principal) = Authenticated::from_request_parts(parts, state).await?;
        principal.require_admin()?;
        Ok(AdminOnly(principal))
    }
}
