//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path or body identifier, rejecting malformed ones with 400.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} id: {raw}")))
}
