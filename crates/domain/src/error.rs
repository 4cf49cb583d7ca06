//! Domain error types.

use store::{ProductId, QueryError, StoreError};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Unknown product, order or review.
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// The requested quantity exceeds what is left.
    #[error("Insufficient stock for {product_name}. Available: {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
        requested: u32,
    },

    /// No signed-in user.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Signed in, but neither the owner nor an admin.
    #[error("{0}")]
    NotAuthorized(String),

    /// The record already exists.
    #[error("{0}")]
    Duplicate(String),

    /// Unexpected persistence failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub(crate) fn not_authorized(message: impl Into<String>) -> Self {
        DomainError::NotAuthorized(message.into())
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::NotFound { .. } => "not_found",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::NotAuthenticated => "not_authenticated",
            DomainError::NotAuthorized(_) => "not_authorized",
            DomainError::Duplicate(_) => "duplicate",
            DomainError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(id) => DomainError::NotFound {
                entity: "Product",
                id: id.to_string(),
            },
            StoreError::OrderNotFound(id) => DomainError::NotFound {
                entity: "Order",
                id: id.to_string(),
            },
            StoreError::ReviewNotFound(id) => DomainError::NotFound {
                entity: "Review",
                id: id.to_string(),
            },
            StoreError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => DomainError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            },
            StoreError::DuplicateReview { .. } => {
                DomainError::Duplicate("Product already reviewed".to_string())
            }
            StoreError::TotalOverflow(_) => {
                DomainError::Validation("Order total is too large".to_string())
            }
            other => DomainError::Store(other),
        }
    }
}

impl From<QueryError> for DomainError {
    fn from(e: QueryError) -> Self {
        DomainError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{OrderId, UserId};

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let product_id = ProductId::new();

        let err: DomainError = StoreError::TotalOverflow(OrderId::new()).into();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Order total is too large");

        let err: DomainError = StoreError::ProductNotFound(product_id).into();
        assert_eq!(err.to_string(), "Product not found");
        assert_eq!(err.kind(), "not_found");

        let err: DomainError = StoreError::OrderNotFound(OrderId::new()).into();
        assert_eq!(err.to_string(), "Order not found");

        let err: DomainError = StoreError::InsufficientStock {
            product_id,
            product_name: "Widget".to_string(),
            available: 2,
            requested: 3,
        }
        .into();
        assert_eq!(err.to_string(), "Insufficient stock for Widget. Available: 2");

        let err: DomainError = StoreError::DuplicateReview {
            user_id: UserId::new(),
            product_id,
        }
        .into();
        assert!(matches!(err, DomainError::Duplicate(_)));

        let err: DomainError = StoreError::Corrupt("bad row".to_string()).into();
        assert_eq!(err.kind(), "store");
    }

    #[test]
    fn query_errors_are_validation_errors() {
        let err: DomainError = QueryError::InvalidSortField("price".to_string()).into();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Cannot sort by 'price'");
    }
}
