use thiserror::Error;

use crate::{OrderId, ProductId, ReviewId, UserId};

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product does not exist, or is no longer active when ordering.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A line asked for more units than the product has in stock.
    #[error(
        "Insufficient stock for {product_name}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
        requested: u32,
    },

    /// A line price or the order total does not fit in an `i64` of cents.
    #[error("Order {0} total is out of range")]
    TotalOverflow(OrderId),

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The review was not found.
    #[error("Review not found: {0}")]
    ReviewNotFound(ReviewId),

    /// The user already has a review for this product.
    #[error("User {user_id} already reviewed product {product_id}")]
    DuplicateReview {
        user_id: UserId,
        product_id: ProductId,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back to a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for catalog store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
