use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Order, OrderId, OrderQuery, OrderStatus, Page, PlaceOrder, Product, ProductId, ProductUpdate,
    Result, Review, ReviewId, ReviewQuery,
};

/// Persistence for the storefront's products, orders and reviews.
///
/// All implementations must be thread-safe (Send + Sync). The two write
/// paths with invariants attached, [`place_order`](Self::place_order) and
/// the review writes, are each a single unit: either every effect lands or
/// none does.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a new product.
    async fn insert_product(&self, product: Product) -> Result<Product>;

    /// Retrieves a product, active or not.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Applies a partial update and returns the updated product.
    ///
    /// Fails with `ProductNotFound` if the product does not exist.
    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<Product>;

    /// Prices the requested lines and persists the order, decrementing stock.
    ///
    /// Lines are processed in the submitted order. For each line the product
    /// must exist and be active (`ProductNotFound`) and must have at least
    /// the requested quantity left (`InsufficientStock`, counting earlier
    /// lines of the same order). Unit prices are captured from the product
    /// as it is at that moment.
    ///
    /// Check-and-decrement is atomic per line and the whole order is one
    /// unit: on any failure no stock is decremented and no order is stored,
    /// and concurrent placements can never drive stock below zero.
    async fn place_order(&self, order: PlaceOrder) -> Result<Order>;

    /// Retrieves an order.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists orders matching the query.
    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>>;

    /// Overwrites an order's status and returns the updated order.
    ///
    /// Fails with `OrderNotFound` if the order does not exist.
    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order>;

    /// Stores a review and recomputes the product's rating aggregate.
    ///
    /// Fails with `ProductNotFound` if the product does not exist and
    /// `DuplicateReview` if the user already reviewed it; in both cases
    /// nothing changes. Returns the product with its new aggregate.
    async fn insert_review(&self, review: Review) -> Result<Product>;

    /// Retrieves a review.
    async fn get_review(&self, review_id: ReviewId) -> Result<Option<Review>>;

    /// Deletes a review and recomputes the product's rating aggregate.
    ///
    /// Fails with `ReviewNotFound` if the review does not exist. Returns the
    /// product with its new aggregate.
    async fn delete_review(&self, review_id: ReviewId) -> Result<Product>;

    /// Lists one product's reviews.
    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>>;
}
