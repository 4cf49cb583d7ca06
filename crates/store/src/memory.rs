use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    CatalogStore, Order, OrderId, OrderItem, OrderQuery, OrderStatus, Page, PlaceOrder, Product,
    ProductId, ProductUpdate, RatingSummary, Result, Review, ReviewId, ReviewQuery, StoreError,
};

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    reviews: HashMap<ReviewId, Review>,
}

impl CatalogState {
    fn recompute_rating(&mut self, product_id: ProductId, now: DateTime<Utc>) -> Result<Product> {
        let summary = RatingSummary::from_ratings(
            self.reviews
                .values()
                .filter(|review| review.product_id == product_id)
                .map(|review| review.rating),
        );

        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;
        product.rating = summary.rating;
        product.num_reviews = summary.num_reviews;
        product.updated_at = now;
        Ok(product.clone())
    }
}

/// In-memory catalog store.
///
/// One lock guards all state, so every write (including a whole order
/// placement) is serialized against every other. Used by tests and by the
/// server when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(&self, product: Product) -> Result<Product> {
        let mut state = self.state.write().await;
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;
        update.apply_to(product, now);
        Ok(product.clone())
    }

    async fn place_order(&self, order: PlaceOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        // Validate and price every line before touching any stock.
        let mut claimed: HashMap<ProductId, u32> = HashMap::new();
        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = state
                .products
                .get(&line.product_id)
                .filter(|product| product.is_active)
                .ok_or(StoreError::ProductNotFound(line.product_id))?;

            let already_claimed = claimed.get(&line.product_id).copied().unwrap_or(0);
            let available = product.stock.saturating_sub(already_claimed);
            if line.quantity > available {
                return Err(StoreError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    available,
                    requested: line.quantity,
                });
            }

            claimed.insert(line.product_id, already_claimed + line.quantity);
            items.push(OrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        let persisted = Order::from_lines(
            order.order_id,
            order.user_id,
            items,
            order.status,
            order.placed_at,
        )?;

        for (product_id, quantity) in claimed {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock -= quantity;
                product.updated_at = order.placed_at;
            }
        }

        state.orders.insert(persisted.id, persisted.clone());
        Ok(persisted)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| query.compare(a, b));
        Ok(Page::slice(orders, query.pagination))
    }

    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.status = status;
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn insert_review(&self, review: Review) -> Result<Product> {
        let mut state = self.state.write().await;

        if !state.products.contains_key(&review.product_id) {
            return Err(StoreError::ProductNotFound(review.product_id));
        }

        let duplicate = state.reviews.values().any(|existing| {
            existing.user_id == review.user_id && existing.product_id == review.product_id
        });
        if duplicate {
            return Err(StoreError::DuplicateReview {
                user_id: review.user_id,
                product_id: review.product_id,
            });
        }

        let product_id = review.product_id;
        let now = review.created_at;
        state.reviews.insert(review.id, review);
        state.recompute_rating(product_id, now)
    }

    async fn get_review(&self, review_id: ReviewId) -> Result<Option<Review>> {
        Ok(self.state.read().await.reviews.get(&review_id).cloned())
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<Product> {
        let mut state = self.state.write().await;
        let review = state
            .reviews
            .remove(&review_id)
            .ok_or(StoreError::ReviewNotFound(review_id))?;
        state.recompute_rating(review.product_id, Utc::now())
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<_> = state
            .reviews
            .values()
            .filter(|review| query.matches(review))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| query.compare(a, b));
        Ok(Page::slice(reviews, query.pagination))
    }
}
