//! Shared application state.

use std::sync::Arc;

use domain::{OrderService, ProductService, ReviewService};
use store::CatalogStore;

use crate::auth::Authenticator;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CatalogStore> {
    pub orders: OrderService<S>,
    pub reviews: ReviewService<S>,
    pub products: ProductService<S>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl<S: CatalogStore + Clone> AppState<S> {
    /// Builds the services over one shared store.
    pub fn new(store: S, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            reviews: ReviewService::new(store.clone()),
            products: ProductService::new(store),
            authenticator,
        }
    }
}
