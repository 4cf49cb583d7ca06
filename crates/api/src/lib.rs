//! HTTP API server for the storefront.
//!
//! Exposes orders, reviews and products over JSON, with bearer-token
//! authentication, structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::CatalogStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use auth::{AdminOnly, Authenticated, Authenticator, StaticTokenAuthenticator};
pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CatalogStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list_all::<S>),
        )
        .route("/orders/my", get(routes::orders::list_mine::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route("/reviews", post(routes::reviews::create::<S>))
        .route("/reviews/{id}", delete(routes::reviews::delete::<S>))
        .route(
            "/reviews/product/{id}",
            get(routes::reviews::list_for_product::<S>),
        )
        .route("/products", post(routes::products::create::<S>))
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::deactivate::<S>),
        )
        .route("/users/me", get(routes::users::me))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
