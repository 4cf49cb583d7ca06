//! Product endpoints. Reads are public, writes are admin only.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use store::{CatalogStore, Money, NewProduct, Product, ProductId, ProductUpdate};

use super::parse_id;
use crate::auth::AdminOnly;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: String,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: String,
    pub stock: u32,
    pub rating: f64,
    pub num_reviews: u32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            description: product.description,
            price_cents: product.price.cents(),
            category: product.category,
            stock: product.stock,
            rating: product.rating,
            num_reviews: product.num_reviews,
            is_active: product.is_active,
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.to_rfc3339(),
        }
    }
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state.products.get(product_id).await?;
    Ok(Json(ApiResponse::ok(ProductResponse::from(product))))
}

/// POST /products (admin)
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminOnly(principal): AdminOnly,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ApiError> {
    let Json(req) = payload?;

    let mut product = NewProduct::new(
        req.name,
        req.category,
        Money::from_cents(req.price_cents),
        req.stock,
    );
    if let Some(description) = req.description {
        product = product.with_description(description);
    }

    let product = state.products.create(&principal, product).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ProductResponse::from(product))),
    ))
}

/// PUT /products/{id} (admin)
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminOnly(principal): AdminOnly,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let Json(req) = payload?;
    let product_id: ProductId = parse_id(&id, "product")?;

    let update = ProductUpdate {
        name: req.name,
        description: req.description,
        category: req.category,
        price: req.price_cents.map(Money::from_cents),
        stock: req.stock,
        is_active: req.is_active,
    };
    let product = state.products.update(&principal, product_id, update).await?;
    Ok(Json(ApiResponse::ok(ProductResponse::from(product))))
}

/// DELETE /products/{id} (admin) — soft delete.
#[tracing::instrument(skip(state))]
pub async fn deactivate<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminOnly(principal): AdminOnly,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state.products.deactivate(&principal, product_id).await?;
    Ok(Json(ApiResponse::ok(ProductResponse::from(product))))
}
