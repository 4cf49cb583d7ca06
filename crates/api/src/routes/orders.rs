//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{ChangeOrderStatus, CreateOrder, ListOrders};
use serde::{Deserialize, Serialize};
use store::{CatalogStore, LineRequest, Order, OrderId, OrderItem, OrderStatus};

use super::parse_id;
use crate::auth::{AdminOnly, Authenticated};
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

// -- Request types --

/// Prices and totals sent by clients are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Option<Vec<OrderItemRequest>>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total_price_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status,
            items: order.items.iter().map(OrderItemResponse::from).collect(),
            total_price_cents: order.total_price.cents(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — place an order for the caller.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ApiError> {
    let Json(req) = payload?;

    let items = req
        .items
        .unwrap_or_default()
        .iter()
        .map(|item| {
            Ok(LineRequest::new(
                parse_id(&item.product, "product")?,
                item.quantity,
            ))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let mut cmd = CreateOrder::new(principal.user_id, items);
    if let Some(status) = req.status.as_deref() {
        cmd = cmd.with_status(parse_status(status)?);
    }

    let order = state.orders.create_order(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(OrderResponse::from(order))),
    ))
}

/// GET /orders/my — the caller's own orders.
#[tracing::instrument(skip(state, params))]
pub async fn list_mine<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError> {
    let Query(params) = params?;
    let page = state
        .orders
        .list_mine(&principal, list_orders(params)?)
        .await?;
    Ok(Json(ApiResponse::page(page, OrderResponse::from)))
}

/// GET /orders — every order (admin).
#[tracing::instrument(skip(state, params))]
pub async fn list_all<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminOnly(principal): AdminOnly,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError> {
    let Query(params) = params?;
    let page = state
        .orders
        .list_all(&principal, list_orders(params)?)
        .await?;
    Ok(Json(ApiResponse::page(page, OrderResponse::from)))
}

/// GET /orders/{id} — one order, for its owner or an admin.
#[tracing::instrument(skip(state))]
pub async fn get<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get(&principal, order_id).await?;
    Ok(Json(ApiResponse::ok(OrderResponse::from(order))))
}

/// PATCH /orders/{id}/status — set an order's status (admin).
#[tracing::instrument(skip(state, payload))]
pub async fn update_status<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AdminOnly(principal): AdminOnly,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let Json(req) = payload?;
    let order_id: OrderId = parse_id(&id, "order")?;
    let status = req
        .status
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))
        .and_then(parse_status)?;

    let order = state
        .orders
        .set_status(&principal, ChangeOrderStatus::new(order_id, status))
        .await?;
    Ok(Json(ApiResponse::ok(OrderResponse::from(order))))
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|e: store::UnknownStatus| ApiError::BadRequest(e.to_string()))
}

fn list_orders(params: ListOrdersParams) -> Result<ListOrders, ApiError> {
    Ok(ListOrders {
        status: params.status.as_deref().map(parse_status).transpose()?,
        sort: params.sort,
        page: params.page,
        limit: params.limit,
    })
}
