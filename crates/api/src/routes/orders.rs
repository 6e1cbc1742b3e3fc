//! Order detail and payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::{ItemSlug, OrderSlug};
use domain::{Order, OrderItem};
use serde::Serialize;
use storage::MarketStore;

use crate::error::ApiError;

use super::{AppState, auth_user};

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub slug: String,
    pub status: String,
    pub total_price: i64,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub slug: String,
    pub product_id: String,
    pub quantity: u32,
    pub price: i64,
    pub total_price: i64,
    pub status: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub(crate) fn order_response(order: &Order, items: &[OrderItem]) -> OrderResponse {
    OrderResponse {
        slug: order.slug.to_string(),
        status: order.status.as_str().to_string(),
        total_price: order.total_price.cents(),
        items: items.iter().map(item_response).collect(),
        created_at: order.created_at.to_rfc3339(),
    }
}

pub(crate) fn item_response(item: &OrderItem) -> OrderItemResponse {
    OrderItemResponse {
        slug: item.slug.to_string(),
        product_id: item.product.to_string(),
        quantity: item.quantity,
        price: item.price.cents(),
        total_price: item.total_price().cents(),
        status: item.status.as_str().to_string(),
    }
}

// -- Handlers --

/// GET /orders/{slug} — load an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .order_by_slug(&OrderSlug::new(slug.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {slug} not found")))?;
    let items = state.store.order_items(order.id).await?;

    Ok(Json(order_response(&order, &items)))
}

/// GET /orders/items/{slug} — load a single order item.
#[tracing::instrument(skip(state))]
pub async fn get_item<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Json<OrderItemResponse>, ApiError> {
    let item = state
        .store
        .order_item_by_slug(&ItemSlug::new(slug.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order item {slug} not found")))?;

    Ok(Json(item_response(&item)))
}

/// POST /orders/{slug}/pay — settle an order from its card balance.
#[tracing::instrument(skip(state, headers))]
pub async fn pay<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = auth_user(&headers)?;
    let order = state
        .store
        .order_by_slug(&OrderSlug::new(slug.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {slug} not found")))?;

    state.settlement.pay_order(order.id, user).await?;

    Ok(Json(MessageResponse {
        message: "Order was paid successfully.",
    }))
}
