//! Seller-facing order item status updates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::ItemSlug;
use domain::ItemStatus;
use serde::Serialize;
use settlement::SettlementError;
use storage::MarketStore;

use crate::error::ApiError;

use super::{AppState, auth_user};

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub message: &'static str,
    pub order_status: String,
}

/// POST /stores/{slug}/orders/{item_slug}/update-status/{new_status}
///
/// `new_status` is the numeric item status code, restricted to
/// Cancelled(0), Paid(2), Sent(3), Received(4).
#[tracing::instrument(skip(state, headers))]
pub async fn update_status<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path((slug, item_slug, new_status)): Path<(String, String, u8)>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let user = auth_user(&headers)?
        .ok_or(ApiError::Service(SettlementError::Ownership("store")))?;

    let store_account = state
        .store
        .store_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Store {slug} not found")))?;
    if store_account.owner != Some(user) {
        return Err(ApiError::Service(SettlementError::Ownership("store")));
    }

    if !matches!(new_status, 0 | 2 | 3 | 4) {
        return Err(ApiError::BadRequest("Invalid status value.".to_string()));
    }
    let status = ItemStatus::from_code(new_status)
        .map_err(|e| ApiError::Service(SettlementError::Status(e)))?;

    let order_status = state
        .fulfillment
        .update_item_status(store_account.id, &ItemSlug::new(item_slug), status)
        .await?;

    Ok(Json(UpdateStatusResponse {
        message: "Order status updated successfully.",
        order_status: order_status.as_str().to_string(),
    }))
}
