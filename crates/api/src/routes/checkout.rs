//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use common::{AccountId, AddressId, ProductId};
use domain::{
    AddressSelection, BuyerContext, CartLine, CartSnapshot, ContactInfo, PaymentSelection,
    ValidationError,
};
use serde::Deserialize;
use settlement::SettlementError;
use storage::MarketStore;
use uuid::Uuid;

use crate::error::ApiError;

use super::{AppState, auth_user};
use super::orders::{OrderResponse, order_response};

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    /// The materialized cart; unit prices are captured server-side from
    /// the catalog, never taken from the client.
    pub items: Vec<CheckoutItemRequest>,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    /// A saved card id, or
    pub card_id: Option<Uuid>,
    /// a raw 16-digit card number.
    pub card_number: Option<String>,
    /// A saved address id, or
    pub address_id: Option<Uuid>,
    /// a raw address line.
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckoutItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

// -- Handlers --

/// POST /checkout — create an order from the submitted cart.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user = auth_user(&headers)?;

    // Capture unit prices from the catalog at this moment; they become
    // immutable snapshots on the order items.
    let mut lines = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = state
            .store
            .product(ProductId::from_uuid(item.product_id))
            .await?
            .filter(|p| p.is_active)
            .ok_or(ApiError::Service(SettlementError::ProductUnavailable))?;
        lines.push(CartLine {
            product: product.id,
            quantity: item.quantity,
            unit_price: product.real_price(),
        });
    }

    let payment = match (req.card_id, req.card_number) {
        (Some(id), None) => PaymentSelection::SavedCard(AccountId::from_uuid(id)),
        (None, Some(number)) => PaymentSelection::NewCard(number),
        _ => {
            return Err(ApiError::Service(
                ValidationError::new("card", "Select a saved card or supply a card number.").into(),
            ));
        }
    };
    let shipping = match (req.address_id, req.address) {
        (Some(id), None) => AddressSelection::Saved(AddressId::from_uuid(id)),
        (None, Some(text)) => AddressSelection::New(text),
        _ => {
            return Err(ApiError::Service(
                ValidationError::new("address", "Select a saved address or supply one.").into(),
            ));
        }
    };

    let buyer = BuyerContext {
        customer: user,
        contact: ContactInfo::new(req.name, req.phone_number, req.email),
        payment,
        shipping,
    };

    let receipt = state
        .checkout
        .create_order(CartSnapshot::new(lines), buyer)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(order_response(&receipt.order, &receipt.items)),
    ))
}
