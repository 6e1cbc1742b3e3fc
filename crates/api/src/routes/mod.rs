//! HTTP route handlers and shared application state.

pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod stores;

use std::sync::Arc;

use axum::http::HeaderMap;
use common::{AccountId, UserId};
use settlement::{
    CheckoutService, DepositService, FulfillmentService, NotificationSink, PaymentGateway,
    SettlementEngine,
};
use storage::MarketStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketStore> {
    pub store: S,
    pub checkout: CheckoutService<S>,
    pub settlement: SettlementEngine<S>,
    pub fulfillment: FulfillmentService<S>,
    pub deposits: DepositService<S>,
}

impl<S: MarketStore + Clone> AppState<S> {
    /// Wires the services over one store and the external collaborators.
    pub fn new(
        store: S,
        notifier: Arc<dyn NotificationSink>,
        gateway: Arc<dyn PaymentGateway>,
        platform_account: AccountId,
        commission_bps: u32,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(store.clone(), notifier.clone()),
            settlement: SettlementEngine::new(
                store.clone(),
                notifier.clone(),
                platform_account,
                commission_bps,
            ),
            fulfillment: FulfillmentService::new(store.clone(), notifier),
            deposits: DepositService::new(store.clone(), gateway),
            store,
        }
    }
}

/// Reads the authenticated user from the `x-user-id` header.
///
/// Authentication itself happens upstream; this service only trusts
/// the header it is handed.
pub(crate) fn auth_user(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get("x-user-id") else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("Invalid x-user-id header".to_string()))?;
    let uuid = uuid::Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid x-user-id header: {e}")))?;
    Ok(Some(UserId::from_uuid(uuid)))
}
