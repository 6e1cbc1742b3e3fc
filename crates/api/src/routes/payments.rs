//! Deposit creation and the payment gateway webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{AccountId, TransactionId};
use domain::Money;
use serde::{Deserialize, Serialize};
use settlement::GatewayCallback;
use storage::MarketStore;
use uuid::Uuid;

use crate::error::ApiError;

use super::AppState;

// -- Request/response types --

#[derive(Deserialize)]
pub struct DepositRequest {
    /// Amount in minor currency units.
    pub amount: i64,
}

#[derive(Serialize)]
pub struct DepositResponse {
    pub redirect_url: String,
}

/// Webhook body: `{event, object: {metadata, income_amount}}`.
#[derive(Deserialize)]
pub struct CallbackRequest {
    pub event: String,
    pub object: CallbackObject,
}

#[derive(Deserialize)]
pub struct CallbackObject {
    pub metadata: CallbackMetadata,
    /// Amount the gateway confirms it collected, in minor units.
    pub income_amount: i64,
}

#[derive(Deserialize)]
pub struct CallbackMetadata {
    pub transaction_uuid: Uuid,
    pub card_uuid: Uuid,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
}

// -- Handlers --

/// POST /cards/{id}/deposits — start a gateway deposit.
#[tracing::instrument(skip(state, req))]
pub async fn create_deposit<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DepositRequest>,
) -> Result<(axum::http::StatusCode, Json<DepositResponse>), ApiError> {
    let redirect_url = state
        .deposits
        .create_deposit(AccountId::from_uuid(id), Money::from_cents(req.amount))
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(DepositResponse { redirect_url }),
    ))
}

/// POST /payment-callback — gateway webhook.
///
/// Unauthenticated; signature validation happens upstream. Replays are
/// acknowledged with 200 and change nothing.
#[tracing::instrument(skip(state, req), fields(event = %req.event))]
pub async fn callback<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, ApiError> {
    state
        .deposits
        .handle_callback(GatewayCallback {
            event: req.event,
            transaction: TransactionId::from_uuid(req.object.metadata.transaction_uuid),
            account: AccountId::from_uuid(req.object.metadata.card_uuid),
            income_amount: Money::from_cents(req.object.income_amount),
        })
        .await?;

    Ok(Json(CallbackResponse { status: "ok" }))
}
