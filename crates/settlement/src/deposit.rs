//! Card funding through the asynchronous payment gateway.
//!
//! Two-phase flow: `create_deposit` persists a Pending ledger
//! transaction and returns the gateway redirect URL; the balance only
//! moves when the gateway's webhook confirms, on a separate callback
//! path. Replayed callbacks are no-ops.

use std::sync::Arc;

use common::{AccountId, TransactionId};
use domain::{Money, NewTransaction, TransactionStatus, ValidationError};
use storage::MarketStore;

use crate::error::{Result, SettlementError};
use crate::gateway::{PaymentGateway, PaymentRequest};

/// A parsed gateway webhook callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCallback {
    /// Gateway event name (`succeeded`, `canceled`).
    pub event: String,
    /// The pending transaction referenced in request metadata.
    pub transaction: TransactionId,
    /// The card referenced in request metadata.
    pub account: AccountId,
    /// The amount the gateway confirms it collected.
    pub income_amount: Money,
}

/// Initiates deposits and settles gateway callbacks.
pub struct DepositService<S> {
    store: S,
    gateway: Arc<dyn PaymentGateway>,
}

impl<S: MarketStore> DepositService<S> {
    /// Creates a new deposit service.
    pub fn new(store: S, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Starts a deposit and returns the gateway redirect URL.
    ///
    /// The Pending transaction is committed before the gateway is
    /// contacted; if the gateway fails it stays Pending for
    /// reconciliation rather than being lost.
    #[tracing::instrument(skip(self))]
    pub async fn create_deposit(&self, account_id: AccountId, amount: Money) -> Result<String> {
        if !amount.is_positive() {
            return Err(SettlementError::NonPositiveDeposit);
        }

        let account = self
            .store
            .account(account_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("card"))?;
        if !account.is_card() {
            return Err(ValidationError::new("card", "Deposits require a card account.").into());
        }

        let mut tx = self.store.begin().await?;
        let pending = tx
            .insert_transaction(NewTransaction::deposit(account_id, amount))
            .await?;
        tx.commit().await?;

        metrics::counter!("deposits_initiated_total").increment(1);

        let redirect = self
            .gateway
            .create_payment(PaymentRequest {
                amount,
                transaction: pending.id,
                account: account_id,
            })
            .await
            .map_err(|e| SettlementError::Gateway(e.to_string()))?;

        tracing::info!(transaction = %pending.id, amount = %amount, "deposit initiated");
        Ok(redirect.redirect_url)
    }

    /// Settles a gateway webhook callback.
    #[tracing::instrument(skip(self), fields(event = %callback.event))]
    pub async fn handle_callback(&self, callback: GatewayCallback) -> Result<()> {
        match callback.event.as_str() {
            "succeeded" => self.settle_succeeded(callback).await,
            "canceled" => self.settle_canceled(callback).await,
            _ => Err(SettlementError::UnrecognizedCallback {
                event: callback.event,
            }),
        }
    }

    async fn settle_succeeded(&self, callback: GatewayCallback) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let pending = tx.transaction_for_update(callback.transaction).await?;
        if pending.account != Some(callback.account) {
            return Err(SettlementError::CallbackMismatch);
        }
        if pending.status != TransactionStatus::Pending {
            // Replay: the credit already happened (or was cancelled).
            tracing::info!(transaction = %pending.id, "duplicate callback ignored");
            return Ok(());
        }

        tx.apply_balance_delta(callback.account, callback.income_amount)
            .await?;
        tx.set_transaction_status(pending.id, TransactionStatus::Success)
            .await?;
        tx.commit().await?;

        metrics::counter!("deposits_settled_total").increment(1);
        tracing::info!(
            transaction = %callback.transaction,
            amount = %callback.income_amount,
            "deposit settled"
        );
        Ok(())
    }

    async fn settle_canceled(&self, callback: GatewayCallback) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let pending = tx.transaction_for_update(callback.transaction).await?;
        if pending.account != Some(callback.account) {
            return Err(SettlementError::CallbackMismatch);
        }
        if pending.status != TransactionStatus::Pending {
            return Ok(());
        }

        tx.set_transaction_status(pending.id, TransactionStatus::Canceled)
            .await?;
        tx.commit().await?;

        tracing::info!(transaction = %callback.transaction, "deposit canceled");
        Ok(())
    }
}
