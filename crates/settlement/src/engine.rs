//! Settlement engine: executes payment for an order.

use std::collections::HashMap;
use std::sync::Arc;

use common::{AccountId, OrderId, UserId};
use domain::{ItemStatus, Money, NewTransaction, OrderStatus};
use storage::MarketStore;

use crate::error::{Result, SettlementError};
use crate::notify::{Notification, NotificationSink};

/// Moves money, stock, and statuses when an order is paid.
///
/// The whole of [`SettlementEngine::pay_order`] runs in one storage
/// transaction with the order, card, seller, and product rows locked;
/// any failure rolls everything back, including the card debit.
pub struct SettlementEngine<S> {
    store: S,
    notifier: Arc<dyn NotificationSink>,
    /// The store account representing the marketplace operator.
    platform_account: AccountId,
    /// Commission rate in basis points.
    commission_bps: u32,
}

impl<S: MarketStore> SettlementEngine<S> {
    /// Creates a new settlement engine.
    pub fn new(
        store: S,
        notifier: Arc<dyn NotificationSink>,
        platform_account: AccountId,
        commission_bps: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            platform_account,
            commission_bps,
        }
    }

    /// Pays an order from its card balance.
    ///
    /// Idempotent via the status guard: an order that is no longer
    /// `Created` is rejected with [`SettlementError::InvalidState`],
    /// re-checked under the row lock so concurrent calls cannot both
    /// settle.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(
        &self,
        order_id: OrderId,
        requesting_user: Option<UserId>,
    ) -> Result<()> {
        metrics::counter!("settlement_attempts_total").increment(1);
        let start = std::time::Instant::now();

        let mut tx = self.store.begin().await?;

        let order = tx.order_for_update(order_id).await?;

        if !order.payable_by(requesting_user) {
            return Err(SettlementError::Forbidden);
        }
        if order.status != OrderStatus::Created {
            return Err(SettlementError::InvalidState {
                status: order.status,
            });
        }

        let account = tx.account_for_update(order.account).await?;
        if account.balance < order.total_price {
            return Err(SettlementError::InsufficientFunds);
        }

        tx.apply_balance_delta(order.account, -order.total_price).await?;
        tx.insert_transaction(NewTransaction::purchase(
            order.account,
            order.total_price,
            order.id,
        ))
        .await?;

        let items = tx.order_items(order.id).await?;

        let mut platform_proceeds = Money::zero();
        let mut seller_proceeds: HashMap<AccountId, Money> = HashMap::new();

        for item in &items {
            let item_total = item.total_price();

            tx.insert_transaction(NewTransaction::sale(item.id, item.seller, item_total))
                .await?;

            if item.seller == self.platform_account {
                // Buyer's counterparty is the platform itself; nothing
                // to carve out.
                platform_proceeds += item_total;
            } else {
                let commission = item_total.share(self.commission_bps);
                *seller_proceeds.entry(item.seller).or_default() += item_total - commission;
                platform_proceeds += commission;
                tx.insert_transaction(NewTransaction::commission(item.id, item.seller, commission))
                    .await?;
            }

            let product = tx.product_for_update(item.product).await?;
            if !product.available() {
                return Err(SettlementError::ProductUnavailable);
            }
            if let Some(stock) = product.in_stock {
                let remaining = stock.saturating_sub(item.quantity);
                let is_active = product.is_active && remaining > 0;
                tx.set_product_stock(product.id, Some(remaining), is_active)
                    .await?;
            }

            tx.set_item_status(item.id, ItemStatus::Paid).await?;
        }

        for (seller, proceeds) in &seller_proceeds {
            if proceeds.is_positive() {
                tx.apply_balance_delta(*seller, *proceeds).await?;
            }
        }
        if platform_proceeds.is_positive() {
            tx.apply_balance_delta(self.platform_account, platform_proceeds)
                .await?;
        }

        tx.set_order_status(order.id, OrderStatus::Paid).await?;
        tx.commit().await?;

        metrics::counter!("orders_settled_total").increment(1);
        metrics::histogram!("settlement_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(order_slug = %order.slug, total = %order.total_price, "order settled");

        let notification = Notification::OrderPaid {
            order_slug: order.slug.clone(),
            contact: order.contact.clone(),
        };
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, "order-paid notification failed");
        }

        Ok(())
    }
}
