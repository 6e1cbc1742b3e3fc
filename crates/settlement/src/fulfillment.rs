//! Seller-driven order item status transitions.
//!
//! Each transition is a single-row update followed by an explicit,
//! synchronous recomputation of the parent order's aggregate status in
//! the same transaction. There are no hidden save hooks.

use std::sync::Arc;

use common::{AccountId, ItemSlug, OrderId};
use domain::{ItemStatus, OrderStatus, aggregate_order_status};
use storage::{MarketStore, MarketTx};

use crate::error::{Result, SettlementError};
use crate::notify::{Notification, NotificationSink};

/// Applies seller ship/receive/cancel actions to order items.
pub struct FulfillmentService<S> {
    store: S,
    notifier: Arc<dyn NotificationSink>,
}

impl<S: MarketStore> FulfillmentService<S> {
    /// Creates a new fulfillment service.
    pub fn new(store: S, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    /// Moves an item to `new_status` on behalf of the acting seller.
    ///
    /// Returns the parent order's recomputed status.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_status(
        &self,
        seller: AccountId,
        item_slug: &ItemSlug,
        new_status: ItemStatus,
    ) -> Result<OrderStatus> {
        let found = self
            .store
            .order_item_by_slug(item_slug)
            .await?
            .ok_or_else(|| SettlementError::not_found("order item"))?;

        let mut tx = self.store.begin().await?;

        // Re-read under the lock; the slug lookup above was unlocked.
        let item = tx.order_item_for_update(found.id).await?;

        if item.seller != seller {
            return Err(SettlementError::Ownership("order item"));
        }
        item.status.check_transition(new_status)?;

        tx.set_item_status(item.id, new_status).await?;
        let order_status = recompute_in_tx(&mut *tx, item.order).await?;
        tx.commit().await?;

        metrics::counter!("order_item_transitions_total").increment(1);
        tracing::info!(
            item_slug = %item.slug,
            status = new_status.as_str(),
            order_status = order_status.as_str(),
            "order item status updated"
        );

        self.notify_transition(item.order, item_slug, item.product, new_status)
            .await;

        Ok(order_status)
    }

    /// Recomputes and persists an order's aggregate status in its own
    /// transaction.
    #[tracing::instrument(skip(self))]
    pub async fn recompute_order_status(&self, order: OrderId) -> Result<OrderStatus> {
        let mut tx = self.store.begin().await?;
        let status = recompute_in_tx(&mut *tx, order).await?;
        tx.commit().await?;
        Ok(status)
    }

    async fn notify_transition(
        &self,
        order: OrderId,
        item_slug: &ItemSlug,
        product: common::ProductId,
        new_status: ItemStatus,
    ) {
        let contact = match self.store.order(order).await {
            Ok(Some(order)) => order.contact,
            _ => return,
        };
        let product_title = match self.store.product(product).await {
            Ok(Some(product)) => product.title,
            _ => String::new(),
        };

        let notification = match new_status {
            ItemStatus::Sent => Notification::ItemSent {
                item_slug: item_slug.clone(),
                product_title,
                contact,
            },
            ItemStatus::Received => Notification::ItemReceived {
                item_slug: item_slug.clone(),
                product_title,
                contact,
            },
            ItemStatus::Cancelled => Notification::ItemCancelled {
                item_slug: item_slug.clone(),
                product_title,
                contact,
            },
            ItemStatus::Created | ItemStatus::Paid => return,
        };

        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, "item status notification failed");
        }
    }
}

/// Scans all item statuses and persists the derived order status.
async fn recompute_in_tx(tx: &mut dyn MarketTx, order_id: OrderId) -> Result<OrderStatus> {
    let order = tx.order_for_update(order_id).await?;
    let statuses: Vec<ItemStatus> = tx
        .order_items(order_id)
        .await?
        .iter()
        .map(|item| item.status)
        .collect();

    let derived = aggregate_order_status(&statuses, order.status);
    if derived != order.status {
        tx.set_order_status(order_id, derived).await?;
    }
    Ok(derived)
}
