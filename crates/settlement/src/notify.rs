//! Notification sink trait and implementations.
//!
//! Delivery (SMS, email) is an external concern; services fire
//! notifications after commit and swallow failures, logging only.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{ItemSlug, OrderSlug};
use domain::ContactInfo;
use thiserror::Error;

/// A message for the buyer about their order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Order persisted, awaiting payment.
    OrderCreated {
        order_slug: OrderSlug,
        contact: ContactInfo,
    },

    /// Order settled.
    OrderPaid {
        order_slug: OrderSlug,
        contact: ContactInfo,
    },

    /// An item was shipped by its seller.
    ItemSent {
        item_slug: ItemSlug,
        product_title: String,
        contact: ContactInfo,
    },

    /// An item was received; invite a review.
    ItemReceived {
        item_slug: ItemSlug,
        product_title: String,
        contact: ContactInfo,
    },

    /// An item was cancelled.
    ItemCancelled {
        item_slug: ItemSlug,
        product_title: String,
        contact: ContactInfo,
    },
}

impl Notification {
    /// Returns the contact the message is addressed to.
    pub fn contact(&self) -> &ContactInfo {
        match self {
            Notification::OrderCreated { contact, .. }
            | Notification::OrderPaid { contact, .. }
            | Notification::ItemSent { contact, .. }
            | Notification::ItemReceived { contact, .. }
            | Notification::ItemCancelled { contact, .. } => contact,
        }
    }

    /// Returns a short name for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::OrderCreated { .. } => "order_created",
            Notification::OrderPaid { .. } => "order_paid",
            Notification::ItemSent { .. } => "item_sent",
            Notification::ItemReceived { .. } => "item_received",
            Notification::ItemCancelled { .. } => "item_cancelled",
        }
    }
}

/// Notification delivery failed.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Trait for fire-and-forget notification dispatch.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Dispatches a notification to the buyer.
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    sent: Vec<Notification>,
    fail: bool,
}

/// In-memory notification sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<RwLock<InMemorySinkState>>,
}

impl InMemoryNotificationSink {
    /// Creates a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to fail on subsequent notify calls.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns all notifications accepted so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of notifications accepted so far.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(NotificationError("delivery refused".to_string()));
        }
        state.sent.push(notification);
        Ok(())
    }
}

/// Sink that only logs; the default for local runs where no SMS/email
/// provider is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        tracing::info!(
            kind = notification.kind(),
            recipient = %notification.contact().email,
            "notification dispatched"
        );
        Ok(())
    }
}
