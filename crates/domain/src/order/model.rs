//! Order and order item records.

use chrono::{DateTime, Utc};
use common::{AccountId, AddressId, ItemSlug, OrderId, OrderItemId, OrderSlug, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::contact::ContactInfo;
use crate::money::Money;

use super::{ItemStatus, OrderStatus};

/// A persisted order.
///
/// Financial record: never deleted. `total_price` is a snapshot equal
/// to the sum of item line totals at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Public identifier, globally unique, immutable once set.
    pub slug: OrderSlug,

    /// The buying user; `None` for anonymous checkout.
    pub customer: Option<UserId>,

    pub contact: ContactInfo,

    pub address: AddressId,

    /// The payment card this order is settled against.
    pub account: AccountId,

    pub total_price: Money,

    pub status: OrderStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if the given user may pay this order.
    ///
    /// Anonymous orders are payable by anyone holding the slug; owned
    /// orders only by their customer.
    pub fn payable_by(&self, user: Option<UserId>) -> bool {
        match self.customer {
            Some(customer) => user == Some(customer),
            None => true,
        }
    }
}

/// A single order line.
///
/// `price` is the per-unit price captured at checkout (post-discount);
/// later catalog price changes never touch it. `seller` snapshots the
/// product's store at checkout for settlement and fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,

    /// Public identifier, globally unique, immutable once set.
    pub slug: ItemSlug,

    pub order: OrderId,

    pub product: ProductId,

    pub seller: AccountId,

    pub quantity: u32,

    pub price: Money,

    pub status: ItemStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the line total (quantity × unit price).
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}
