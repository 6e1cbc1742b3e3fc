//! Checkout inputs: the materialized cart and the buyer's selections.

use common::{AccountId, AddressId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::contact::ContactInfo;
use crate::money::Money;

/// One cart line with the unit price captured at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductId,
    pub quantity: u32,
    /// Post-discount unit price snapshot; never recomputed later.
    pub unit_price: Money,
}

impl CartLine {
    /// Returns the line total (quantity × unit price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A materialized cart handed to the checkout orchestrator.
///
/// Produced by whatever holds the session cart; the orchestrator never
/// reads cart storage itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Creates a snapshot from cart lines.
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// Returns true if the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the sum of all line totals.
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(CartLine::total_price).sum()
    }
}

/// The buyer's payment method choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentSelection {
    /// An existing saved card; must belong to the requesting customer.
    SavedCard(AccountId),
    /// A raw card number; an ownerless account is created for it.
    NewCard(String),
}

/// The buyer's shipping address choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSelection {
    /// An existing saved address; must belong to the requesting customer.
    Saved(AddressId),
    /// A raw address line; an ownerless address is created for it.
    New(String),
}

/// Everything known about the buyer at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerContext {
    /// The authenticated customer, if any.
    pub customer: Option<UserId>,
    pub contact: ContactInfo,
    pub payment: PaymentSelection,
    pub shipping: AddressSelection,
}
