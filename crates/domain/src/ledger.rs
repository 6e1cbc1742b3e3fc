//! Append-only ledger transactions.
//!
//! A transaction row is written at the moment value moves and is never
//! mutated afterwards, except for the Pending → Success/Canceled
//! transition of the asynchronous deposit flow.

use chrono::{DateTime, Utc};
use common::{AccountId, OrderId, OrderItemId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The kind of value movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// External funds credited to a card via the payment gateway.
    Deposit,
    /// A card debited for a whole order.
    Purchase,
    /// Gross proceeds of a single order item, tagged to its seller.
    Sale,
    /// The platform's cut carved out of a non-platform seller's sale.
    Commission,
}

impl TransactionKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Purchase => "Purchase",
            TransactionKind::Sale => "Sale",
            TransactionKind::Commission => "Commission",
        }
    }

    /// Parses a kind name produced by [`Self::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Deposit" => Some(TransactionKind::Deposit),
            "Purchase" => Some(TransactionKind::Purchase),
            "Sale" => Some(TransactionKind::Sale),
            "Commission" => Some(TransactionKind::Commission),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement status of a transaction.
///
/// Synchronous flows (purchase, sale, commission) are written as
/// `Success` directly; only gateway deposits pass through `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    #[default]
    Success,
    Canceled,
}

impl TransactionStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Success => "Success",
            TransactionStatus::Canceled => "Canceled",
        }
    }

    /// Parses a status name produced by [`Self::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TransactionStatus::Pending),
            "Success" => Some(TransactionStatus::Success),
            "Canceled" => Some(TransactionStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    /// Always positive; direction is implied by the kind.
    pub amount: Money,
    /// The card account debited or credited, where one is involved.
    pub account: Option<AccountId>,
    pub related_order: Option<OrderId>,
    pub related_item: Option<OrderItemId>,
    pub related_seller: Option<AccountId>,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

/// A transaction about to be persisted; the store assigns id and
/// timestamp on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Money,
    pub account: Option<AccountId>,
    pub related_order: Option<OrderId>,
    pub related_item: Option<OrderItemId>,
    pub related_seller: Option<AccountId>,
    pub status: TransactionStatus,
}

impl NewTransaction {
    /// A pending gateway deposit awaiting its callback.
    pub fn deposit(account: AccountId, amount: Money) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            amount,
            account: Some(account),
            related_order: None,
            related_item: None,
            related_seller: None,
            status: TransactionStatus::Pending,
        }
    }

    /// A card debit covering a whole order.
    pub fn purchase(account: AccountId, amount: Money, order: OrderId) -> Self {
        Self {
            kind: TransactionKind::Purchase,
            amount,
            account: Some(account),
            related_order: Some(order),
            related_item: None,
            related_seller: None,
            status: TransactionStatus::Success,
        }
    }

    /// Gross proceeds of one order item.
    pub fn sale(item: OrderItemId, seller: AccountId, amount: Money) -> Self {
        Self {
            kind: TransactionKind::Sale,
            amount,
            account: None,
            related_order: None,
            related_item: Some(item),
            related_seller: Some(seller),
            status: TransactionStatus::Success,
        }
    }

    /// Platform commission carved out of one item's sale.
    pub fn commission(item: OrderItemId, seller: AccountId, amount: Money) -> Self {
        Self {
            kind: TransactionKind::Commission,
            amount,
            account: None,
            related_order: None,
            related_item: Some(item),
            related_seller: Some(seller),
            status: TransactionStatus::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_starts_pending() {
        let tx = NewTransaction::deposit(AccountId::new(), Money::from_cents(100));
        assert_eq!(tx.kind, TransactionKind::Deposit);
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_purchase_is_immediate_success() {
        let tx = NewTransaction::purchase(AccountId::new(), Money::from_cents(300), OrderId::new());
        assert_eq!(tx.kind, TransactionKind::Purchase);
        assert_eq!(tx.status, TransactionStatus::Success);
        assert!(tx.related_order.is_some());
    }

    #[test]
    fn test_sale_and_commission_tag_item_and_seller() {
        let item = OrderItemId::new();
        let seller = AccountId::new();

        let sale = NewTransaction::sale(item, seller, Money::from_cents(300));
        assert_eq!(sale.related_item, Some(item));
        assert_eq!(sale.related_seller, Some(seller));

        let commission = NewTransaction::commission(item, seller, Money::from_cents(15));
        assert_eq!(commission.kind, TransactionKind::Commission);
        assert_eq!(commission.related_item, Some(item));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TransactionKind::Deposit.to_string(), "Deposit");
        assert_eq!(TransactionKind::Commission.to_string(), "Commission");
        assert_eq!(TransactionStatus::Pending.to_string(), "Pending");
    }
}
