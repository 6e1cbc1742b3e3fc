//! Order and order-item status machines.

use serde::{Deserialize, Serialize};

use super::StatusError;

/// Status of a whole order.
///
/// Derived from item statuses by [`aggregate_order_status`], except for
/// `Created` (set at checkout) and `Paid` (set by settlement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Every item was cancelled (terminal).
    Cancelled,

    /// Persisted, awaiting payment.
    #[default]
    Created,

    /// Settled: money moved, stock decremented.
    Paid,

    /// At least one item shipped by its seller.
    Processing,

    /// All surviving items received by the buyer (terminal).
    Done,
}

impl OrderStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Created => "Created",
            OrderStatus::Paid => "Paid",
            OrderStatus::Processing => "Processing",
            OrderStatus::Done => "Done",
        }
    }

    /// Returns the numeric wire code.
    pub fn code(&self) -> u8 {
        match self {
            OrderStatus::Cancelled => 0,
            OrderStatus::Created => 1,
            OrderStatus::Paid => 2,
            OrderStatus::Processing => 3,
            OrderStatus::Done => 4,
        }
    }

    /// Parses a numeric wire code.
    pub fn from_code(code: u8) -> Result<Self, StatusError> {
        match code {
            0 => Ok(OrderStatus::Cancelled),
            1 => Ok(OrderStatus::Created),
            2 => Ok(OrderStatus::Paid),
            3 => Ok(OrderStatus::Processing),
            4 => Ok(OrderStatus::Done),
            _ => Err(StatusError::UnknownCode { code }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single order item.
///
/// Lifecycle: `Created → Paid → Sent → Received`, with `Cancelled`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemStatus {
    Cancelled,
    #[default]
    Created,
    Paid,
    Sent,
    Received,
}

impl ItemStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Cancelled => "Cancelled",
            ItemStatus::Created => "Created",
            ItemStatus::Paid => "Paid",
            ItemStatus::Sent => "Sent",
            ItemStatus::Received => "Received",
        }
    }

    /// Returns the numeric wire code.
    pub fn code(&self) -> u8 {
        match self {
            ItemStatus::Cancelled => 0,
            ItemStatus::Created => 1,
            ItemStatus::Paid => 2,
            ItemStatus::Sent => 3,
            ItemStatus::Received => 4,
        }
    }

    /// Parses a numeric wire code.
    pub fn from_code(code: u8) -> Result<Self, StatusError> {
        match code {
            0 => Ok(ItemStatus::Cancelled),
            1 => Ok(ItemStatus::Created),
            2 => Ok(ItemStatus::Paid),
            3 => Ok(ItemStatus::Sent),
            4 => Ok(ItemStatus::Received),
            _ => Err(StatusError::UnknownCode { code }),
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Cancelled | ItemStatus::Received)
    }

    /// Checks a seller/customer-driven transition to `next`.
    pub fn check_transition(&self, next: ItemStatus) -> Result<(), StatusError> {
        if *self == next {
            return Err(StatusError::NoOp { status: next });
        }

        let allowed = match next {
            ItemStatus::Cancelled => !self.is_terminal(),
            ItemStatus::Paid => *self == ItemStatus::Created,
            ItemStatus::Sent => *self == ItemStatus::Paid,
            ItemStatus::Received => *self == ItemStatus::Sent,
            ItemStatus::Created => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(StatusError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recomputes an order's status from its item statuses.
///
/// Precedence: all-cancelled wins, then any Created, any Paid, any
/// Sent, and finally Done once every non-cancelled item is Received.
/// When no clause matches the stored status is kept. The Done clause's
/// treatment of mixed Received/Cancelled orders is under product
/// review (DESIGN.md).
pub fn aggregate_order_status(items: &[ItemStatus], current: OrderStatus) -> OrderStatus {
    let total = items.len();
    let count = |status: ItemStatus| items.iter().filter(|s| **s == status).count();

    let cancelled = count(ItemStatus::Cancelled);

    if total > 0 && cancelled == total {
        OrderStatus::Cancelled
    } else if count(ItemStatus::Created) > 0 {
        OrderStatus::Created
    } else if count(ItemStatus::Paid) > 0 {
        OrderStatus::Paid
    } else if count(ItemStatus::Sent) > 0 {
        OrderStatus::Processing
    } else if total > 0 && count(ItemStatus::Received) == total - cancelled {
        OrderStatus::Done
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_status_codes_roundtrip() {
        for code in 0..=4 {
            let status = ItemStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert!(matches!(
            ItemStatus::from_code(5),
            Err(StatusError::UnknownCode { code: 5 })
        ));
    }

    #[test]
    fn test_forward_transitions() {
        assert!(ItemStatus::Created.check_transition(ItemStatus::Paid).is_ok());
        assert!(ItemStatus::Paid.check_transition(ItemStatus::Sent).is_ok());
        assert!(ItemStatus::Sent.check_transition(ItemStatus::Received).is_ok());
    }

    #[test]
    fn test_no_skipping_forward() {
        assert!(matches!(
            ItemStatus::Created.check_transition(ItemStatus::Sent),
            Err(StatusError::InvalidTransition { .. })
        ));
        assert!(matches!(
            ItemStatus::Paid.check_transition(ItemStatus::Received),
            Err(StatusError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_no_going_backwards() {
        assert!(matches!(
            ItemStatus::Sent.check_transition(ItemStatus::Paid),
            Err(StatusError::InvalidTransition { .. })
        ));
        assert!(matches!(
            ItemStatus::Received.check_transition(ItemStatus::Sent),
            Err(StatusError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_from_non_terminal_only() {
        assert!(ItemStatus::Created.check_transition(ItemStatus::Cancelled).is_ok());
        assert!(ItemStatus::Paid.check_transition(ItemStatus::Cancelled).is_ok());
        assert!(ItemStatus::Sent.check_transition(ItemStatus::Cancelled).is_ok());
        assert!(matches!(
            ItemStatus::Received.check_transition(ItemStatus::Cancelled),
            Err(StatusError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_same_status_is_a_noop_error() {
        assert!(matches!(
            ItemStatus::Sent.check_transition(ItemStatus::Sent),
            Err(StatusError::NoOp { .. })
        ));
    }

    #[test]
    fn test_aggregate_all_cancelled() {
        let items = [ItemStatus::Cancelled, ItemStatus::Cancelled];
        assert_eq!(
            aggregate_order_status(&items, OrderStatus::Paid),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn test_aggregate_any_created_wins_over_later_stages() {
        let items = [ItemStatus::Created, ItemStatus::Received];
        assert_eq!(
            aggregate_order_status(&items, OrderStatus::Paid),
            OrderStatus::Created
        );
    }

    #[test]
    fn test_aggregate_any_paid() {
        let items = [ItemStatus::Paid, ItemStatus::Sent];
        assert_eq!(
            aggregate_order_status(&items, OrderStatus::Paid),
            OrderStatus::Paid
        );
    }

    #[test]
    fn test_aggregate_any_sent_is_processing() {
        let items = [ItemStatus::Sent, ItemStatus::Received];
        assert_eq!(
            aggregate_order_status(&items, OrderStatus::Paid),
            OrderStatus::Processing
        );
    }

    #[test]
    fn test_aggregate_all_received_is_done() {
        let items = [ItemStatus::Received, ItemStatus::Received];
        assert_eq!(
            aggregate_order_status(&items, OrderStatus::Processing),
            OrderStatus::Done
        );
    }

    #[test]
    fn test_aggregate_received_plus_cancelled_is_done() {
        // The historical precedence resolves this mix to Done.
        let items = [ItemStatus::Received, ItemStatus::Cancelled];
        assert_eq!(
            aggregate_order_status(&items, OrderStatus::Processing),
            OrderStatus::Done
        );
    }

    #[test]
    fn test_aggregate_empty_keeps_current() {
        assert_eq!(
            aggregate_order_status(&[], OrderStatus::Created),
            OrderStatus::Created
        );
    }
}
