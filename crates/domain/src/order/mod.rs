//! Orders, order items, and their status rules.

mod model;
mod status;

pub use model::{Order, OrderItem};
pub use status::{ItemStatus, OrderStatus, aggregate_order_status};

use thiserror::Error;

/// Errors raised by item status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// The requested transition is not allowed by the item lifecycle.
    #[error("cannot move item from {from} to {to}")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    /// The item already carries the requested status.
    #[error("item is already {status}")]
    NoOp { status: ItemStatus },

    /// A numeric status code outside the accepted set.
    #[error("invalid status value: {code}")]
    UnknownCode { code: u8 },
}
