//! Service error types.

use domain::{OrderStatus, StatusError, ValidationError};
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur during checkout, settlement, fulfillment, and
/// deposit operations.
///
/// Business-rule violations abort the enclosing storage transaction;
/// no partial debit or credit ever persists.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// A request field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Checkout was attempted with an empty cart.
    #[error("your cart is empty")]
    EmptyCart,

    /// The referenced card or address belongs to someone else.
    #[error("this is not your {0}")]
    Ownership(&'static str),

    /// The requesting user may not pay this order.
    #[error("you cannot pay for this order")]
    Forbidden,

    /// The card balance does not cover the order total.
    #[error("insufficient funds on the card")]
    InsufficientFunds,

    /// The product was deactivated or sold out since checkout.
    #[error("product is not available to purchase")]
    ProductUnavailable,

    /// The order is not in a payable state (double-pay guard).
    #[error("order cannot be paid in status {status}")]
    InvalidState { status: OrderStatus },

    /// An item status transition was rejected.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// A referenced entity does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A deposit was requested with a non-positive amount.
    #[error("deposit amount must be positive")]
    NonPositiveDeposit,

    /// The gateway callback carried an unknown event.
    #[error("unrecognized payment callback event: {event}")]
    UnrecognizedCallback { event: String },

    /// The gateway callback does not match the referenced transaction.
    #[error("callback does not match the referenced transaction")]
    CallbackMismatch,

    /// The payment gateway could not be reached or rejected the request.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SettlementError {
    /// Shorthand for a typed not-found error.
    pub fn not_found(entity: &'static str) -> Self {
        SettlementError::NotFound { entity }
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, SettlementError>;
