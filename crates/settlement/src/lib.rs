//! Orchestration layer: the services that move orders, money, and
//! stock through their lifecycles.
//!
//! Each service drives one storage transaction per operation; partial
//! failure rolls the whole transaction back. External collaborators
//! (notification delivery, the payment gateway) sit behind traits with
//! in-memory doubles for tests.

pub mod checkout;
pub mod deposit;
pub mod engine;
pub mod error;
pub mod fulfillment;
pub mod gateway;
pub mod notify;

pub use checkout::{CheckoutReceipt, CheckoutService};
pub use deposit::{DepositService, GatewayCallback};
pub use engine::SettlementEngine;
pub use error::SettlementError;
pub use fulfillment::FulfillmentService;
pub use gateway::{GatewayError, GatewayRedirect, InMemoryPaymentGateway, PaymentGateway, PaymentRequest};
pub use notify::{InMemoryNotificationSink, LoggingNotificationSink, Notification, NotificationError, NotificationSink};

/// Platform commission rate applied to non-platform sellers, in basis
/// points (500 = 5%).
pub const DEFAULT_COMMISSION_BPS: u32 = 500;
