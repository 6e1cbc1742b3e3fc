//! Domain layer: the data model and pure business rules of the
//! marketplace checkout and settlement engine.
//!
//! Everything here is synchronous and side-effect free; persistence and
//! orchestration live in the `storage` and `settlement` crates.

pub mod account;
pub mod cart;
pub mod contact;
pub mod error;
pub mod ledger;
pub mod money;
pub mod order;
pub mod product;

pub use account::{Account, AccountKind, Address, CARD_LIMIT};
pub use cart::{AddressSelection, BuyerContext, CartLine, CartSnapshot, PaymentSelection};
pub use contact::ContactInfo;
pub use error::ValidationError;
pub use ledger::{NewTransaction, Transaction, TransactionKind, TransactionStatus};
pub use money::Money;
pub use order::{ItemStatus, Order, OrderItem, OrderStatus, StatusError, aggregate_order_status};
pub use product::Product;
