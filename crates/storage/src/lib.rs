//! Storage layer: explicit transaction-scoped repositories.
//!
//! Every multi-row mutation in the system runs inside a [`MarketTx`]
//! obtained from [`MarketStore::begin`]; dropping a transaction without
//! committing rolls everything back. Two interchangeable backends are
//! provided: [`InMemoryStore`] for tests and local runs, and
//! [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StorageError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{MarketStore, MarketTx, NewAccount, NewAddress, NewOrder, NewOrderItem};
