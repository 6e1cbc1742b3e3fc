//! Shared types for the marketplace backend.
//!
//! Typed UUID identifiers prevent mixing up references between tables,
//! and slug types carry the public short identifiers exposed in URLs.

mod ids;
mod slug;

pub use ids::{AccountId, AddressId, OrderId, OrderItemId, ProductId, TransactionId, UserId};
pub use slug::{ItemSlug, OrderSlug};
