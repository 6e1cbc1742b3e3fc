//! Storage error types.

use common::AccountId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The referenced row does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A generated slug collided with an existing row; callers
    /// regenerate and retry.
    #[error("slug already taken")]
    DuplicateSlug,

    /// A balance delta would take the account below zero.
    #[error("balance would go negative for account {account}")]
    BalanceBelowZero { account: AccountId },

    /// The owner already holds the maximum number of cards.
    #[error("the limit is {limit} cards only")]
    CardLimitExceeded { limit: usize },

    /// A stored value could not be mapped back to a domain type.
    #[error("corrupt row: {0}")]
    Decode(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    /// Shorthand for a typed not-found error.
    pub fn not_found(entity: &'static str) -> Self {
        StorageError::NotFound { entity }
    }
}

/// Convenience type alias for storage results.
pub type Result<T> = std::result::Result<T, StorageError>;
