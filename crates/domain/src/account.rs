//! Balance-carrying accounts: buyer payment cards and seller stores.

use chrono::{DateTime, Utc};
use common::{AccountId, AddressId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Maximum number of cards a single user may hold.
pub const CARD_LIMIT: usize = 5;

/// What an account represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountKind {
    /// A buyer's prepaid payment card.
    Card { card_number: String },

    /// A seller store balance. The platform's own store is flagged so
    /// settlement can skip the commission carve-out for it.
    Store {
        name: String,
        /// Public identifier used in seller-facing URLs.
        slug: String,
        platform: bool,
    },
}

impl AccountKind {
    /// Creates a card kind from its number.
    pub fn card(card_number: impl Into<String>) -> Self {
        AccountKind::Card {
            card_number: card_number.into(),
        }
    }

    /// Creates a store kind, deriving the URL slug from the name.
    pub fn store(name: impl Into<String>, platform: bool) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        AccountKind::Store {
            name,
            slug,
            platform,
        }
    }

    /// Returns the store URL slug, if this kind is a store.
    pub fn store_slug(&self) -> Option<&str> {
        match self {
            AccountKind::Store { slug, .. } => Some(slug),
            AccountKind::Card { .. } => None,
        }
    }
}

fn slugify(name: &str) -> String {
    name.chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

/// An account holding a balance in minor currency units.
///
/// Balances never go negative: settlement checks funds before debiting
/// and every mutation is a delta recorded alongside a ledger
/// [`crate::Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    /// Owning user; `None` for accounts created by anonymous checkout.
    pub owner: Option<UserId>,

    pub kind: AccountKind,

    pub balance: Money,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Returns true if this account is a payment card.
    pub fn is_card(&self) -> bool {
        matches!(self.kind, AccountKind::Card { .. })
    }

    /// Returns true if this account is a seller store.
    pub fn is_store(&self) -> bool {
        matches!(self.kind, AccountKind::Store { .. })
    }

    /// Returns true if this account is the platform's own store.
    pub fn is_platform_store(&self) -> bool {
        matches!(self.kind, AccountKind::Store { platform: true, .. })
    }

    /// Returns the store URL slug, if this account is a store.
    pub fn store_slug(&self) -> Option<&str> {
        self.kind.store_slug()
    }
}

/// A shipping address. Kept minimal: a free-form text line plus an
/// optional owner, mirroring the account ownership rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub owner: Option<UserId>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
