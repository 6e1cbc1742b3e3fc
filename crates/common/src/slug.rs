//! Public short identifiers for orders and order items.
//!
//! Slugs are the only identifiers exposed in URLs. They are random digit
//! strings; uniqueness is enforced by the storage layer, and callers
//! regenerate on collision.

use rand::Rng;
use serde::{Deserialize, Serialize};

fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Public identifier of an order, shaped `XXXXXXXX-XXXX` (digits only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderSlug(String);

impl OrderSlug {
    /// Wraps an existing slug string (e.g. from a URL path).
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Generates a fresh random slug.
    pub fn generate() -> Self {
        let digits = random_digits(12);
        Self(format!("{}-{}", &digits[..8], &digits[8..]))
    }

    /// Returns the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderSlug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderSlug {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Public identifier of an order item, ten random digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSlug(String);

impl ItemSlug {
    /// Wraps an existing slug string.
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Generates a fresh random slug.
    pub fn generate() -> Self {
        Self(random_digits(10))
    }

    /// Returns the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemSlug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemSlug {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
