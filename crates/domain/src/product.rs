//! Catalog product view consumed by checkout and settlement.
//!
//! The wider catalog (search, media, reviews) lives elsewhere; the core
//! only needs pricing, the owning store, and stock availability.

use common::{AccountId, ProductId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The slice of a catalog product the settlement core operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// The store account credited when this product sells.
    pub seller: AccountId,

    pub title: String,

    /// Listed price before any discount.
    pub price: Money,

    /// Active discount in whole percent, if any.
    pub discount: Option<u32>,

    /// Remaining stock; `None` means stock is not tracked.
    pub in_stock: Option<u32>,

    pub is_active: bool,
}

impl Product {
    /// Returns the effective unit price with any discount applied.
    pub fn real_price(&self) -> Money {
        match self.discount {
            Some(percent) => self.price - self.price.share(percent * 100),
            None => self.price,
        }
    }

    /// Returns true if settlement may sell one more unit.
    pub fn available(&self) -> bool {
        self.is_active && self.in_stock != Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, discount: Option<u32>) -> Product {
        Product {
            id: ProductId::new(),
            seller: AccountId::new(),
            title: "Widget".to_string(),
            price: Money::from_cents(price),
            discount,
            in_stock: Some(10),
            is_active: true,
        }
    }

    #[test]
    fn test_real_price_without_discount() {
        assert_eq!(product(1000, None).real_price().cents(), 1000);
    }

    #[test]
    fn test_real_price_with_discount() {
        // 20% off 1000 -> 800
        assert_eq!(product(1000, Some(20)).real_price().cents(), 800);
        // 15% off 999 = 149.85 off -> rounds to 150 -> 849
        assert_eq!(product(999, Some(15)).real_price().cents(), 849);
    }

    #[test]
    fn test_availability() {
        let mut p = product(1000, None);
        assert!(p.available());

        p.in_stock = Some(0);
        assert!(!p.available());

        p.in_stock = None;
        assert!(p.available());

        p.is_active = false;
        assert!(!p.available());
    }
}
