//! Checkout orchestrator: turns a cart snapshot into a persisted order.

use std::sync::Arc;

use common::{AccountId, AddressId, ItemSlug, OrderSlug};
use domain::{
    AccountKind, AddressSelection, BuyerContext, CartSnapshot, Money, Order, OrderItem,
    PaymentSelection, ValidationError, contact::is_valid_card_number,
};
use storage::{MarketStore, NewAccount, NewAddress, NewOrder, NewOrderItem, StorageError};

use crate::error::{Result, SettlementError};
use crate::notify::{Notification, NotificationSink};

/// The persisted result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Builds orders from cart snapshots.
///
/// Anonymous card/address records are created in their own short
/// transactions; the order and its items are committed atomically in
/// one transaction afterwards.
pub struct CheckoutService<S> {
    store: S,
    notifier: Arc<dyn NotificationSink>,
}

impl<S: MarketStore> CheckoutService<S> {
    /// Creates a new checkout service.
    pub fn new(store: S, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    /// Creates an order from the cart.
    ///
    /// The caller is responsible for clearing its cart after a
    /// successful return.
    #[tracing::instrument(skip(self, cart, buyer), fields(lines = cart.lines.len(), customer = ?buyer.customer))]
    pub async fn create_order(
        &self,
        cart: CartSnapshot,
        buyer: BuyerContext,
    ) -> Result<CheckoutReceipt> {
        if cart.is_empty() {
            return Err(SettlementError::EmptyCart);
        }
        buyer.contact.validate()?;

        for line in &cart.lines {
            if line.quantity == 0 {
                return Err(ValidationError::new("quantity", "Quantity must be positive.").into());
            }
        }

        // Referenced rows must exist before the order transaction.
        let account = self.resolve_payment(&buyer).await?;
        let address = self.resolve_shipping(&buyer).await?;

        let mut tx = self.store.begin().await?;

        let order = loop {
            let attempt = tx
                .insert_order(NewOrder {
                    slug: OrderSlug::generate(),
                    customer: buyer.customer,
                    contact: buyer.contact.clone(),
                    address,
                    account,
                    total_price: cart.total_price(),
                })
                .await;
            match attempt {
                Ok(order) => break order,
                Err(StorageError::DuplicateSlug) => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = match tx.product_for_update(line.product).await {
                Ok(product) => product,
                Err(StorageError::NotFound { .. }) => {
                    return Err(SettlementError::ProductUnavailable);
                }
                Err(e) => return Err(e.into()),
            };
            if !product.is_active {
                return Err(SettlementError::ProductUnavailable);
            }

            let item = loop {
                let attempt = tx
                    .insert_order_item(NewOrderItem {
                        slug: ItemSlug::generate(),
                        order: order.id,
                        product: product.id,
                        seller: product.seller,
                        quantity: line.quantity,
                        price: line.unit_price,
                    })
                    .await;
                match attempt {
                    Ok(item) => break item,
                    Err(StorageError::DuplicateSlug) => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            items.push(item);
        }

        tx.commit().await?;

        metrics::counter!("checkout_orders_created_total").increment(1);
        tracing::info!(order_slug = %order.slug, total = %order.total_price, "order created");

        let notification = Notification::OrderCreated {
            order_slug: order.slug.clone(),
            contact: order.contact.clone(),
        };
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, "order-created notification failed");
        }

        Ok(CheckoutReceipt { order, items })
    }

    async fn resolve_payment(&self, buyer: &BuyerContext) -> Result<AccountId> {
        match &buyer.payment {
            PaymentSelection::SavedCard(id) => {
                let customer = buyer.customer.ok_or(SettlementError::Ownership("card"))?;
                let account = self
                    .store
                    .account(*id)
                    .await?
                    .ok_or_else(|| SettlementError::not_found("card"))?;
                if !account.is_card() || account.owner != Some(customer) {
                    return Err(SettlementError::Ownership("card"));
                }
                Ok(account.id)
            }
            PaymentSelection::NewCard(card_number) => {
                if !is_valid_card_number(card_number) {
                    return Err(
                        ValidationError::new("card", "Incorrect card number format.").into()
                    );
                }
                // A buyer with saved cards must pick one of them.
                if let Some(customer) = buyer.customer
                    && !self.store.cards_owned_by(customer).await?.is_empty()
                {
                    return Err(
                        ValidationError::new("card", "Select one of your saved cards.").into(),
                    );
                }
                let mut tx = self.store.begin().await?;
                let account = tx
                    .insert_account(NewAccount {
                        owner: buyer.customer,
                        kind: AccountKind::card(card_number.clone()),
                        balance: Money::zero(),
                    })
                    .await?;
                tx.commit().await?;
                Ok(account.id)
            }
        }
    }

    async fn resolve_shipping(&self, buyer: &BuyerContext) -> Result<AddressId> {
        match &buyer.shipping {
            AddressSelection::Saved(id) => {
                let customer = buyer.customer.ok_or(SettlementError::Ownership("address"))?;
                let address = self
                    .store
                    .address(*id)
                    .await?
                    .ok_or_else(|| SettlementError::not_found("address"))?;
                if address.owner != Some(customer) {
                    return Err(SettlementError::Ownership("address"));
                }
                Ok(address.id)
            }
            AddressSelection::New(text) => {
                if text.trim().is_empty() {
                    return Err(ValidationError::new("address", "Address is required.").into());
                }
                if let Some(customer) = buyer.customer
                    && !self.store.addresses_owned_by(customer).await?.is_empty()
                {
                    return Err(ValidationError::new(
                        "address",
                        "Select one of your saved addresses.",
                    )
                    .into());
                }
                let mut tx = self.store.begin().await?;
                let address = tx
                    .insert_address(NewAddress {
                        owner: buyer.customer,
                        text: text.clone(),
                    })
                    .await?;
                tx.commit().await?;
                Ok(address.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductId, UserId};
    use domain::{CartLine, ContactInfo, Product};
    use storage::InMemoryStore;

    fn buyer(payment: PaymentSelection, shipping: AddressSelection) -> BuyerContext {
        BuyerContext {
            customer: None,
            contact: ContactInfo::new("Alice", "79001234567", "alice@example.com"),
            payment,
            shipping,
        }
    }

    fn anonymous_buyer() -> BuyerContext {
        buyer(
            PaymentSelection::NewCard("1234567812345678".to_string()),
            AddressSelection::New("1 Main St".to_string()),
        )
    }

    async fn seed_product(store: &InMemoryStore, price: i64) -> Product {
        let mut tx = store.begin().await.unwrap();
        let seller = tx
            .insert_account(NewAccount {
                owner: None,
                kind: AccountKind::store("Widgets Inc", false),
                balance: Money::zero(),
            })
            .await
            .unwrap();
        let product = Product {
            id: ProductId::new(),
            seller: seller.id,
            title: "Widget".to_string(),
            price: Money::from_cents(price),
            discount: None,
            in_stock: Some(10),
            is_active: true,
        };
        tx.insert_product(product.clone()).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    fn service(store: &InMemoryStore) -> CheckoutService<InMemoryStore> {
        CheckoutService::new(store.clone(), Arc::new(crate::InMemoryNotificationSink::new()))
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let store = InMemoryStore::new();
        let result = service(&store)
            .create_order(CartSnapshot::default(), anonymous_buyer())
            .await;

        assert!(matches!(result, Err(SettlementError::EmptyCart)));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_card_number_rejected() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, 300).await;
        let cart = CartSnapshot::new(vec![CartLine {
            product: product.id,
            quantity: 1,
            unit_price: product.price,
        }]);
        let buyer = buyer(
            PaymentSelection::NewCard("123".to_string()),
            AddressSelection::New("1 Main St".to_string()),
        );

        let result = service(&store).create_order(cart, buyer).await;
        assert!(matches!(
            result,
            Err(SettlementError::Validation(ValidationError { field: "card", .. }))
        ));
    }

    #[tokio::test]
    async fn test_saved_card_requires_matching_owner() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, 300).await;

        let mut tx = store.begin().await.unwrap();
        let foreign_card = tx
            .insert_account(NewAccount {
                owner: Some(UserId::new()),
                kind: AccountKind::card("1234567812345678"),
                balance: Money::zero(),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let cart = CartSnapshot::new(vec![CartLine {
            product: product.id,
            quantity: 1,
            unit_price: product.price,
        }]);
        let mut buyer = buyer(
            PaymentSelection::SavedCard(foreign_card.id),
            AddressSelection::New("1 Main St".to_string()),
        );
        buyer.customer = Some(UserId::new());

        let result = service(&store).create_order(cart, buyer).await;
        assert!(matches!(result, Err(SettlementError::Ownership("card"))));
    }

    #[tokio::test]
    async fn test_raw_card_rejected_when_saved_cards_exist() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, 300).await;
        let customer = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_account(NewAccount {
            owner: Some(customer),
            kind: AccountKind::card("1111222233334444"),
            balance: Money::zero(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let cart = CartSnapshot::new(vec![CartLine {
            product: product.id,
            quantity: 1,
            unit_price: product.price,
        }]);
        let mut buyer = anonymous_buyer();
        buyer.customer = Some(customer);

        let result = service(&store).create_order(cart, buyer).await;
        assert!(matches!(
            result,
            Err(SettlementError::Validation(ValidationError { field: "card", .. }))
        ));
    }

    #[tokio::test]
    async fn test_checkout_snapshots_totals_and_seller() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, 300).await;
        let cart = CartSnapshot::new(vec![CartLine {
            product: product.id,
            quantity: 2,
            unit_price: product.price,
        }]);

        let receipt = service(&store)
            .create_order(cart, anonymous_buyer())
            .await
            .unwrap();

        assert_eq!(receipt.order.total_price.cents(), 600);
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].seller, product.seller);
        assert_eq!(receipt.items[0].price.cents(), 300);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_checkout() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, 300).await;
        let sink = crate::InMemoryNotificationSink::new();
        sink.set_fail(true);
        let service = CheckoutService::new(store.clone(), Arc::new(sink));

        let cart = CartSnapshot::new(vec![CartLine {
            product: product.id,
            quantity: 1,
            unit_price: product.price,
        }]);

        let result = service.create_order(cart, anonymous_buyer()).await;
        assert!(result.is_ok());
    }
}
