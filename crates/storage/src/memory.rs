//! In-memory store for tests and local runs.
//!
//! Transactions clone the whole state behind a tokio mutex and write
//! the clone back on commit, so concurrent transactions serialize and a
//! dropped transaction discards its changes. Plain reads briefly take
//! the same lock: never call them while holding an open transaction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    AccountId, AddressId, ItemSlug, OrderId, OrderItemId, OrderSlug, ProductId, TransactionId,
    UserId,
};
use domain::{
    Account, AccountKind, Address, CARD_LIMIT, ItemStatus, Money, NewTransaction, Order, OrderItem,
    OrderStatus, Product, Transaction, TransactionStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Result, StorageError};
use crate::store::{MarketStore, MarketTx, NewAccount, NewAddress, NewOrder, NewOrderItem};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    addresses: HashMap<AddressId, Address>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderItemId, OrderItem>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// In-memory market store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the number of persisted ledger transactions.
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    /// Returns all ledger transactions, oldest first.
    pub async fn all_transactions(&self) -> Vec<Transaction> {
        let state = self.state.lock().await;
        let mut txs: Vec<Transaction> = state.transactions.values().cloned().collect();
        txs.sort_by_key(|t| t.timestamp);
        txs
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn sorted_items(state: &MemoryState, order: OrderId) -> Vec<OrderItem> {
    let mut items: Vec<OrderItem> = state
        .items
        .values()
        .filter(|item| item.order == order)
        .cloned()
        .collect();
    items.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.slug.as_str().cmp(b.slug.as_str()))
    });
    items
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn MarketTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        Ok(self.state.lock().await.addresses.get(&id).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn order_by_slug(&self, slug: &OrderSlug) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.values().find(|o| &o.slug == slug).cloned())
    }

    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>> {
        Ok(sorted_items(&*self.state.lock().await, order))
    }

    async fn order_item_by_slug(&self, slug: &ItemSlug) -> Result<Option<OrderItem>> {
        let state = self.state.lock().await;
        Ok(state.items.values().find(|i| &i.slug == slug).cloned())
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.state.lock().await.transactions.get(&id).cloned())
    }

    async fn cards_owned_by(&self, user: UserId) -> Result<Vec<Account>> {
        let state = self.state.lock().await;
        let mut cards: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.is_card() && a.owner == Some(user))
            .cloned()
            .collect();
        cards.sort_by_key(|a| a.created_at);
        Ok(cards)
    }

    async fn addresses_owned_by(&self, user: UserId) -> Result<Vec<Address>> {
        let state = self.state.lock().await;
        let mut addresses: Vec<Address> = state
            .addresses
            .values()
            .filter(|a| a.owner == Some(user))
            .cloned()
            .collect();
        addresses.sort_by_key(|a| a.created_at);
        Ok(addresses)
    }

    async fn store_by_slug(&self, slug: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.store_slug() == Some(slug))
            .cloned())
    }
}

#[async_trait]
impl MarketTx for InMemoryTx {
    async fn account_for_update(&mut self, id: AccountId) -> Result<Account> {
        self.working
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("account"))
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Order> {
        self.working
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("order"))
    }

    async fn order_item_for_update(&mut self, id: OrderItemId) -> Result<OrderItem> {
        self.working
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("order item"))
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Product> {
        self.working
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("product"))
    }

    async fn transaction_for_update(&mut self, id: TransactionId) -> Result<Transaction> {
        self.working
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("transaction"))
    }

    async fn order_items(&mut self, order: OrderId) -> Result<Vec<OrderItem>> {
        Ok(sorted_items(&self.working, order))
    }

    async fn insert_account(&mut self, account: NewAccount) -> Result<Account> {
        if let (Some(owner), AccountKind::Card { .. }) = (account.owner, &account.kind) {
            let owned = self
                .working
                .accounts
                .values()
                .filter(|a| a.is_card() && a.owner == Some(owner))
                .count();
            if owned >= CARD_LIMIT {
                return Err(StorageError::CardLimitExceeded { limit: CARD_LIMIT });
            }
        }

        let account = Account {
            id: AccountId::new(),
            owner: account.owner,
            kind: account.kind,
            balance: account.balance,
            created_at: Utc::now(),
        };
        self.working.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn insert_address(&mut self, address: NewAddress) -> Result<Address> {
        let address = Address {
            id: AddressId::new(),
            owner: address.owner,
            text: address.text,
            created_at: Utc::now(),
        };
        self.working.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn insert_product(&mut self, product: Product) -> Result<()> {
        self.working.products.insert(product.id, product);
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        if self.working.orders.values().any(|o| o.slug == order.slug) {
            return Err(StorageError::DuplicateSlug);
        }
        if !self.working.addresses.contains_key(&order.address) {
            return Err(StorageError::not_found("address"));
        }
        if !self.working.accounts.contains_key(&order.account) {
            return Err(StorageError::not_found("account"));
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            slug: order.slug,
            customer: order.customer,
            contact: order.contact,
            address: order.address,
            account: order.account,
            total_price: order.total_price,
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItem> {
        if self.working.items.values().any(|i| i.slug == item.slug) {
            return Err(StorageError::DuplicateSlug);
        }
        if !self.working.orders.contains_key(&item.order) {
            return Err(StorageError::not_found("order"));
        }
        if !self.working.products.contains_key(&item.product) {
            return Err(StorageError::not_found("product"));
        }

        let now = Utc::now();
        let item = OrderItem {
            id: OrderItemId::new(),
            slug: item.slug,
            order: item.order,
            product: item.product,
            seller: item.seller,
            quantity: item.quantity,
            price: item.price,
            status: ItemStatus::Created,
            created_at: now,
            updated_at: now,
        };
        self.working.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction> {
        let tx = Transaction {
            id: TransactionId::new(),
            kind: tx.kind,
            amount: tx.amount,
            account: tx.account,
            related_order: tx.related_order,
            related_item: tx.related_item,
            related_seller: tx.related_seller,
            status: tx.status,
            timestamp: Utc::now(),
        };
        self.working.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn apply_balance_delta(&mut self, id: AccountId, delta: Money) -> Result<()> {
        let account = self
            .working
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("account"))?;

        let new_balance = account.balance + delta;
        if new_balance.is_negative() {
            return Err(StorageError::BalanceBelowZero { account: id });
        }
        account.balance = new_balance;
        Ok(())
    }

    async fn set_product_stock(
        &mut self,
        id: ProductId,
        in_stock: Option<u32>,
        is_active: bool,
    ) -> Result<()> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("product"))?;
        product.in_stock = in_stock;
        product.is_active = is_active;
        Ok(())
    }

    async fn set_item_status(&mut self, id: OrderItemId, status: ItemStatus) -> Result<()> {
        let item = self
            .working
            .items
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("order item"))?;
        item.status = status;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("order"))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<()> {
        let tx = self
            .working
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("transaction"))?;
        tx.status = status;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ContactInfo;

    async fn seed_card(store: &InMemoryStore, balance: i64) -> Account {
        let mut tx = store.begin().await.unwrap();
        let account = tx
            .insert_account(NewAccount {
                owner: None,
                kind: AccountKind::card("1234567812345678"),
                balance: Money::from_cents(balance),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        account
    }

    async fn seed_order(store: &InMemoryStore, account: AccountId) -> Order {
        let mut tx = store.begin().await.unwrap();
        let address = tx
            .insert_address(NewAddress {
                owner: None,
                text: "1 Main St".to_string(),
            })
            .await
            .unwrap();
        let order = tx
            .insert_order(NewOrder {
                slug: OrderSlug::generate(),
                customer: None,
                contact: ContactInfo::new("Alice", "79001234567", "alice@example.com"),
                address: address.id,
                account,
                total_price: Money::from_cents(300),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_commit_persists_changes() {
        let store = InMemoryStore::new();
        let account = seed_card(&store, 500).await;

        let loaded = store.account(account.id).await.unwrap().unwrap();
        assert_eq!(loaded.balance.cents(), 500);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = InMemoryStore::new();
        let account = seed_card(&store, 500).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.apply_balance_delta(account.id, Money::from_cents(-300))
                .await
                .unwrap();
            // no commit
        }

        let loaded = store.account(account.id).await.unwrap().unwrap();
        assert_eq!(loaded.balance.cents(), 500);
    }

    #[tokio::test]
    async fn test_balance_never_goes_negative() {
        let store = InMemoryStore::new();
        let account = seed_card(&store, 100).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .apply_balance_delta(account.id, Money::from_cents(-200))
            .await;
        assert!(matches!(result, Err(StorageError::BalanceBelowZero { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_order_slug_rejected() {
        let store = InMemoryStore::new();
        let account = seed_card(&store, 0).await;
        let order = seed_order(&store, account.id).await;

        let mut tx = store.begin().await.unwrap();
        let address = tx
            .insert_address(NewAddress {
                owner: None,
                text: "2 Main St".to_string(),
            })
            .await
            .unwrap();
        let result = tx
            .insert_order(NewOrder {
                slug: order.slug.clone(),
                customer: None,
                contact: ContactInfo::new("Bob", "79001234567", "bob@example.com"),
                address: address.id,
                account: account.id,
                total_price: Money::zero(),
            })
            .await;
        assert!(matches!(result, Err(StorageError::DuplicateSlug)));
    }

    #[tokio::test]
    async fn test_card_limit_enforced_per_owner() {
        let store = InMemoryStore::new();
        let owner = UserId::new();

        let mut tx = store.begin().await.unwrap();
        for i in 0..CARD_LIMIT {
            tx.insert_account(NewAccount {
                owner: Some(owner),
                kind: AccountKind::card(format!("123456781234567{i}")),
                balance: Money::zero(),
            })
            .await
            .unwrap();
        }
        let result = tx
            .insert_account(NewAccount {
                owner: Some(owner),
                kind: AccountKind::card("9999999999999999"),
                balance: Money::zero(),
            })
            .await;
        assert!(matches!(result, Err(StorageError::CardLimitExceeded { .. })));

        // Ownerless cards are not limited
        let anon = tx
            .insert_account(NewAccount {
                owner: None,
                kind: AccountKind::card("8888888888888888"),
                balance: Money::zero(),
            })
            .await;
        assert!(anon.is_ok());
    }

    #[tokio::test]
    async fn test_order_lookup_by_slug() {
        let store = InMemoryStore::new();
        let account = seed_card(&store, 0).await;
        let order = seed_order(&store, account.id).await;

        let found = store.order_by_slug(&order.slug).await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
        assert_eq!(found.status, OrderStatus::Created);

        let missing = store
            .order_by_slug(&OrderSlug::new("00000000-0000"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_transactions_serialize() {
        let store = InMemoryStore::new();
        let account = seed_card(&store, 100).await;

        // Two concurrent debits of 100: only one may succeed.
        let store_a = store.clone();
        let store_b = store.clone();
        let debit = |s: InMemoryStore| async move {
            let mut tx = s.begin().await.unwrap();
            let acct = tx.account_for_update(account.id).await.unwrap();
            if acct.balance.cents() < 100 {
                return false;
            }
            tx.apply_balance_delta(account.id, Money::from_cents(-100))
                .await
                .unwrap();
            tx.commit().await.unwrap();
            true
        };

        let (a, b) = tokio::join!(debit(store_a), debit(store_b));
        assert!(a ^ b, "exactly one debit should succeed");

        let loaded = store.account(account.id).await.unwrap().unwrap();
        assert_eq!(loaded.balance.cents(), 0);
    }
}
