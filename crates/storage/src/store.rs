//! Repository traits shared by the in-memory and PostgreSQL backends.

use async_trait::async_trait;
use common::{
    AccountId, AddressId, ItemSlug, OrderId, OrderItemId, OrderSlug, ProductId, TransactionId,
    UserId,
};
use domain::{
    Account, AccountKind, Address, ContactInfo, ItemStatus, Money, NewTransaction, Order,
    OrderItem, OrderStatus, Product, Transaction, TransactionStatus,
};

use crate::error::Result;

/// An account about to be persisted; the store assigns id and creation
/// time.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner: Option<UserId>,
    pub kind: AccountKind,
    pub balance: Money,
}

/// An address about to be persisted.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub owner: Option<UserId>,
    pub text: String,
}

/// An order about to be persisted with status `Created`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub slug: OrderSlug,
    pub customer: Option<UserId>,
    pub contact: ContactInfo,
    pub address: AddressId,
    pub account: AccountId,
    pub total_price: Money,
}

/// An order item about to be persisted with status `Created`.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub slug: ItemSlug,
    pub order: OrderId,
    pub product: ProductId,
    pub seller: AccountId,
    pub quantity: u32,
    pub price: Money,
}

/// Entry point to the persistent state.
///
/// Plain reads run outside any transaction; everything that mutates
/// goes through [`MarketStore::begin`].
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> Result<Box<dyn MarketTx>>;

    /// Loads an account by id.
    async fn account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Loads an address by id.
    async fn address(&self, id: AddressId) -> Result<Option<Address>>;

    /// Loads a product by id.
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Loads an order by id.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads an order by its public slug.
    async fn order_by_slug(&self, slug: &OrderSlug) -> Result<Option<Order>>;

    /// Loads all items of an order, oldest first.
    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>>;

    /// Loads an order item by its public slug.
    async fn order_item_by_slug(&self, slug: &ItemSlug) -> Result<Option<OrderItem>>;

    /// Loads a ledger transaction by id.
    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Loads all card accounts owned by a user, oldest first.
    async fn cards_owned_by(&self, user: UserId) -> Result<Vec<Account>>;

    /// Loads all addresses owned by a user, oldest first.
    async fn addresses_owned_by(&self, user: UserId) -> Result<Vec<Address>>;

    /// Resolves a store account by its public slug.
    async fn store_by_slug(&self, slug: &str) -> Result<Option<Account>>;
}

/// A unit of work over the market state.
///
/// All reads labelled `for_update` take row locks in the PostgreSQL
/// backend; the in-memory backend serializes whole transactions, which
/// gives the same observable behavior. Dropping the transaction without
/// calling [`MarketTx::commit`] discards every change.
#[async_trait]
pub trait MarketTx: Send {
    // -- Locked reads --

    /// Loads an account, locking its row for the transaction.
    async fn account_for_update(&mut self, id: AccountId) -> Result<Account>;

    /// Loads an order, locking its row for the transaction.
    async fn order_for_update(&mut self, id: OrderId) -> Result<Order>;

    /// Loads an order item, locking its row for the transaction.
    async fn order_item_for_update(&mut self, id: OrderItemId) -> Result<OrderItem>;

    /// Loads a product, locking its row for the transaction.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Product>;

    /// Loads a ledger transaction, locking its row for the transaction.
    async fn transaction_for_update(&mut self, id: TransactionId) -> Result<Transaction>;

    /// Loads all items of an order, oldest first.
    async fn order_items(&mut self, order: OrderId) -> Result<Vec<OrderItem>>;

    // -- Inserts --

    /// Persists a new account. Enforces the per-user card limit.
    async fn insert_account(&mut self, account: NewAccount) -> Result<Account>;

    /// Persists a new address.
    async fn insert_address(&mut self, address: NewAddress) -> Result<Address>;

    /// Persists a catalog product (seed and test data paths).
    async fn insert_product(&mut self, product: Product) -> Result<()>;

    /// Persists a new order with status `Created`.
    ///
    /// Fails with [`crate::StorageError::DuplicateSlug`] on slug
    /// collision without poisoning the transaction.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    /// Persists a new order item with status `Created`.
    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItem>;

    /// Appends a ledger transaction.
    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction>;

    // -- Mutations --

    /// Applies a signed delta to an account balance.
    ///
    /// Fails with [`crate::StorageError::BalanceBelowZero`] instead of
    /// ever storing a negative balance.
    async fn apply_balance_delta(&mut self, id: AccountId, delta: Money) -> Result<()>;

    /// Overwrites a product's stock counter and active flag.
    async fn set_product_stock(
        &mut self,
        id: ProductId,
        in_stock: Option<u32>,
        is_active: bool,
    ) -> Result<()>;

    /// Updates an order item's status.
    async fn set_item_status(&mut self, id: OrderItemId, status: ItemStatus) -> Result<()>;

    /// Updates an order's status.
    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Updates a ledger transaction's status.
    async fn set_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<()>;

    /// Commits every change made through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}
