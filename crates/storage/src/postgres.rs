//! PostgreSQL-backed market store.
//!
//! Every `*_for_update` read takes a `FOR UPDATE` row lock, so
//! concurrent settlements against the same account, order, or product
//! serialize at the database. Slug inserts use `ON CONFLICT DO NOTHING`
//! so a collision surfaces as [`StorageError::DuplicateSlug`] without
//! aborting the enclosing transaction.

use async_trait::async_trait;
use chrono::Utc;
use common::{
    AccountId, AddressId, ItemSlug, OrderId, OrderItemId, OrderSlug, ProductId, TransactionId,
    UserId,
};
use domain::{
    Account, AccountKind, Address, CARD_LIMIT, ContactInfo, ItemStatus, Money, NewTransaction,
    Order, OrderItem, OrderStatus, Product, Transaction, TransactionStatus,
};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::store::{MarketStore, MarketTx, NewAccount, NewAddress, NewOrder, NewOrderItem};

/// PostgreSQL market store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

struct PostgresTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

// -- Row mapping --

fn row_to_account(row: PgRow) -> Result<Account> {
    let kind: String = row.try_get("kind")?;
    let kind = match kind.as_str() {
        "card" => AccountKind::Card {
            card_number: row.try_get("card_number")?,
        },
        "store" => AccountKind::Store {
            name: row.try_get("store_name")?,
            slug: row.try_get("store_slug")?,
            platform: row.try_get("platform")?,
        },
        other => {
            return Err(StorageError::Decode(format!("unknown account kind: {other}")));
        }
    };

    Ok(Account {
        id: AccountId::from_uuid(row.try_get("id")?),
        owner: row
            .try_get::<Option<Uuid>, _>("owner")?
            .map(UserId::from_uuid),
        kind,
        balance: Money::from_cents(row.try_get("balance")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_address(row: PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::from_uuid(row.try_get("id")?),
        owner: row
            .try_get::<Option<Uuid>, _>("owner")?
            .map(UserId::from_uuid),
        text: row.try_get("text")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        seller: AccountId::from_uuid(row.try_get("seller")?),
        title: row.try_get("title")?,
        price: Money::from_cents(row.try_get("price")?),
        discount: row.try_get::<Option<i32>, _>("discount")?.map(|d| d as u32),
        in_stock: row.try_get::<Option<i32>, _>("in_stock")?.map(|s| s as u32),
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let status_code: i16 = row.try_get("status")?;
    let status = OrderStatus::from_code(status_code as u8)
        .map_err(|e| StorageError::Decode(e.to_string()))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        slug: OrderSlug::new(row.try_get::<String, _>("slug")?),
        customer: row
            .try_get::<Option<Uuid>, _>("customer")?
            .map(UserId::from_uuid),
        contact: ContactInfo {
            name: row.try_get("name")?,
            phone_number: row.try_get("phone_number")?,
            email: row.try_get("email")?,
        },
        address: AddressId::from_uuid(row.try_get("address")?),
        account: AccountId::from_uuid(row.try_get("account")?),
        total_price: Money::from_cents(row.try_get("total_price")?),
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
    let status_code: i16 = row.try_get("status")?;
    let status = ItemStatus::from_code(status_code as u8)
        .map_err(|e| StorageError::Decode(e.to_string()))?;

    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get("id")?),
        slug: ItemSlug::new(row.try_get::<String, _>("slug")?),
        order: OrderId::from_uuid(row.try_get("order_id")?),
        product: ProductId::from_uuid(row.try_get("product")?),
        seller: AccountId::from_uuid(row.try_get("seller")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        price: Money::from_cents(row.try_get("price")?),
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_transaction(row: PgRow) -> Result<Transaction> {
    let kind: String = row.try_get("kind")?;
    let kind = domain::TransactionKind::parse(&kind)
        .ok_or_else(|| StorageError::Decode(format!("unknown transaction kind: {kind}")))?;
    let status: String = row.try_get("status")?;
    let status = TransactionStatus::parse(&status)
        .ok_or_else(|| StorageError::Decode(format!("unknown transaction status: {status}")))?;

    Ok(Transaction {
        id: TransactionId::from_uuid(row.try_get("id")?),
        kind,
        amount: Money::from_cents(row.try_get("amount")?),
        account: row
            .try_get::<Option<Uuid>, _>("account")?
            .map(AccountId::from_uuid),
        related_order: row
            .try_get::<Option<Uuid>, _>("related_order")?
            .map(OrderId::from_uuid),
        related_item: row
            .try_get::<Option<Uuid>, _>("related_item")?
            .map(OrderItemId::from_uuid),
        related_seller: row
            .try_get::<Option<Uuid>, _>("related_seller")?
            .map(AccountId::from_uuid),
        status,
        timestamp: row.try_get("timestamp")?,
    })
}

const SELECT_ACCOUNT: &str =
    "SELECT id, owner, kind, card_number, store_name, store_slug, platform, balance, created_at \
     FROM accounts";
const SELECT_ORDER: &str =
    "SELECT id, slug, customer, name, phone_number, email, address, account, total_price, \
     status, created_at, updated_at FROM orders";
const SELECT_ITEM: &str =
    "SELECT id, slug, order_id, product, seller, quantity, price, status, created_at, \
     updated_at FROM order_items";
const SELECT_PRODUCT: &str =
    "SELECT id, seller, title, price, discount, in_stock, is_active FROM products";
const SELECT_TRANSACTION: &str =
    "SELECT id, kind, amount, account, related_order, related_item, related_seller, status, \
     timestamp FROM transactions";

#[async_trait]
impl MarketStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn MarketTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTx { tx }))
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_account).transpose()
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query("SELECT id, owner, text, created_at FROM addresses WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_address).transpose()
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("{SELECT_PRODUCT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_product).transpose()
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn order_by_slug(&self, slug: &OrderSlug) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE slug = $1"))
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ITEM} WHERE order_id = $1 ORDER BY created_at, slug"
        ))
        .bind(order.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn order_item_by_slug(&self, slug: &ItemSlug) -> Result<Option<OrderItem>> {
        let row = sqlx::query(&format!("{SELECT_ITEM} WHERE slug = $1"))
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_order_item).transpose()
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!("{SELECT_TRANSACTION} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_transaction).transpose()
    }

    async fn cards_owned_by(&self, user: UserId) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ACCOUNT} WHERE owner = $1 AND kind = 'card' ORDER BY created_at"
        ))
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_account).collect()
    }

    async fn addresses_owned_by(&self, user: UserId) -> Result<Vec<Address>> {
        let rows = sqlx::query(
            "SELECT id, owner, text, created_at FROM addresses WHERE owner = $1 ORDER BY created_at",
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_address).collect()
    }

    async fn store_by_slug(&self, slug: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE store_slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_account).transpose()
    }
}

#[async_trait]
impl MarketTx for PostgresTx {
    async fn account_for_update(&mut self, id: AccountId) -> Result<Account> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StorageError::not_found("account"))?;
        row_to_account(row)
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StorageError::not_found("order"))?;
        row_to_order(row)
    }

    async fn order_item_for_update(&mut self, id: OrderItemId) -> Result<OrderItem> {
        let row = sqlx::query(&format!("{SELECT_ITEM} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StorageError::not_found("order item"))?;
        row_to_order_item(row)
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(&format!("{SELECT_PRODUCT} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StorageError::not_found("product"))?;
        row_to_product(row)
    }

    async fn transaction_for_update(&mut self, id: TransactionId) -> Result<Transaction> {
        let row = sqlx::query(&format!("{SELECT_TRANSACTION} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StorageError::not_found("transaction"))?;
        row_to_transaction(row)
    }

    async fn order_items(&mut self, order: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ITEM} WHERE order_id = $1 ORDER BY created_at, slug"
        ))
        .bind(order.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn insert_account(&mut self, account: NewAccount) -> Result<Account> {
        if let (Some(owner), AccountKind::Card { .. }) = (account.owner, &account.kind) {
            let owned: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM accounts WHERE owner = $1 AND kind = 'card'",
            )
            .bind(owner.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?;
            if owned as usize >= CARD_LIMIT {
                return Err(StorageError::CardLimitExceeded { limit: CARD_LIMIT });
            }
        }

        let id = AccountId::new();
        let created_at = Utc::now();
        let (kind, card_number, store_name, store_slug, platform) = match &account.kind {
            AccountKind::Card { card_number } => {
                ("card", Some(card_number.clone()), None, None, false)
            }
            AccountKind::Store {
                name,
                slug,
                platform,
            } => ("store", None, Some(name.clone()), Some(slug.clone()), *platform),
        };

        sqlx::query(
            "INSERT INTO accounts \
             (id, owner, kind, card_number, store_name, store_slug, platform, balance, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id.as_uuid())
        .bind(account.owner.map(|o| o.as_uuid()))
        .bind(kind)
        .bind(card_number)
        .bind(store_name)
        .bind(store_slug)
        .bind(platform)
        .bind(account.balance.cents())
        .bind(created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(Account {
            id,
            owner: account.owner,
            kind: account.kind,
            balance: account.balance,
            created_at,
        })
    }

    async fn insert_address(&mut self, address: NewAddress) -> Result<Address> {
        let id = AddressId::new();
        let created_at = Utc::now();

        sqlx::query("INSERT INTO addresses (id, owner, text, created_at) VALUES ($1, $2, $3, $4)")
            .bind(id.as_uuid())
            .bind(address.owner.map(|o| o.as_uuid()))
            .bind(&address.text)
            .bind(created_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(Address {
            id,
            owner: address.owner,
            text: address.text,
            created_at,
        })
    }

    async fn insert_product(&mut self, product: Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, seller, title, price, discount, in_stock, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product.id.as_uuid())
        .bind(product.seller.as_uuid())
        .bind(&product.title)
        .bind(product.price.cents())
        .bind(product.discount.map(|d| d as i32))
        .bind(product.in_stock.map(|s| s as i32))
        .bind(product.is_active)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let id = OrderId::new();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO orders \
             (id, slug, customer, name, phone_number, email, address, account, total_price, \
              status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(id.as_uuid())
        .bind(order.slug.as_str())
        .bind(order.customer.map(|c| c.as_uuid()))
        .bind(&order.contact.name)
        .bind(&order.contact.phone_number)
        .bind(&order.contact.email)
        .bind(order.address.as_uuid())
        .bind(order.account.as_uuid())
        .bind(order.total_price.cents())
        .bind(OrderStatus::Created.code() as i16)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::DuplicateSlug);
        }

        Ok(Order {
            id,
            slug: order.slug,
            customer: order.customer,
            contact: order.contact,
            address: order.address,
            account: order.account,
            total_price: order.total_price,
            status: OrderStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItem> {
        let id = OrderItemId::new();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO order_items \
             (id, slug, order_id, product, seller, quantity, price, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(id.as_uuid())
        .bind(item.slug.as_str())
        .bind(item.order.as_uuid())
        .bind(item.product.as_uuid())
        .bind(item.seller.as_uuid())
        .bind(item.quantity as i32)
        .bind(item.price.cents())
        .bind(ItemStatus::Created.code() as i16)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::DuplicateSlug);
        }

        Ok(OrderItem {
            id,
            slug: item.slug,
            order: item.order,
            product: item.product,
            seller: item.seller,
            quantity: item.quantity,
            price: item.price,
            status: ItemStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction> {
        let id = TransactionId::new();
        let timestamp = Utc::now();

        sqlx::query(
            "INSERT INTO transactions \
             (id, kind, amount, account, related_order, related_item, related_seller, status, \
              timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id.as_uuid())
        .bind(tx.kind.as_str())
        .bind(tx.amount.cents())
        .bind(tx.account.map(|a| a.as_uuid()))
        .bind(tx.related_order.map(|o| o.as_uuid()))
        .bind(tx.related_item.map(|i| i.as_uuid()))
        .bind(tx.related_seller.map(|s| s.as_uuid()))
        .bind(tx.status.as_str())
        .bind(timestamp)
        .execute(&mut *self.tx)
        .await?;

        Ok(Transaction {
            id,
            kind: tx.kind,
            amount: tx.amount,
            account: tx.account,
            related_order: tx.related_order,
            related_item: tx.related_item,
            related_seller: tx.related_seller,
            status: tx.status,
            timestamp,
        })
    }

    async fn apply_balance_delta(&mut self, id: AccountId, delta: Money) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET balance = balance + $2 WHERE id = $1 AND balance + $2 >= 0",
        )
        .bind(id.as_uuid())
        .bind(delta.cents())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::BalanceBelowZero { account: id });
        }
        Ok(())
    }

    async fn set_product_stock(
        &mut self,
        id: ProductId,
        in_stock: Option<u32>,
        is_active: bool,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE products SET in_stock = $2, is_active = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(in_stock.map(|s| s as i32))
            .bind(is_active)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("product"));
        }
        Ok(())
    }

    async fn set_item_status(&mut self, id: OrderItemId, status: ItemStatus) -> Result<()> {
        let result =
            sqlx::query("UPDATE order_items SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(status.code() as i16)
                .bind(Utc::now())
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("order item"));
        }
        Ok(())
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.code() as i16)
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("order"));
        }
        Ok(())
    }

    async fn set_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE transactions SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("transaction"));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
