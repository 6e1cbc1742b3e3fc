//! PostgreSQL integration tests.
//!
//! These tests use a shared PostgreSQL container and are ignored by
//! default because they need Docker. Run with:
//!
//! ```bash
//! cargo test -p storage --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::{OrderSlug, UserId};
use domain::{AccountKind, ContactInfo, Money, NewTransaction, OrderStatus, TransactionStatus};
use serial_test::serial;
use storage::{MarketStore, NewAccount, NewAddress, NewOrder, PostgresStore, StorageError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_store() -> PostgresStore {
    let info = get_container_info().await;
    let store = PostgresStore::connect(&info.connection_string)
        .await
        .expect("failed to connect");
    store.run_migrations().await.expect("migrations failed");
    store
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_account_insert_and_read_back() {
    let store = get_store().await;
    let owner = UserId::new();

    let mut tx = store.begin().await.unwrap();
    let card = tx
        .insert_account(NewAccount {
            owner: Some(owner),
            kind: AccountKind::card("1234567812345678"),
            balance: Money::from_cents(500),
        })
        .await
        .unwrap();
    let seller = tx
        .insert_account(NewAccount {
            owner: None,
            kind: AccountKind::store("Integration Store", false),
            balance: Money::zero(),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let loaded = store.account(card.id).await.unwrap().unwrap();
    assert_eq!(loaded, card);

    let cards = store.cards_owned_by(owner).await.unwrap();
    assert_eq!(cards.len(), 1);

    let by_slug = store
        .store_by_slug("integration-store")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_slug.id, seller.id);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_balance_delta_guard_and_rollback() {
    let store = get_store().await;

    let mut tx = store.begin().await.unwrap();
    let card = tx
        .insert_account(NewAccount {
            owner: None,
            kind: AccountKind::card("1234567812345678"),
            balance: Money::from_cents(100),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    // Over-debit is refused by the guarded UPDATE.
    let mut tx = store.begin().await.unwrap();
    let result = tx
        .apply_balance_delta(card.id, Money::from_cents(-200))
        .await;
    assert!(matches!(result, Err(StorageError::BalanceBelowZero { .. })));
    drop(tx);

    // An uncommitted debit rolls back.
    let mut tx = store.begin().await.unwrap();
    tx.apply_balance_delta(card.id, Money::from_cents(-50))
        .await
        .unwrap();
    drop(tx);

    let loaded = store.account(card.id).await.unwrap().unwrap();
    assert_eq!(loaded.balance.cents(), 100);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_duplicate_slug_does_not_poison_transaction() {
    let store = get_store().await;

    let mut tx = store.begin().await.unwrap();
    let card = tx
        .insert_account(NewAccount {
            owner: None,
            kind: AccountKind::card("1234567812345678"),
            balance: Money::zero(),
        })
        .await
        .unwrap();
    let address = tx
        .insert_address(NewAddress {
            owner: None,
            text: "1 Main St".to_string(),
        })
        .await
        .unwrap();

    let slug = OrderSlug::generate();
    let new_order = |slug: OrderSlug| NewOrder {
        slug,
        customer: None,
        contact: ContactInfo::new("Alice", "79001234567", "alice@example.com"),
        address: address.id,
        account: card.id,
        total_price: Money::from_cents(300),
    };

    let first = tx.insert_order(new_order(slug.clone())).await.unwrap();

    // Second insert with the same slug fails, but the transaction is
    // still usable: a fresh slug succeeds and everything commits.
    let collision = tx.insert_order(new_order(slug)).await;
    assert!(matches!(collision, Err(StorageError::DuplicateSlug)));

    let second = tx.insert_order(new_order(OrderSlug::generate())).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        store.order_by_slug(&first.slug).await.unwrap().unwrap().id,
        first.id
    );
    assert_eq!(
        store.order_by_slug(&second.slug).await.unwrap().unwrap().id,
        second.id
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_order_and_transaction_status_updates() {
    let store = get_store().await;

    let mut tx = store.begin().await.unwrap();
    let card = tx
        .insert_account(NewAccount {
            owner: None,
            kind: AccountKind::card("1234567812345678"),
            balance: Money::from_cents(500),
        })
        .await
        .unwrap();
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
            account: card.id,
            total_price: Money::from_cents(300),
        })
        .await
        .unwrap();
    let deposit = tx
        .insert_transaction(NewTransaction::deposit(card.id, Money::from_cents(100)))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let locked = tx.order_for_update(order.id).await.unwrap();
    assert_eq!(locked.status, OrderStatus::Created);
    tx.set_order_status(order.id, OrderStatus::Paid).await.unwrap();
    tx.set_transaction_status(deposit.id, TransactionStatus::Success)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let reloaded = store.order(order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, OrderStatus::Paid);
    let reloaded_tx = store.transaction(deposit.id).await.unwrap().unwrap();
    assert_eq!(reloaded_tx.status, TransactionStatus::Success);
}
