//! HTTP API server for the marketplace checkout and settlement engine.
//!
//! Exposes checkout, payment, fulfillment, and deposit endpoints with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{AccountKind, Money};
use metrics_exporter_prometheus::PrometheusHandle;
use settlement::{
    InMemoryPaymentGateway, LoggingNotificationSink, NotificationSink, PaymentGateway,
    SettlementError,
};
use storage::{MarketStore, NewAccount};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Display name of the marketplace operator's own store.
pub const PLATFORM_STORE_NAME: &str = "Main Store";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::checkout::create::<S>))
        .route("/orders/{slug}", get(routes::orders::get::<S>))
        .route("/orders/{slug}/pay", post(routes::orders::pay::<S>))
        .route("/orders/items/{slug}", get(routes::orders::get_item::<S>))
        .route("/payment-callback", post(routes::payments::callback::<S>))
        .route("/cards/{id}/deposits", post(routes::payments::create_deposit::<S>))
        .route(
            "/stores/{slug}/orders/{item_slug}/update-status/{new_status}",
            post(routes::stores::update_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state with the logging notification sink and the
/// in-memory gateway, seeding the platform store account if absent.
pub async fn create_default_state<S: MarketStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Result<Arc<AppState<S>>, SettlementError> {
    let notifier: Arc<dyn NotificationSink> = Arc::new(LoggingNotificationSink);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(InMemoryPaymentGateway::new());

    let platform = ensure_platform_store(&store).await?;

    Ok(Arc::new(AppState::new(
        store,
        notifier,
        gateway,
        platform,
        config.commission_bps,
    )))
}

/// Resolves the platform store account, creating it on first run.
pub async fn ensure_platform_store<S: MarketStore>(
    store: &S,
) -> Result<common::AccountId, SettlementError> {
    let kind = AccountKind::store(PLATFORM_STORE_NAME, true);
    if let Some(slug) = kind.store_slug()
        && let Some(existing) = store.store_by_slug(slug).await?
    {
        return Ok(existing.id);
    }

    let mut tx = store.begin().await?;
    let account = tx
        .insert_account(NewAccount {
            owner: None,
            kind,
            balance: Money::zero(),
        })
        .await?;
    tx.commit().await?;

    tracing::info!(account = %account.id, "platform store account created");
    Ok(account.id)
}
