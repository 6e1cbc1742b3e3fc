//! Payment gateway trait and in-memory implementation.
//!
//! The gateway funds card deposits asynchronously: the service creates
//! a payment carrying correlation metadata and redirects the buyer;
//! completion arrives later on the webhook path.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{AccountId, TransactionId};
use domain::Money;
use thiserror::Error;

/// A payment creation request sent to the gateway.
///
/// The transaction and account identifiers travel in the gateway's
/// request metadata so the asynchronous callback can correlate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Money,
    pub transaction: TransactionId,
    pub account: AccountId,
}

/// The gateway's answer: where to send the buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRedirect {
    pub redirect_url: String,
}

/// The gateway could not be reached or rejected the request.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers a pending payment and returns the buyer redirect URL.
    async fn create_payment(&self, request: PaymentRequest) -> Result<GatewayRedirect, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    requests: Vec<PaymentRequest>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of payments created.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().requests.len()
    }

    /// Returns the most recent payment request, if any.
    pub fn last_request(&self) -> Option<PaymentRequest> {
        self.state.read().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_payment(&self, request: PaymentRequest) -> Result<GatewayRedirect, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError("gateway unreachable".to_string()));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state.requests.push(request);

        Ok(GatewayRedirect {
            redirect_url: format!("https://gateway.test/redirect/{payment_id}"),
        })
    }
}
