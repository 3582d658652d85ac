//! Payment gateway boundary.
//!
//! The pipeline only consumes event verification and line-item listing; the
//! remaining operations back user registration, catalog publishing and
//! checkout.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CheckoutSession, CheckoutSessionId, CustomerId, ExternalProductId, LineItem, PurchasableItem};

mod event;
mod in_memory;
mod signature;

pub use event::*;
pub use in_memory::*;
pub use signature::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("checkout session not found: {0}")]
    SessionNotFound(CheckoutSessionId),
    #[error("unknown product: {0}")]
    UnknownProduct(ExternalProductId),
    #[error("unknown customer: {0}")]
    UnknownCustomer(CustomerId),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("gateway request failed: {0}")]
    Request(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Request(_))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Checks the signature header against the raw body and parses the event.
    fn verify_event(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, VerificationError>;

    async fn line_items(&self, session_id: &CheckoutSessionId) -> Result<Vec<LineItem>, GatewayError>;

    async fn create_customer(&self, email: &str) -> Result<CustomerId, GatewayError>;

    async fn publish_product(&self, item: &PurchasableItem) -> Result<ExternalProductId, GatewayError>;

    async fn create_checkout_session(
        &self,
        customer_id: &CustomerId,
        line_items: &[LineItem],
    ) -> Result<CheckoutSession, GatewayError>;
}
