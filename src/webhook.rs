//! Entry point for gateway webhook deliveries.
//!
//! Verifies the delivery, fetches line items for completed checkouts and
//! hands the order to the fulfillment pipeline. Any other event type is
//! acknowledged without side effects.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::{GatewayEventId, TicketId};
use crate::fulfillment::{FulfillmentError, FulfillmentOutcome, FulfillmentPipeline, FulfillmentRequest};
use crate::gateway::{GatewayError, PaymentGateway, VerificationError, WebhookEvent};

/// What the gateway is told about an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookAck {
    Fulfilled { event_id: GatewayEventId, tickets: Vec<TicketId> },
    AlreadyProcessed { event_id: GatewayEventId },
    Ignored { event_id: GatewayEventId, event_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("webhook verification failed: {0}")]
    Verification(#[from] VerificationError),
    #[error("could not list line items: {0}")]
    LineItems(#[source] GatewayError),
    #[error("fulfillment failed: {0}")]
    Fulfillment(#[from] FulfillmentError),
}

impl WebhookError {
    /// HTTP status the gateway receives; 5xx makes it redeliver.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::MissingSignature | WebhookError::Verification(_) => 400,
            WebhookError::LineItems(_) | WebhookError::Fulfillment(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::MissingSignature | WebhookError::Verification(_) => false,
            WebhookError::LineItems(e) => e.is_retryable(),
            WebhookError::Fulfillment(e) => e.is_retryable(),
        }
    }
}

pub struct WebhookHandler {
    gateway: Arc<dyn PaymentGateway>,
    pipeline: Arc<FulfillmentPipeline>,
}

impl WebhookHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, pipeline: Arc<FulfillmentPipeline>) -> Self {
        Self { gateway, pipeline }
    }

    #[instrument(skip(self, payload, signature), fields(bytes = payload.len()))]
    pub async fn handle(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookAck, WebhookError> {
        let signature = signature.ok_or_else(|| {
            warn!("Delivery without signature header");
            WebhookError::MissingSignature
        })?;
        let event = self.gateway.verify_event(payload, signature).map_err(|e| {
            warn!(error = %e, "Rejected webhook delivery");
            WebhookError::Verification(e)
        })?;

        let completed = match event {
            WebhookEvent::CheckoutCompleted(completed) => completed,
            WebhookEvent::Ignored { event_id, event_type } => {
                info!(%event_id, %event_type, "Ignoring event");
                return Ok(WebhookAck::Ignored { event_id, event_type });
            }
        };
        info!(event_id = %completed.event_id, session_id = %completed.session_id, "Checkout completed");

        let line_items = self.gateway.line_items(&completed.session_id).await.map_err(|e| {
            error!(error = %e, "Could not list line items");
            WebhookError::LineItems(e)
        })?;

        let outcome = self.pipeline.fulfill(FulfillmentRequest::from_checkout(completed, line_items)).await?;
        Ok(match outcome {
            FulfillmentOutcome::Fulfilled { event_id, tickets } => WebhookAck::Fulfilled {
                event_id,
                tickets: tickets.into_iter().map(|issued| issued.ticket_id).collect(),
            },
            FulfillmentOutcome::AlreadyProcessed { event_id } => WebhookAck::AlreadyProcessed { event_id },
        })
    }
}
