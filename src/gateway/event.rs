//! Parsing of verified webhook payloads.

use serde::Deserialize;

use crate::domain::{CheckoutSessionId, CustomerId, GatewayEventId, PaymentReference};

use super::VerificationError;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A verified gateway event, reduced to what the system acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutCompleted),
    /// Any other event type; acknowledged without side effects.
    Ignored { event_id: GatewayEventId, event_type: String },
}

impl WebhookEvent {
    pub fn event_id(&self) -> &GatewayEventId {
        match self {
            WebhookEvent::CheckoutCompleted(completed) => &completed.event_id,
            WebhookEvent::Ignored { event_id, .. } => event_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCompleted {
    pub event_id: GatewayEventId,
    pub session_id: CheckoutSessionId,
    pub customer_id: CustomerId,
    pub payment_reference: PaymentReference,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// Gateway references arrive either as a bare id or as an expanded object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ObjectRef {
    Id(String),
    Expanded { id: String },
}

impl ObjectRef {
    fn into_id(self) -> String {
        match self {
            ObjectRef::Id(id) | ObjectRef::Expanded { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    customer: Option<ObjectRef>,
    payment_intent: Option<ObjectRef>,
}

fn invalid(message: impl Into<String>) -> VerificationError {
    VerificationError::InvalidPayload(message.into())
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, VerificationError> {
    let raw: RawEvent = serde_json::from_slice(payload).map_err(|e| invalid(e.to_string()))?;
    let event_id = GatewayEventId::new(raw.id);
    if raw.event_type != CHECKOUT_SESSION_COMPLETED {
        return Ok(WebhookEvent::Ignored { event_id, event_type: raw.event_type });
    }

    let session: RawCheckoutSession =
        serde_json::from_value(raw.data.object).map_err(|e| invalid(format!("checkout session: {e}")))?;
    let customer = session.customer.ok_or_else(|| invalid("checkout session has no customer"))?;
    let payment_intent = session
        .payment_intent
        .ok_or_else(|| invalid("checkout session has no payment intent"))?;

    Ok(WebhookEvent::CheckoutCompleted(CheckoutCompleted {
        event_id,
        session_id: CheckoutSessionId::new(session.id),
        customer_id: CustomerId::new(customer.into_id()),
        payment_reference: PaymentReference::new(payment_intent.into_id()),
    }))
}
