use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::domain::{
    CheckoutSession, CheckoutSessionId, CustomerId, ExternalProductId, GatewayEventId, ItemId, LineItem,
    PaymentReference, PurchasableItem,
};

use super::{
    parse_event, GatewayError, PaymentGateway, VerificationError, WebhookEvent, WebhookVerifier,
    CHECKOUT_SESSION_COMPLETED,
};

/// A signed webhook delivery as the gateway would send it.
#[derive(Debug, Clone)]
pub struct SignedEvent {
    pub event_id: GatewayEventId,
    pub payload: Vec<u8>,
    pub signature: String,
}

struct SessionRecord {
    customer_id: CustomerId,
    line_items: Vec<LineItem>,
    payment_reference: PaymentReference,
}

#[derive(Default)]
struct GatewayState {
    customers: HashMap<CustomerId, String>,
    products: HashMap<ExternalProductId, ItemId>,
    sessions: HashMap<CheckoutSessionId, SessionRecord>,
    sequence: u64,
}

impl GatewayState {
    fn next(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}_{}", self.sequence)
    }
}

/// Self-contained gateway used by the demo binary and the tests.
///
/// Keeps customers, products and checkout sessions in memory and emits
/// webhook deliveries signed with the same secret its verifier checks.
pub struct InMemoryGateway {
    verifier: WebhookVerifier,
    state: Mutex<GatewayState>,
}

impl InMemoryGateway {
    pub fn new(verifier: WebhookVerifier) -> Self {
        Self { verifier, state: Mutex::new(GatewayState::default()) }
    }

    /// Signs an arbitrary event body with the current time.
    pub async fn signed_event(&self, event_type: &str, object: serde_json::Value) -> Result<SignedEvent, GatewayError> {
        let event_id = GatewayEventId::new(self.state.lock().await.next("evt"));
        let payload = serde_json::to_vec(&json!({
            "id": event_id.as_str(),
            "object": "event",
            "type": event_type,
            "data": { "object": object },
        }))
        .map_err(|e| GatewayError::Request(e.to_string()))?;
        let signature = self
            .verifier
            .sign(&payload, Utc::now().timestamp())
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        Ok(SignedEvent { event_id, payload, signature })
    }

    /// Marks the session paid and returns the `checkout.session.completed` delivery.
    #[instrument(skip(self))]
    pub async fn complete_checkout(&self, session_id: &CheckoutSessionId) -> Result<SignedEvent, GatewayError> {
        let (customer_id, payment_reference) = {
            let state = self.state.lock().await;
            let session = state
                .sessions
                .get(session_id)
                .ok_or_else(|| GatewayError::SessionNotFound(session_id.clone()))?;
            (session.customer_id.clone(), session.payment_reference.clone())
        };
        let object = json!({
            "id": session_id.as_str(),
            "object": "checkout.session",
            "customer": customer_id.as_str(),
            "payment_intent": { "id": payment_reference.as_str(), "object": "payment_intent" },
            "payment_status": "paid",
        });
        let event = self.signed_event(CHECKOUT_SESSION_COMPLETED, object).await?;
        info!(event_id = %event.event_id, "Checkout completed");
        Ok(event)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    fn verify_event(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, VerificationError> {
        self.verifier.verify(payload, signature_header)?;
        parse_event(payload)
    }

    async fn line_items(&self, session_id: &CheckoutSessionId) -> Result<Vec<LineItem>, GatewayError> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(session_id)
            .map(|session| session.line_items.clone())
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.clone()))
    }

    async fn create_customer(&self, email: &str) -> Result<CustomerId, GatewayError> {
        let mut state = self.state.lock().await;
        let customer_id = CustomerId::new(state.next("cus"));
        state.customers.insert(customer_id.clone(), email.to_string());
        debug!(%customer_id, "Customer created");
        Ok(customer_id)
    }

    async fn publish_product(&self, item: &PurchasableItem) -> Result<ExternalProductId, GatewayError> {
        let mut state = self.state.lock().await;
        let product_id = ExternalProductId::new(state.next("prod"));
        state.products.insert(product_id.clone(), item.id);
        debug!(%product_id, item_id = %item.id, "Product published");
        Ok(product_id)
    }

    async fn create_checkout_session(
        &self,
        customer_id: &CustomerId,
        line_items: &[LineItem],
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.lock().await;
        if !state.customers.contains_key(customer_id) {
            return Err(GatewayError::UnknownCustomer(customer_id.clone()));
        }
        if line_items.is_empty() {
            return Err(GatewayError::InvalidRequest("checkout needs at least one line item".into()));
        }
        for line in line_items {
            if !state.products.contains_key(&line.product_id) {
                return Err(GatewayError::UnknownProduct(line.product_id.clone()));
            }
            if line.quantity == 0 {
                return Err(GatewayError::InvalidRequest(format!("zero quantity for {}", line.product_id)));
            }
        }
        let session_id = CheckoutSessionId::new(state.next("cs"));
        let payment_reference = PaymentReference::new(state.next("pi"));
        state.sessions.insert(
            session_id.clone(),
            SessionRecord {
                customer_id: customer_id.clone(),
                line_items: line_items.to_vec(),
                payment_reference,
            },
        );
        Ok(CheckoutSession { id: session_id, customer_id: customer_id.clone(), line_items: line_items.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InventoryId;
    use std::time::Duration;

    fn gateway() -> InMemoryGateway {
        InMemoryGateway::new(WebhookVerifier::new("whsec_test", Duration::from_secs(300)))
    }

    fn item() -> PurchasableItem {
        PurchasableItem {
            id: ItemId::random(),
            external_id: None,
            title: "Petrol 10L".into(),
            unit_price: 2_000,
            currency: "eur".into(),
            seller: "North Fuel".into(),
            category: "petrol".into(),
            inventory_id: InventoryId::random(),
            units_per_sale: 10,
        }
    }

    #[tokio::test]
    async fn test_completed_checkout_round_trips_through_verification() {
        let gateway = gateway();
        let customer = gateway.create_customer("ana@example.com").await.unwrap();
        let product = gateway.publish_product(&item()).await.unwrap();
        let session = gateway
            .create_checkout_session(&customer, &[LineItem::new(product.clone(), 2)])
            .await
            .unwrap();

        let delivery = gateway.complete_checkout(&session.id).await.unwrap();
        let event = gateway.verify_event(&delivery.payload, &delivery.signature).unwrap();
        let WebhookEvent::CheckoutCompleted(completed) = event else {
            panic!("expected a completed checkout, got {event:?}");
        };
        assert_eq!(completed.customer_id, customer);
        assert_eq!(completed.session_id, session.id);
        assert_eq!(gateway.line_items(&session.id).await.unwrap(), vec![LineItem::new(product, 2)]);
    }

    #[tokio::test]
    async fn test_checkout_rejects_unpublished_products() {
        let gateway = gateway();
        let customer = gateway.create_customer("ana@example.com").await.unwrap();
        let unknown = ExternalProductId::new("prod_missing");
        let err = gateway
            .create_checkout_session(&customer, &[LineItem::new(unknown.clone(), 1)])
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::UnknownProduct(unknown));
    }

    #[tokio::test]
    async fn test_tampered_delivery_fails_verification() {
        let gateway = gateway();
        let mut delivery = gateway.signed_event("invoice.paid", json!({ "id": "in_1" })).await.unwrap();
        delivery.payload.push(b' ');
        assert_eq!(
            gateway.verify_event(&delivery.payload, &delivery.signature),
            Err(VerificationError::SignatureMismatch)
        );
    }
}
