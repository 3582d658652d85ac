use serde::{Deserialize, Serialize};

use super::{CheckoutSessionId, CustomerId, ExternalProductId};

/// One line of a paid checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ExternalProductId,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: ExternalProductId, quantity: u32) -> Self {
        Self { product_id, quantity }
    }
}

/// A checkout session opened on the payment gateway for a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: CheckoutSessionId,
    pub customer_id: CustomerId,
    pub line_items: Vec<LineItem>,
}
