use crate::domain::{CustomerId, ExternalProductId, GatewayEventId, LineItem, PaymentReference};
use crate::gateway::CheckoutCompleted;

/// Everything the pipeline needs to fulfill one paid checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct FulfillmentRequest {
    pub event_id: GatewayEventId,
    pub customer_id: CustomerId,
    pub payment_reference: PaymentReference,
    pub line_items: Vec<LineItem>,
}

impl FulfillmentRequest {
    pub fn from_checkout(completed: CheckoutCompleted, line_items: Vec<LineItem>) -> Self {
        Self {
            event_id: completed.event_id,
            customer_id: completed.customer_id,
            payment_reference: completed.payment_reference,
            line_items,
        }
    }
}

/// One purchased unit; becomes exactly one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseUnit {
    /// Position in the expanded order, used to pick the reported failure.
    pub index: usize,
    pub product_id: ExternalProductId,
}

/// Expands line items into units, preserving line order.
pub fn expand_line_items(line_items: &[LineItem]) -> Vec<PurchaseUnit> {
    line_items
        .iter()
        .flat_map(|line| (0..line.quantity).map(move |_| line.product_id.clone()))
        .enumerate()
        .map(|(index, product_id)| PurchaseUnit { index, product_id })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_one_unit_per_quantity() {
        let a = ExternalProductId::new("prod_a");
        let b = ExternalProductId::new("prod_b");
        let units = expand_line_items(&[
            LineItem::new(a.clone(), 2),
            LineItem::new(b.clone(), 0),
            LineItem::new(b.clone(), 1),
        ]);
        assert_eq!(
            units,
            vec![
                PurchaseUnit { index: 0, product_id: a.clone() },
                PurchaseUnit { index: 1, product_id: a },
                PurchaseUnit { index: 2, product_id: b },
            ]
        );
        assert!(expand_line_items(&[]).is_empty());
    }
}
