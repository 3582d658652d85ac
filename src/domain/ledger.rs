use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{GatewayEventId, LedgerEntryId, PaymentReference};

/// Record of a gateway event whose fulfillment has been committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedEvent {
    pub id: LedgerEntryId,
    pub event_id: GatewayEventId,
    pub payment_reference: PaymentReference,
    pub tickets_issued: usize,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProcessedEvent {
    pub event_id: GatewayEventId,
    pub payment_reference: PaymentReference,
    pub tickets_issued: usize,
    pub processed_at: DateTime<Utc>,
}
