use chrono::{DateTime, Utc};

use crate::domain::PaymentReference;

/// Custom actions for tickets.
#[derive(Debug, Clone)]
pub enum TicketAction {
    /// Binds the ticket to its payment and activates it.
    AttachPaymentReference(PaymentReference),
    /// Marks an activated ticket as used after checking its secret.
    Redeem { secret: String, at: DateTime<Utc> },
}

/// Results from TicketActions - variants match 1:1 with TicketAction
#[derive(Debug, Clone, PartialEq)]
pub enum TicketActionResult {
    AttachPaymentReference,
    Redeem,
}
