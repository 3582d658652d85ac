use async_trait::async_trait;

use crate::domain::{NewTicket, PaymentReference, Ticket, TicketId};
use crate::transaction::Transaction;

use super::StoreError;

/// Port for transactional ticket writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Creates a NOT_ACTIVATED ticket visible only inside `tx` until commit.
    async fn create(&self, tx: &Transaction, ticket: NewTicket) -> Result<TicketId, StoreError>;

    /// Binds the payment reference and activates the ticket.
    async fn attach_payment_reference(
        &self,
        tx: &Transaction,
        ticket_id: TicketId,
        reference: PaymentReference,
    ) -> Result<Ticket, StoreError>;
}
