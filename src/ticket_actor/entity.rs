use crate::actor_framework::Entity;
use crate::domain::{NewTicket, Ticket, TicketId, TicketStatus};

use super::actions::{TicketAction, TicketActionResult};
use super::error::TicketError;

impl Entity for Ticket {
    type Id = TicketId;
    type CreateParams = NewTicket;
    type Patch = ();
    type Action = TicketAction;
    type ActionResult = TicketActionResult;
    type Error = TicketError;

    const KIND: &'static str = "ticket";

    fn id(&self) -> &TicketId {
        &self.id
    }

    /// Issues a NOT_ACTIVATED ticket.
    ///
    /// # Errors
    /// Rejects a zero amount or an expiry not after creation.
    fn from_create_params(id: TicketId, params: NewTicket) -> Result<Self, TicketError> {
        if params.amount == 0 {
            return Err(TicketError::Validation("amount must be at least 1".into()));
        }
        if params.expires_at <= params.created_at {
            return Err(TicketError::Validation("expiry must be after creation".into()));
        }
        Ok(Ticket::issue(id, params))
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), TicketError> {
        Ok(())
    }

    /// Drives the ticket lifecycle.
    ///
    /// # Actions
    /// - `AttachPaymentReference`: NOT_ACTIVATED -> ACTIVATED
    /// - `Redeem`: ACTIVATED -> USED, only before expiry and with the right secret
    fn handle_action(&mut self, action: TicketAction) -> Result<TicketActionResult, TicketError> {
        match action {
            TicketAction::AttachPaymentReference(reference) => {
                if self.status != TicketStatus::NotActivated {
                    return Err(TicketError::InvalidTransition {
                        from: self.status,
                        to: TicketStatus::Activated,
                    });
                }
                self.payment_reference = Some(reference);
                self.status = TicketStatus::Activated;
                Ok(TicketActionResult::AttachPaymentReference)
            }
            TicketAction::Redeem { secret, at } => {
                if self.status != TicketStatus::Activated {
                    return Err(TicketError::InvalidTransition { from: self.status, to: TicketStatus::Used });
                }
                if self.payment_reference.is_none() {
                    return Err(TicketError::MissingPaymentReference);
                }
                if self.is_expired_at(at) {
                    return Err(TicketError::Expired { expired_at: self.expires_at });
                }
                if !self.secret().matches(&secret) {
                    return Err(TicketError::SecretMismatch);
                }
                self.status = TicketStatus::Used;
                Ok(TicketActionResult::Redeem)
            }
        }
    }
}
