use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::TicketStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TicketError {
    #[error("Ticket validation error: {0}")]
    Validation(String),
    #[error("Ticket cannot move from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },
    #[error("Ticket has no payment reference")]
    MissingPaymentReference,
    #[error("Ticket expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
    #[error("Ticket secret does not match")]
    SecretMismatch,
}
