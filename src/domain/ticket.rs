use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, ItemSummary, PaymentReference, PurchasableItem, TicketId, UserId};

/// Lifecycle of a ticket. `Used` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    NotActivated,
    Activated,
    Used,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TicketStatus::NotActivated => "NOT_ACTIVATED",
            TicketStatus::Activated => "ACTIVATED",
            TicketStatus::Used => "USED",
        })
    }
}

/// Redemption token handed to the ticket owner; never part of a read model.
#[derive(Clone, PartialEq, Eq)]
pub struct TicketSecret(String);

impl TicketSecret {
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compares without short-circuiting on the first differing byte.
    pub fn matches(&self, candidate: &str) -> bool {
        let (ours, theirs) = (self.0.as_bytes(), candidate.as_bytes());
        ours.len() == theirs.len()
            && ours.iter().zip(theirs).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

impl fmt::Debug for TicketSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TicketSecret(..)")
    }
}

/// A fuel ticket owned by a user and, once paid, bound to a payment reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: TicketId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub status: TicketStatus,
    /// Inventory units this ticket represents.
    pub amount: u32,
    pub payment_reference: Option<PaymentReference>,
    pub item_id: ItemId,
    secret: TicketSecret,
}

impl Ticket {
    /// Builds a fresh NOT_ACTIVATED ticket with a newly generated secret.
    pub fn issue(id: TicketId, new: NewTicket) -> Self {
        Self {
            id,
            created_at: new.created_at,
            expires_at: new.expires_at,
            user_id: new.user_id,
            status: TicketStatus::NotActivated,
            amount: new.amount,
            payment_reference: None,
            item_id: new.item_id,
            secret: TicketSecret::generate(),
        }
    }

    pub fn secret(&self) -> &TicketSecret {
        &self.secret
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }

    pub fn view(&self) -> TicketView {
        TicketView {
            id: self.id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            user_id: self.user_id,
            status: self.status,
            amount: self.amount,
            payment_reference: self.payment_reference.clone(),
            item_id: self.item_id,
        }
    }
}

/// Creation parameters for a ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub amount: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewTicket {
    pub fn for_item(user_id: UserId, item: &PurchasableItem, created_at: DateTime<Utc>, term: TimeDelta) -> Self {
        Self {
            user_id,
            item_id: item.id,
            amount: item.units_per_sale,
            created_at,
            expires_at: created_at.checked_add_signed(term).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Read model of a ticket without its secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketView {
    pub id: TicketId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub status: TicketStatus,
    pub amount: u32,
    pub payment_reference: Option<PaymentReference>,
    pub item_id: ItemId,
}

/// A ticket joined with the catalog item it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketDetails {
    #[serde(flatten)]
    pub ticket: TicketView,
    pub item: ItemSummary,
}
