//! Strongly typed identifiers.
//!
//! Internal ids are UUID v4 newtypes generated by the owning store. Ids issued
//! by the payment gateway are opaque strings and only ever compared.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(
    /// Internal id of a purchasable catalog item.
    ItemId
);
uuid_id!(InventoryId);
uuid_id!(TicketId);
uuid_id!(
    /// Row id of a processed-event ledger entry.
    LedgerEntryId
);

external_id!(
    /// Gateway-side customer id (`cus_...`).
    CustomerId
);
external_id!(
    /// Gateway-side product id (`prod_...`).
    ExternalProductId
);
external_id!(
    /// Gateway payment reference a ticket is bound to (`pi_...`).
    PaymentReference
);
external_id!(
    /// Gateway event id (`evt_...`), the deduplication key for deliveries.
    GatewayEventId
);
external_id!(CheckoutSessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let customer = CustomerId::new("cus_42");
        assert_eq!(serde_json::to_string(&customer).unwrap(), "\"cus_42\"");

        let ticket = TicketId::random();
        let json = serde_json::to_string(&ticket).unwrap();
        assert_eq!(json, format!("\"{}\"", ticket.as_uuid()));
        assert_eq!(serde_json::from_str::<TicketId>(&json).unwrap(), ticket);
    }
}
