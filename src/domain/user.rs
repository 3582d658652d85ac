use serde::{Deserialize, Serialize};

use super::{CustomerId, UserId};

/// Access role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Operator,
    Admin,
}

impl Role {
    /// Higher levels include every permission of the lower ones.
    pub const fn authority_level(self) -> u8 {
        match self {
            Role::Customer => 0,
            Role::Operator => 2,
            Role::Admin => 3,
        }
    }

    pub const fn can_redeem_tickets(self) -> bool {
        self.authority_level() >= Role::Operator.authority_level()
    }
}

/// Represents a registered user in the system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip)]
    pub credential_hash: String,
    pub customer_id: Option<CustomerId>,
    pub role: Role,
}

/// Payload for creating a new user.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
    pub customer_id: Option<CustomerId>,
}

impl UserCreate {
    pub fn customer(email: impl Into<String>, credential_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            credential_hash: credential_hash.into(),
            role: Role::Customer,
            customer_id: None,
        }
    }
}

/// Payload for updating an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub role: Option<Role>,
}
