use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::{CustomerId, UserId};
use crate::gateway::GatewayError;

/// Errors that can occur during user operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("User validation error: {0}")]
    Validation(String),
    #[error("User {user_id} is already linked to customer {existing}")]
    CustomerAlreadyLinked { user_id: UserId, existing: CustomerId },
}

/// Failure while registering a user together with its gateway customer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistrationError {
    #[error(transparent)]
    Store(#[from] FrameworkError<UserError>),
    #[error("Creating the gateway customer failed: {0}")]
    Gateway(#[from] GatewayError),
}
