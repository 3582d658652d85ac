use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::{ExternalProductId, ItemId};
use crate::gateway::GatewayError;

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Catalog validation error: {0}")]
    Validation(String),
    #[error("Item {item_id} is already published as {existing}")]
    ExternalIdAlreadyAssigned { item_id: ItemId, existing: ExternalProductId },
}

/// Failure while publishing an item to the payment gateway.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("Catalog item not found: {0}")]
    NotFound(ItemId),
    #[error(transparent)]
    Store(#[from] FrameworkError<CatalogError>),
    #[error("Publishing to the gateway failed: {0}")]
    Gateway(#[from] GatewayError),
}
