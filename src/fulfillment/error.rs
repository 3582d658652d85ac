use std::time::Duration;

use thiserror::Error;

use crate::domain::{CustomerId, ExternalProductId, GatewayEventId, InventoryId};
use crate::ports::{DecreaseError, StoreError};

/// Why a single purchase unit could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    #[error("no catalog item for product {0}")]
    CatalogItemNotFound(ExternalProductId),
    #[error("insufficient inventory for {inventory_id}: requested {requested}, available {available}")]
    InsufficientInventory { inventory_id: InventoryId, requested: u64, available: u64 },
    #[error("inventory record {0} linked from the catalog does not exist")]
    InventoryRecordMissing(InventoryId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("task ended without reporting an outcome")]
    Lost,
}

impl From<DecreaseError> for TaskFailure {
    fn from(err: DecreaseError) -> Self {
        match err {
            DecreaseError::Insufficient { inventory_id, requested, available } => {
                Self::InsufficientInventory { inventory_id, requested, available }
            }
            DecreaseError::NotFound(inventory_id) => Self::InventoryRecordMissing(inventory_id),
            DecreaseError::Store(e) => Self::Store(e),
        }
    }
}

/// Why an event could not be fulfilled. Nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    #[error("no user for customer {0}")]
    UserNotFound(CustomerId),
    #[error("event contains no purchasable units")]
    EmptyOrder,
    #[error("unit {unit}: no catalog item for product {product_id}")]
    CatalogItemNotFound { unit: usize, product_id: ExternalProductId },
    #[error("unit {unit}: insufficient inventory for {inventory_id}: requested {requested}, available {available}")]
    InsufficientInventory { unit: usize, inventory_id: InventoryId, requested: u64, available: u64 },
    #[error("unit {unit}: inventory record {inventory_id} does not exist")]
    InventoryRecordMissing { unit: usize, inventory_id: InventoryId },
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("unit {unit}: task ended without reporting an outcome")]
    TaskLost { unit: usize },
    #[error("fulfillment did not finish within {0:?}")]
    Timeout(Duration),
    #[error("event {0} is being processed by another delivery")]
    DuplicateInFlight(GatewayEventId),
}

impl FulfillmentError {
    /// Transient failures the gateway should redeliver.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::TaskLost { .. } | Self::Timeout(_) | Self::DuplicateInFlight(_) => true,
            Self::UserNotFound(_)
            | Self::EmptyOrder
            | Self::CatalogItemNotFound { .. }
            | Self::InsufficientInventory { .. }
            | Self::InventoryRecordMissing { .. } => false,
        }
    }

    pub(crate) fn from_task(unit: usize, failure: TaskFailure) -> Self {
        match failure {
            TaskFailure::CatalogItemNotFound(product_id) => Self::CatalogItemNotFound { unit, product_id },
            TaskFailure::InsufficientInventory { inventory_id, requested, available } => {
                Self::InsufficientInventory { unit, inventory_id, requested, available }
            }
            TaskFailure::InventoryRecordMissing(inventory_id) => Self::InventoryRecordMissing { unit, inventory_id },
            TaskFailure::Store(e) => Self::Store(e),
            TaskFailure::Lost => Self::TaskLost { unit },
        }
    }
}
