use async_trait::async_trait;
use thiserror::Error;

use crate::domain::InventoryId;
use crate::transaction::Transaction;

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecreaseError {
    #[error("insufficient inventory for {inventory_id}: requested {requested}, available {available}")]
    Insufficient { inventory_id: InventoryId, requested: u64, available: u64 },
    #[error("inventory record not found: {0}")]
    NotFound(InventoryId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Port for the inventory counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Decrements `inventory_id` by `amount` inside `tx` and returns the
    /// amount left. Serialized per record: waits for any other transaction
    /// holding the record, then checks against the committed value.
    async fn decrease(&self, tx: &Transaction, inventory_id: InventoryId, amount: u64) -> Result<u64, DecreaseError>;
}
