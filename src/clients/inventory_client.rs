use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::domain::{InventoryCreate, InventoryId, InventoryRecord};
use crate::impl_basic_client;
use crate::inventory_actor::{InventoryAction, InventoryError};
use crate::ports::{DecreaseError, InventoryStore, StoreError};
use crate::transaction::Transaction;

/// Client for interacting with the Inventory actor.
#[derive(Clone)]
pub struct InventoryClient {
    inner: ResourceClient<InventoryRecord>,
}

impl_basic_client!(InventoryClient, InventoryRecord, record);

impl InventoryClient {
    #[instrument(skip(self))]
    pub async fn create_record(&self, params: InventoryCreate) -> Result<InventoryId, FrameworkError<InventoryError>> {
        debug!("Sending request");
        self.inner.create(None, params).await
    }

    /// Committed amount.
    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: InventoryId) -> Result<u64, FrameworkError<InventoryError>> {
        debug!("Sending request");
        let result = self.inner.perform_action(None, id, InventoryAction::CheckStock).await?;
        Ok(result.amount())
    }

    #[instrument(skip(self))]
    pub async fn restock(&self, id: InventoryId, amount: u64) -> Result<u64, FrameworkError<InventoryError>> {
        debug!("Sending request");
        let result = self.inner.perform_action(None, id, InventoryAction::Restock(amount)).await?;
        Ok(result.amount())
    }
}

#[async_trait]
impl InventoryStore for InventoryClient {
    #[instrument(skip(self, tx), fields(tx = %tx.id()))]
    async fn decrease(&self, tx: &Transaction, inventory_id: InventoryId, amount: u64) -> Result<u64, DecreaseError> {
        debug!("Sending request");
        match self
            .inner
            .perform_action(Some(tx.id()), inventory_id, InventoryAction::Decrease(amount))
            .await
        {
            Ok(result) => Ok(result.amount()),
            Err(FrameworkError::Entity(InventoryError::InsufficientInventory { requested, available })) => {
                warn!(requested, available, "Insufficient inventory");
                Err(DecreaseError::Insufficient { inventory_id, requested, available })
            }
            Err(FrameworkError::NotFound { .. }) => Err(DecreaseError::NotFound(inventory_id)),
            Err(e) => Err(DecreaseError::Store(StoreError::from(e))),
        }
    }
}
