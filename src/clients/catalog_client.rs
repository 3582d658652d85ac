use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::catalog_actor::{CatalogAction, CatalogActionResult, CatalogError, PublishError};
use crate::domain::{ExternalProductId, ItemCreate, ItemId, ItemPatch, PurchasableItem};
use crate::gateway::PaymentGateway;
use crate::impl_basic_client;
use crate::ports::{CatalogLookup, LookupError, StoreError};

/// Client for interacting with the Catalog actor.
#[derive(Clone)]
pub struct CatalogClient {
    inner: ResourceClient<PurchasableItem>,
}

impl_basic_client!(CatalogClient, PurchasableItem, item);

impl CatalogClient {
    #[instrument(skip(self, params), fields(title = %params.title))]
    pub async fn create_item(&self, params: ItemCreate) -> Result<ItemId, FrameworkError<CatalogError>> {
        debug!("Sending request");
        self.inner.create(None, params).await
    }

    #[instrument(skip(self))]
    pub async fn update_item(&self, id: ItemId, patch: ItemPatch) -> Result<PurchasableItem, FrameworkError<CatalogError>> {
        debug!("Sending request");
        self.inner.update(None, id, patch).await
    }

    #[instrument(skip(self))]
    pub async fn assign_external_id(
        &self,
        id: ItemId,
        external_id: ExternalProductId,
    ) -> Result<ExternalProductId, FrameworkError<CatalogError>> {
        debug!("Sending request");
        let CatalogActionResult::AssignExternalId(assigned) =
            self.inner.perform_action(None, id, CatalogAction::AssignExternalId(external_id)).await?;
        Ok(assigned)
    }

    /// Pushes the item to the payment gateway unless it is already published.
    #[instrument(skip(self, gateway))]
    pub async fn publish(&self, id: ItemId, gateway: &dyn PaymentGateway) -> Result<ExternalProductId, PublishError> {
        let item = self.get_item(id).await?.ok_or(PublishError::NotFound(id))?;
        if let Some(external_id) = item.external_id {
            debug!(%external_id, "Item already published");
            return Ok(external_id);
        }
        let external_id = gateway.publish_product(&item).await?;
        let assigned = self.assign_external_id(id, external_id).await?;
        info!(external_id = %assigned, "Item published");
        Ok(assigned)
    }
}

#[async_trait]
impl CatalogLookup for CatalogClient {
    #[instrument(skip(self))]
    async fn find_by_external_id(&self, product_id: &ExternalProductId) -> Result<PurchasableItem, LookupError> {
        debug!("Sending request");
        let wanted = product_id.clone();
        let found = self
            .inner
            .find(move |item: &PurchasableItem| item.external_id.as_ref() == Some(&wanted))
            .await
            .map_err(StoreError::from)?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::not_found("catalog item", product_id))
    }
}
