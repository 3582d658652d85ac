use async_trait::async_trait;

use crate::domain::{ExternalProductId, PurchasableItem};

use super::LookupError;

/// Resolves gateway product ids to catalog items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_by_external_id(&self, product_id: &ExternalProductId) -> Result<PurchasableItem, LookupError>;
}
