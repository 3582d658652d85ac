use crate::actor_framework::Entity;
use crate::domain::{ItemCreate, ItemId, ItemPatch, PurchasableItem};

use super::actions::{CatalogAction, CatalogActionResult};
use super::error::CatalogError;

impl Entity for PurchasableItem {
    type Id = ItemId;
    type CreateParams = ItemCreate;
    type Patch = ItemPatch;
    type Action = CatalogAction;
    type ActionResult = CatalogActionResult;
    type Error = CatalogError;

    const KIND: &'static str = "catalog item";

    fn id(&self) -> &ItemId {
        &self.id
    }

    /// Creates an unpublished item.
    ///
    /// # Errors
    /// Rejects empty titles and `units_per_sale` of zero.
    fn from_create_params(id: ItemId, params: ItemCreate) -> Result<Self, CatalogError> {
        if params.title.trim().is_empty() {
            return Err(CatalogError::Validation("title must not be empty".into()));
        }
        if params.units_per_sale == 0 {
            return Err(CatalogError::Validation("units_per_sale must be at least 1".into()));
        }
        Ok(Self {
            id,
            external_id: None,
            title: params.title,
            unit_price: params.unit_price,
            currency: params.currency.to_lowercase(),
            seller: params.seller,
            category: params.category,
            inventory_id: params.inventory_id,
            units_per_sale: params.units_per_sale,
        })
    }

    /// Updates descriptive fields. The external id and inventory link are not patchable.
    fn on_update(&mut self, patch: ItemPatch) -> Result<(), CatalogError> {
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(CatalogError::Validation("title must not be empty".into()));
            }
            self.title = title;
        }
        if let Some(unit_price) = patch.unit_price {
            self.unit_price = unit_price;
        }
        if let Some(seller) = patch.seller {
            self.seller = seller;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        Ok(())
    }

    fn handle_action(&mut self, action: CatalogAction) -> Result<CatalogActionResult, CatalogError> {
        match action {
            CatalogAction::AssignExternalId(external_id) => match &self.external_id {
                Some(existing) if *existing != external_id => Err(CatalogError::ExternalIdAlreadyAssigned {
                    item_id: self.id,
                    existing: existing.clone(),
                }),
                _ => {
                    self.external_id = Some(external_id.clone());
                    Ok(CatalogActionResult::AssignExternalId(external_id))
                }
            },
        }
    }

    fn unique_keys(&self) -> Vec<String> {
        self.external_id
            .iter()
            .map(|external_id| format!("external:{external_id}"))
            .collect()
    }
}
