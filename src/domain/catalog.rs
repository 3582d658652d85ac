use serde::Serialize;

use super::{ExternalProductId, InventoryId, ItemId};

/// A product a customer can buy; each sale represents `units_per_sale`
/// units of the linked inventory record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchasableItem {
    pub id: ItemId,
    /// Set once the item has been published to the payment gateway.
    pub external_id: Option<ExternalProductId>,
    pub title: String,
    /// Minor currency units.
    pub unit_price: u64,
    pub currency: String,
    pub seller: String,
    pub category: String,
    pub inventory_id: InventoryId,
    pub units_per_sale: u32,
}

impl PurchasableItem {
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            item_id: self.id,
            title: self.title.clone(),
            seller: self.seller.clone(),
            category: self.category.clone(),
            unit_price: self.unit_price,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemCreate {
    pub title: String,
    pub unit_price: u64,
    pub currency: String,
    pub seller: String,
    pub category: String,
    pub inventory_id: InventoryId,
    pub units_per_sale: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub unit_price: Option<u64>,
    pub seller: Option<String>,
    pub category: Option<String>,
}

/// Catalog fields shown next to a ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub item_id: ItemId,
    pub title: String,
    pub seller: String,
    pub category: String,
    pub unit_price: u64,
    pub currency: String,
}
