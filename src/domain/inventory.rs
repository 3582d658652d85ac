use serde::Serialize;

use super::InventoryId;

/// Authoritative stock counter for one kind of fuel product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRecord {
    pub id: InventoryId,
    pub title: String,
    pub amount: u64,
}

#[derive(Debug, Clone)]
pub struct InventoryCreate {
    pub title: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryPatch {
    pub title: Option<String>,
}
