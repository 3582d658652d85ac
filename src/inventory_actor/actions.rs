/// Custom actions for inventory records.
///
/// These actions represent stock operations beyond standard CRUD.
#[derive(Debug, Clone)]
pub enum InventoryAction {
    /// Reads the current amount without modifying it.
    CheckStock,
    /// Decrements the amount if enough stock is available.
    ///
    /// # Errors
    /// Fails with `InsufficientInventory` when the request exceeds the
    /// available amount; the record is left unchanged.
    Decrease(u64),
    /// Adds stock, e.g. after a delivery.
    Restock(u64),
}

/// Results from InventoryActions - variants match 1:1 with InventoryAction
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryActionResult {
    /// Current amount
    CheckStock(u64),
    /// Amount remaining after the decrement
    Decrease(u64),
    /// Amount after restocking
    Restock(u64),
}

impl InventoryActionResult {
    /// Amount reported by any inventory action.
    pub fn amount(&self) -> u64 {
        match self {
            Self::CheckStock(amount) | Self::Decrease(amount) | Self::Restock(amount) => *amount,
        }
    }
}
