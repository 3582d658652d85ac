use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u64, available: u64 },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
