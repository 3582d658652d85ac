use crate::actor_framework::Entity;
use crate::domain::{InventoryCreate, InventoryId, InventoryPatch, InventoryRecord};

use super::actions::{InventoryAction, InventoryActionResult};
use super::error::InventoryError;

impl Entity for InventoryRecord {
    type Id = InventoryId;
    type CreateParams = InventoryCreate;
    type Patch = InventoryPatch;
    type Action = InventoryAction;
    type ActionResult = InventoryActionResult;
    type Error = InventoryError;

    const KIND: &'static str = "inventory record";

    fn id(&self) -> &InventoryId {
        &self.id
    }

    fn from_create_params(id: InventoryId, params: InventoryCreate) -> Result<Self, InventoryError> {
        Ok(Self { id, title: params.title, amount: params.amount })
    }

    /// Only the title is patchable; amounts change through actions.
    fn on_update(&mut self, patch: InventoryPatch) -> Result<(), InventoryError> {
        if let Some(title) = patch.title {
            self.title = title;
        }
        Ok(())
    }

    /// Handles stock actions.
    ///
    /// # Actions
    /// - `CheckStock`: Returns the current amount
    /// - `Decrease(n)`: Decrements by `n`, never below zero
    /// - `Restock(n)`: Increments by `n`
    ///
    /// # Errors
    /// Returns an error if a decrease exceeds the available amount or a
    /// restock would overflow.
    fn handle_action(&mut self, action: InventoryAction) -> Result<InventoryActionResult, InventoryError> {
        match action {
            InventoryAction::CheckStock => Ok(InventoryActionResult::CheckStock(self.amount)),
            InventoryAction::Decrease(requested) => {
                let remaining = self.amount.checked_sub(requested).ok_or(
                    InventoryError::InsufficientInventory { requested, available: self.amount },
                )?;
                self.amount = remaining;
                Ok(InventoryActionResult::Decrease(remaining))
            }
            InventoryAction::Restock(added) => {
                self.amount = self
                    .amount
                    .checked_add(added)
                    .ok_or_else(|| InventoryError::InvalidAmount(format!("restock of {added} overflows")))?;
                Ok(InventoryActionResult::Restock(self.amount))
            }
        }
    }
}
