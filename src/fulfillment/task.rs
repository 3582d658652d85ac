use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use crate::domain::{InventoryId, ItemId, NewTicket, PaymentReference, TicketId, UserId};
use crate::ports::{CatalogLookup, InventoryStore, LookupError, TicketStore};
use crate::transaction::Transaction;

use super::error::TaskFailure;
use super::request::PurchaseUnit;

/// Shared, read-only inputs of every unit task of one event.
pub(crate) struct TaskContext {
    pub catalog: Arc<dyn CatalogLookup>,
    pub tickets: Arc<dyn TicketStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub transaction: Transaction,
    pub user_id: UserId,
    pub payment_reference: PaymentReference,
    pub ticket_term: TimeDelta,
}

/// A ticket staged inside the event's transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    pub unit: usize,
    pub ticket_id: TicketId,
    pub item_id: ItemId,
    pub inventory_id: InventoryId,
    pub remaining_inventory: u64,
}

/// What a unit task reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Issued(IssuedTicket),
    Failed { unit: usize, failure: TaskFailure },
}

impl TaskOutcome {
    pub fn unit(&self) -> usize {
        match self {
            TaskOutcome::Issued(issued) => issued.unit,
            TaskOutcome::Failed { unit, .. } => *unit,
        }
    }
}

/// Look up the item, create the ticket, activate it, decrement inventory.
pub(crate) async fn materialize(ctx: &TaskContext, unit: PurchaseUnit) -> TaskOutcome {
    let index = unit.index;
    match issue_ticket(ctx, unit).await {
        Ok(issued) => {
            debug!(ticket_id = %issued.ticket_id, remaining = issued.remaining_inventory, "Unit materialized");
            TaskOutcome::Issued(issued)
        }
        Err(failure) => {
            warn!(error = %failure, "Unit failed");
            TaskOutcome::Failed { unit: index, failure }
        }
    }
}

async fn issue_ticket(ctx: &TaskContext, unit: PurchaseUnit) -> Result<IssuedTicket, TaskFailure> {
    let item = ctx
        .catalog
        .find_by_external_id(&unit.product_id)
        .await
        .map_err(|e| match e {
            LookupError::NotFound { .. } => TaskFailure::CatalogItemNotFound(unit.product_id.clone()),
            LookupError::Store(e) => TaskFailure::Store(e),
        })?;

    let new_ticket = NewTicket::for_item(ctx.user_id, &item, Utc::now(), ctx.ticket_term);
    let ticket_id = ctx.tickets.create(&ctx.transaction, new_ticket).await?;
    ctx.tickets
        .attach_payment_reference(&ctx.transaction, ticket_id, ctx.payment_reference.clone())
        .await?;

    let remaining_inventory = ctx
        .inventory
        .decrease(&ctx.transaction, item.inventory_id, u64::from(item.units_per_sale))
        .await?;

    Ok(IssuedTicket {
        unit: unit.index,
        ticket_id,
        item_id: item.id,
        inventory_id: item.inventory_id,
        remaining_inventory,
    })
}
