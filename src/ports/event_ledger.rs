use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{GatewayEventId, NewProcessedEvent};
use crate::transaction::Transaction;

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A committed entry already exists for the event.
    #[error("event {0} was already processed")]
    AlreadyProcessed(GatewayEventId),
    /// Another open transaction is recording the same event.
    #[error("event {0} is being processed concurrently")]
    InFlight(GatewayEventId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable record of fulfilled gateway events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Committed entries only.
    async fn is_processed(&self, event_id: &GatewayEventId) -> Result<bool, StoreError>;

    async fn record(&self, tx: &Transaction, entry: NewProcessedEvent) -> Result<(), LedgerError>;
}
