use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::domain::{GatewayEventId, NewProcessedEvent, ProcessedEvent};
use crate::impl_basic_client;
use crate::ports::{EventLedger, LedgerError, StoreError};
use crate::transaction::Transaction;

/// Client for interacting with the processed-event ledger actor.
#[derive(Clone)]
pub struct LedgerClient {
    inner: ResourceClient<ProcessedEvent>,
}

impl_basic_client!(LedgerClient, ProcessedEvent, entry);

impl LedgerClient {
    #[instrument(skip(self))]
    pub async fn entry_for_event(&self, event_id: &GatewayEventId) -> Result<Option<ProcessedEvent>, StoreError> {
        debug!("Sending request");
        let wanted = event_id.clone();
        let found = self.inner.find(move |entry: &ProcessedEvent| entry.event_id == wanted).await?;
        Ok(found.into_iter().next())
    }
}

#[async_trait]
impl EventLedger for LedgerClient {
    async fn is_processed(&self, event_id: &GatewayEventId) -> Result<bool, StoreError> {
        Ok(self.entry_for_event(event_id).await?.is_some())
    }

    #[instrument(skip(self, tx, entry), fields(tx = %tx.id(), event_id = %entry.event_id))]
    async fn record(&self, tx: &Transaction, entry: NewProcessedEvent) -> Result<(), LedgerError> {
        debug!("Sending request");
        let event_id = entry.event_id.clone();
        match self.inner.create(Some(tx.id()), entry).await {
            Ok(_) => Ok(()),
            Err(FrameworkError::Duplicate { .. }) => Err(LedgerError::AlreadyProcessed(event_id)),
            Err(FrameworkError::Conflict { .. }) => Err(LedgerError::InFlight(event_id)),
            Err(e) => Err(LedgerError::Store(e.into())),
        }
    }
}
