use std::convert::Infallible;

use crate::actor_framework::Entity;
use crate::domain::{LedgerEntryId, NewProcessedEvent, ProcessedEvent};

impl Entity for ProcessedEvent {
    type Id = LedgerEntryId;
    type CreateParams = NewProcessedEvent;
    type Patch = ();
    type Action = ();
    type ActionResult = ();
    type Error = Infallible;

    const KIND: &'static str = "processed event";

    fn id(&self) -> &LedgerEntryId {
        &self.id
    }

    fn from_create_params(id: LedgerEntryId, params: NewProcessedEvent) -> Result<Self, Infallible> {
        Ok(Self {
            id,
            event_id: params.event_id,
            payment_reference: params.payment_reference,
            tickets_issued: params.tickets_issued,
            processed_at: params.processed_at,
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), Infallible> {
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), Infallible> {
        Ok(())
    }

    /// One entry per gateway event.
    fn unique_keys(&self) -> Vec<String> {
        vec![format!("event:{}", self.event_id)]
    }
}
