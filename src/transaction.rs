//! Units of work spanning several store actors.
//!
//! A [`UnitOfWork`] opens the same [`TxId`] on every participating store.
//! Commit runs in two rounds: every store is prepared first, then committed in
//! registration order. Any failure rolls back every store not yet committed.
//! [`with_transaction`] wraps a piece of async work in such a transaction.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::actor_framework::{Entity, ResourceClient, TxId};
use crate::ports::StoreError;

/// Handle threaded through every store call made inside one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transaction {
    id: TxId,
}

impl Transaction {
    pub fn new() -> Self {
        Self { id: TxId::random() }
    }

    pub fn id(&self) -> TxId {
        self.id
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// A store that can take part in a unit of work.
#[async_trait]
pub trait TransactionParticipant: Send + Sync {
    fn name(&self) -> &'static str;
    async fn begin(&self, tx: TxId) -> Result<(), StoreError>;
    /// Checks the transaction is still open and freezes its writes.
    async fn prepare(&self, tx: TxId) -> Result<(), StoreError>;
    async fn commit(&self, tx: TxId) -> Result<(), StoreError>;
    async fn rollback(&self, tx: TxId) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: Entity> TransactionParticipant for ResourceClient<T> {
    fn name(&self) -> &'static str {
        T::KIND
    }

    async fn begin(&self, tx: TxId) -> Result<(), StoreError> {
        ResourceClient::begin(self, tx).await.map_err(StoreError::from)
    }

    async fn prepare(&self, tx: TxId) -> Result<(), StoreError> {
        ResourceClient::prepare(self, tx).await.map_err(StoreError::from)
    }

    async fn commit(&self, tx: TxId) -> Result<(), StoreError> {
        ResourceClient::commit(self, tx).await.map_err(StoreError::from)
    }

    async fn rollback(&self, tx: TxId) -> Result<(), StoreError> {
        ResourceClient::rollback(self, tx).await.map_err(StoreError::from)
    }
}

/// Begins, commits and rolls back transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    async fn begin(&self) -> Result<Transaction, StoreError>;
    async fn commit(&self, tx: Transaction) -> Result<(), StoreError>;
    async fn rollback(&self, tx: Transaction) -> Result<(), StoreError>;
}

/// Coordinator over a fixed set of store actors.
#[derive(Clone, Default)]
pub struct UnitOfWork {
    participants: Vec<Arc<dyn TransactionParticipant>>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Participants commit in the order they are added. The store whose
    /// record makes the work final (the event ledger) belongs last.
    pub fn with_participant(mut self, participant: Arc<dyn TransactionParticipant>) -> Self {
        self.participants.push(participant);
        self
    }

    async fn rollback_all(&self, participants: &[Arc<dyn TransactionParticipant>], tx: TxId) -> Result<(), StoreError> {
        let mut first_error = None;
        for participant in participants {
            if let Err(e) = participant.rollback(tx).await {
                error!(%tx, store = participant.name(), error = %e, "Rollback failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl TransactionCoordinator for UnitOfWork {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Transaction, StoreError> {
        let tx = Transaction::new();
        for (opened, participant) in self.participants.iter().enumerate() {
            if let Err(e) = participant.begin(tx.id()).await {
                error!(tx = %tx.id(), store = participant.name(), error = %e, "Begin failed");
                let _ = self.rollback_all(&self.participants[..opened], tx.id()).await;
                return Err(e);
            }
        }
        debug!(tx = %tx.id(), stores = self.participants.len(), "Transaction begun");
        Ok(tx)
    }

    #[instrument(skip(self), fields(tx = %tx.id()))]
    async fn commit(&self, tx: Transaction) -> Result<(), StoreError> {
        for participant in &self.participants {
            if let Err(e) = participant.prepare(tx.id()).await {
                error!(store = participant.name(), error = %e, "Prepare failed");
                let _ = self.rollback_all(&self.participants, tx.id()).await;
                return Err(e);
            }
        }
        debug!(stores = self.participants.len(), "Transaction prepared");

        for (committed, participant) in self.participants.iter().enumerate() {
            if let Err(e) = participant.commit(tx.id()).await {
                error!(store = participant.name(), committed, error = %e, "Commit failed");
                // the failing store is rolled back too so it releases its locks
                let _ = self.rollback_all(&self.participants[committed..], tx.id()).await;
                return Err(e);
            }
        }
        info!("Transaction committed on all stores");
        Ok(())
    }

    #[instrument(skip(self), fields(tx = %tx.id()))]
    async fn rollback(&self, tx: Transaction) -> Result<(), StoreError> {
        self.rollback_all(&self.participants, tx.id()).await?;
        warn!("Transaction rolled back on all stores");
        Ok(())
    }
}

/// Runs `work` inside a fresh transaction: commits on `Ok`, rolls back on `Err`.
///
/// A failing rollback is logged; the work's own error is what the caller sees.
pub async fn with_transaction<R, E, F, Fut>(coordinator: &dyn TransactionCoordinator, work: F) -> Result<R, E>
where
    F: FnOnce(Transaction) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: From<StoreError>,
{
    let tx = coordinator.begin().await?;
    match work(tx).await {
        Ok(value) => {
            coordinator.commit(tx).await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = coordinator.rollback(tx).await {
                error!(tx = %tx.id(), error = %rollback_error, "Rollback after failed work did not complete");
            }
            Err(e)
        }
    }
}
