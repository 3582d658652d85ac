//! Generic resource actor with per-entity write locks and transaction workspaces.
//!
//! Every store in the system is a [`ResourceActor`] over one [`Entity`] type.
//! Writes may be issued outside a transaction (applied immediately) or inside
//! one identified by a [`TxId`]: transactional writes are staged in a private
//! workspace, become visible to other readers only on commit, and hold a write
//! lock on each touched entity until the transaction ends. Writes that hit a
//! lock held by someone else are parked and re-dispatched once it is released.

use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, DTOs, and Actions)
// =============================================================================

/// Identifier shared by every store taking part in one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(Uuid);

impl TxId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;
    type Error: Clone + Send + Sync + Debug + Display + 'static;

    /// Human readable name used in logs and errors.
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;

    /// Construct the full Entity from the ID and creation parameters
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;
    fn on_delete(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, Self::Error>;

    /// Keys that must be unique across all entities of this kind.
    fn unique_keys(&self) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameworkError<E> {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} with key {key} already exists")]
    Duplicate { kind: &'static str, key: String },
    #[error("{kind} with key {key} is being written by a concurrent transaction")]
    Conflict { kind: &'static str, key: String },
    #[error("unknown or finished transaction: {0}")]
    UnknownTransaction(TxId),
    #[error("transaction {0} is prepared and accepts no further writes")]
    TransactionPrepared(TxId),
    #[error("{0}")]
    Entity(E),
    #[error("actor closed")]
    ActorClosed,
    #[error("actor dropped the request")]
    ActorDropped,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> FrameworkError<E> {
    fn not_found<T: Entity>(id: &T::Id) -> Self {
        Self::NotFound { kind: T::KIND, id: id.to_string() }
    }

    /// Transport failures and lock timeouts, as opposed to domain rejections.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ActorClosed | Self::ActorDropped | Self::Timeout(_) | Self::Conflict { .. }
        )
    }
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<R, E> = oneshot::Sender<Result<R, FrameworkError<E>>>;

/// Predicate used by `Find`; evaluated against committed state only.
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send>;

pub enum ResourceRequest<T: Entity> {
    Create {
        tx: Option<TxId>,
        params: T::CreateParams,
        respond_to: Response<T::Id, T::Error>,
    },
    Get {
        tx: Option<TxId>,
        id: T::Id,
        respond_to: Response<Option<T>, T::Error>,
    },
    Find {
        filter: Filter<T>,
        respond_to: Response<Vec<T>, T::Error>,
    },
    Update {
        tx: Option<TxId>,
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T, T::Error>,
    },
    Delete {
        tx: Option<TxId>,
        id: T::Id,
        respond_to: Response<(), T::Error>,
    },
    Action {
        tx: Option<TxId>,
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult, T::Error>,
    },
    Begin {
        tx: TxId,
        respond_to: Response<(), T::Error>,
    },
    /// Freezes the workspace so a following `Commit` cannot fail.
    Prepare {
        tx: TxId,
        respond_to: Response<(), T::Error>,
    },
    Commit {
        tx: TxId,
        respond_to: Response<(), T::Error>,
    },
    Rollback {
        tx: TxId,
        respond_to: Response<(), T::Error>,
    },
    Shutdown,
}

impl<T: Entity> ResourceRequest<T> {
    fn tx(&self) -> Option<TxId> {
        match self {
            Self::Create { tx, .. }
            | Self::Get { tx, .. }
            | Self::Update { tx, .. }
            | Self::Delete { tx, .. }
            | Self::Action { tx, .. } => *tx,
            Self::Begin { tx, .. }
            | Self::Prepare { tx, .. }
            | Self::Commit { tx, .. }
            | Self::Rollback { tx, .. } => Some(*tx),
            Self::Find { .. } | Self::Shutdown => None,
        }
    }

    /// Entity targeted by a write that may need the entity's lock.
    fn write_target(&self) -> Option<T::Id> {
        match self {
            Self::Update { id, .. } | Self::Delete { id, .. } | Self::Action { id, .. } => {
                Some(id.clone())
            }
            _ => None,
        }
    }

    /// True once the caller stopped waiting for the answer.
    fn is_abandoned(&self) -> bool {
        match self {
            Self::Create { respond_to, .. } => respond_to.is_closed(),
            Self::Get { respond_to, .. } => respond_to.is_closed(),
            Self::Find { respond_to, .. } => respond_to.is_closed(),
            Self::Update { respond_to, .. } => respond_to.is_closed(),
            Self::Delete { respond_to, .. } => respond_to.is_closed(),
            Self::Action { respond_to, .. } => respond_to.is_closed(),
            Self::Begin { respond_to, .. }
            | Self::Prepare { respond_to, .. }
            | Self::Commit { respond_to, .. }
            | Self::Rollback { respond_to, .. } => respond_to.is_closed(),
            Self::Shutdown => false,
        }
    }

    fn reject(self, error: FrameworkError<T::Error>) {
        match self {
            Self::Create { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Get { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Find { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Update { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Delete { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Action { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Begin { respond_to, .. }
            | Self::Prepare { respond_to, .. }
            | Self::Commit { respond_to, .. }
            | Self::Rollback { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::Shutdown => {}
        }
    }
}

impl<T: Entity> Debug for ResourceRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { tx, params, .. } => f
                .debug_struct("Create")
                .field("tx", tx)
                .field("params", params)
                .finish_non_exhaustive(),
            Self::Get { tx, id, .. } => {
                f.debug_struct("Get").field("tx", tx).field("id", id).finish_non_exhaustive()
            }
            Self::Find { .. } => f.debug_struct("Find").finish_non_exhaustive(),
            Self::Update { tx, id, patch, .. } => f
                .debug_struct("Update")
                .field("tx", tx)
                .field("id", id)
                .field("patch", patch)
                .finish_non_exhaustive(),
            Self::Delete { tx, id, .. } => {
                f.debug_struct("Delete").field("tx", tx).field("id", id).finish_non_exhaustive()
            }
            Self::Action { tx, id, action, .. } => f
                .debug_struct("Action")
                .field("tx", tx)
                .field("id", id)
                .field("action", action)
                .finish_non_exhaustive(),
            Self::Begin { tx, .. } => f.debug_struct("Begin").field("tx", tx).finish_non_exhaustive(),
            Self::Prepare { tx, .. } => {
                f.debug_struct("Prepare").field("tx", tx).finish_non_exhaustive()
            }
            Self::Commit { tx, .. } => {
                f.debug_struct("Commit").field("tx", tx).finish_non_exhaustive()
            }
            Self::Rollback { tx, .. } => {
                f.debug_struct("Rollback").field("tx", tx).finish_non_exhaustive()
            }
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// Staged writes of one open transaction; `None` marks a deletion.
struct Workspace<T: Entity> {
    writes: HashMap<T::Id, Option<T>>,
    prepared: bool,
}

impl<T: Entity> Workspace<T> {
    fn new() -> Self {
        Self { writes: HashMap::new(), prepared: false }
    }
}

type ActorResult<R, T> = Result<R, FrameworkError<<T as Entity>::Error>>;

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    locks: HashMap<T::Id, TxId>,
    transactions: HashMap<TxId, Workspace<T>>,
    parked: HashMap<T::Id, VecDeque<ResourceRequest<T>>>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            locks: HashMap::new(),
            transactions: HashMap::new(),
            parked: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        (actor, ResourceClient::new(sender))
    }

    #[instrument(name = "resource_actor", skip(self), fields(kind = T::KIND))]
    pub async fn run(mut self) {
        info!("Actor started");
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, ResourceRequest::Shutdown) {
                info!("Shutdown requested");
                break;
            }
            self.dispatch(msg);
        }

        for (_, queue) in self.parked.drain() {
            for msg in queue {
                msg.reject(FrameworkError::ActorClosed);
            }
        }
        if !self.transactions.is_empty() {
            warn!(open = self.transactions.len(), "Discarding open transactions");
        }
        info!(entities = self.store.len(), "Actor stopped");
    }

    fn dispatch(&mut self, msg: ResourceRequest<T>) {
        debug!(request = ?msg, "Handling request");
        match msg {
            ResourceRequest::Create { tx, params, respond_to } => {
                let _ = respond_to.send(self.handle_create(tx, params));
            }
            ResourceRequest::Get { tx, id, respond_to } => {
                let result = self.ensure_open(tx).map(|()| self.view(tx, &id).cloned());
                let _ = respond_to.send(result);
            }
            ResourceRequest::Find { filter, respond_to } => {
                let found = self.store.values().filter(|entity| filter(entity)).cloned().collect();
                let _ = respond_to.send(Ok(found));
            }
            msg @ (ResourceRequest::Update { .. }
            | ResourceRequest::Delete { .. }
            | ResourceRequest::Action { .. }) => self.dispatch_write(msg),
            ResourceRequest::Begin { tx, respond_to } => {
                self.transactions.entry(tx).or_insert_with(Workspace::new);
                debug!(%tx, "Transaction opened");
                let _ = respond_to.send(Ok(()));
            }
            ResourceRequest::Prepare { tx, respond_to } => {
                let _ = respond_to.send(self.handle_prepare(tx));
            }
            ResourceRequest::Commit { tx, respond_to } => {
                let _ = respond_to.send(self.handle_commit(tx));
            }
            ResourceRequest::Rollback { tx, respond_to } => {
                self.handle_rollback(tx);
                let _ = respond_to.send(Ok(()));
            }
            ResourceRequest::Shutdown => {}
        }
    }

    /// Applies a write now, or parks it while another transaction holds the entity.
    fn dispatch_write(&mut self, msg: ResourceRequest<T>) {
        let Some(id) = msg.write_target() else {
            return;
        };
        let tx = msg.tx();
        if let Err(e) = self.ensure_writable(tx) {
            msg.reject(e);
            return;
        }
        if let Some(holder) = self.locks.get(&id) {
            if tx != Some(*holder) {
                debug!(%id, %holder, "Entity locked, parking write");
                self.parked.entry(id).or_default().push_back(msg);
                return;
            }
        }

        match msg {
            ResourceRequest::Update { tx, id, patch, respond_to } => {
                let result = self.apply(tx, &id, |entity| {
                    entity.on_update(patch)?;
                    Ok(entity.clone())
                });
                let _ = respond_to.send(result);
            }
            ResourceRequest::Action { tx, id, action, respond_to } => {
                let result = self.apply(tx, &id, |entity| entity.handle_action(action));
                let _ = respond_to.send(result);
            }
            ResourceRequest::Delete { tx, id, respond_to } => {
                let _ = respond_to.send(self.handle_delete(tx, id));
            }
            other => other.reject(FrameworkError::ActorDropped),
        }
    }

    fn handle_create(&mut self, tx: Option<TxId>, params: T::CreateParams) -> ActorResult<T::Id, T> {
        self.ensure_writable(tx)?;
        let id = (self.next_id_fn)();
        let mut entity = T::from_create_params(id.clone(), params).map_err(FrameworkError::Entity)?;
        entity.on_create().map_err(FrameworkError::Entity)?;
        self.check_unique(tx, &entity)?;
        self.stage(tx, id.clone(), Some(entity));
        Ok(id)
    }

    /// Runs `op` on a working copy; nothing is staged when it fails.
    fn apply<R>(
        &mut self,
        tx: Option<TxId>,
        id: &T::Id,
        op: impl FnOnce(&mut T) -> Result<R, T::Error>,
    ) -> ActorResult<R, T> {
        let mut working = self
            .view(tx, id)
            .cloned()
            .ok_or_else(|| FrameworkError::not_found::<T>(id))?;
        let result = op(&mut working).map_err(FrameworkError::Entity)?;
        self.check_unique(tx, &working)?;
        self.stage(tx, id.clone(), Some(working));
        Ok(result)
    }

    fn handle_delete(&mut self, tx: Option<TxId>, id: T::Id) -> ActorResult<(), T> {
        let entity = self.view(tx, &id).ok_or_else(|| FrameworkError::not_found::<T>(&id))?;
        entity.on_delete().map_err(FrameworkError::Entity)?;
        self.stage(tx, id, None);
        Ok(())
    }

    /// Every staged write already passed its entity and unique-key checks and
    /// holds its locks, so once the workspace is frozen only `Commit` or
    /// `Rollback` can end it.
    fn handle_prepare(&mut self, tx: TxId) -> ActorResult<(), T> {
        let workspace = self.transactions.get_mut(&tx).ok_or(FrameworkError::UnknownTransaction(tx))?;
        workspace.prepared = true;
        debug!(%tx, writes = workspace.writes.len(), "Transaction prepared");
        Ok(())
    }

    fn handle_commit(&mut self, tx: TxId) -> ActorResult<(), T> {
        let workspace = self
            .transactions
            .remove(&tx)
            .ok_or(FrameworkError::UnknownTransaction(tx))?;
        let writes = workspace.writes.len();
        for (id, staged) in workspace.writes {
            match staged {
                Some(entity) => {
                    self.store.insert(id, entity);
                }
                None => {
                    self.store.remove(&id);
                }
            }
        }
        info!(%tx, writes, "Transaction committed");
        self.release_locks(tx);
        Ok(())
    }

    /// Rolling back an unknown transaction is a no-op.
    fn handle_rollback(&mut self, tx: TxId) {
        let discarded = self.transactions.remove(&tx).map(|ws| ws.writes.len()).unwrap_or(0);

        let mut orphaned = Vec::new();
        for queue in self.parked.values_mut() {
            let mut kept = VecDeque::with_capacity(queue.len());
            for msg in queue.drain(..) {
                if msg.tx() == Some(tx) {
                    orphaned.push(msg);
                } else {
                    kept.push_back(msg);
                }
            }
            *queue = kept;
        }
        self.parked.retain(|_, queue| !queue.is_empty());
        for msg in orphaned {
            msg.reject(FrameworkError::UnknownTransaction(tx));
        }

        info!(%tx, discarded, "Transaction rolled back");
        self.release_locks(tx);
    }

    fn release_locks(&mut self, tx: TxId) {
        let released: Vec<T::Id> = self
            .locks
            .iter()
            .filter(|(_, holder)| **holder == tx)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &released {
            self.locks.remove(id);
        }
        for id in released {
            let Some(queue) = self.parked.remove(&id) else {
                continue;
            };
            debug!(%id, waiting = queue.len(), "Lock released, resuming parked writes");
            for msg in queue {
                if msg.is_abandoned() {
                    continue;
                }
                self.dispatch(msg);
            }
        }
    }

    fn ensure_open(&self, tx: Option<TxId>) -> ActorResult<(), T> {
        match tx {
            Some(tx) if !self.transactions.contains_key(&tx) => {
                Err(FrameworkError::UnknownTransaction(tx))
            }
            _ => Ok(()),
        }
    }

    fn ensure_writable(&self, tx: Option<TxId>) -> ActorResult<(), T> {
        self.ensure_open(tx)?;
        match tx.and_then(|tx| self.transactions.get(&tx).map(|ws| (tx, ws.prepared))) {
            Some((tx, true)) => Err(FrameworkError::TransactionPrepared(tx)),
            _ => Ok(()),
        }
    }

    /// Reads through the transaction's workspace first, then committed state.
    fn view(&self, tx: Option<TxId>, id: &T::Id) -> Option<&T> {
        if let Some(workspace) = tx.and_then(|tx| self.transactions.get(&tx)) {
            if let Some(staged) = workspace.writes.get(id) {
                return staged.as_ref();
            }
        }
        self.store.get(id)
    }

    fn stage(&mut self, tx: Option<TxId>, id: T::Id, value: Option<T>) {
        match tx.and_then(|tx| self.transactions.get_mut(&tx).map(|ws| (tx, ws))) {
            Some((tx, workspace)) => {
                workspace.writes.insert(id.clone(), value);
                self.locks.insert(id, tx);
            }
            None => match value {
                Some(entity) => {
                    self.store.insert(id, entity);
                }
                None => {
                    self.store.remove(&id);
                }
            },
        }
    }

    fn check_unique(&self, tx: Option<TxId>, candidate: &T) -> ActorResult<(), T> {
        let keys = candidate.unique_keys();
        if keys.is_empty() {
            return Ok(());
        }
        let shared_key = |other: &T| {
            if other.id() == candidate.id() {
                return None;
            }
            other.unique_keys().into_iter().find(|key| keys.contains(key))
        };
        let own = tx.and_then(|tx| self.transactions.get(&tx));

        for (id, committed) in &self.store {
            let visible = match own.and_then(|ws| ws.writes.get(id)) {
                Some(Some(staged)) => staged,
                Some(None) => continue,
                None => committed,
            };
            if let Some(key) = shared_key(visible) {
                return Err(FrameworkError::Duplicate { kind: T::KIND, key });
            }
        }
        if let Some(workspace) = own {
            for staged in workspace.writes.values().flatten() {
                if self.store.contains_key(staged.id()) {
                    continue;
                }
                if let Some(key) = shared_key(staged) {
                    return Err(FrameworkError::Duplicate { kind: T::KIND, key });
                }
            }
        }
        for (other_tx, workspace) in &self.transactions {
            if Some(*other_tx) == tx {
                continue;
            }
            for staged in workspace.writes.values().flatten() {
                if let Some(key) = shared_key(staged) {
                    return Err(FrameworkError::Conflict { kind: T::KIND, key });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
    request_timeout: Option<Duration>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender, request_timeout: None }
    }

    /// Bounds every request, including time spent parked behind a lock.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R, T::Error>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError<T::Error>> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        let received = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, response)
                .await
                .map_err(|_| FrameworkError::Timeout(limit))?,
            None => response.await,
        };
        received.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, tx: Option<TxId>, params: T::CreateParams) -> Result<T::Id, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Create { tx, params, respond_to }).await
    }

    pub async fn get(&self, tx: Option<TxId>, id: T::Id) -> Result<Option<T>, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Get { tx, id, respond_to }).await
    }

    pub async fn find(
        &self,
        filter: impl Fn(&T) -> bool + Send + 'static,
    ) -> Result<Vec<T>, FrameworkError<T::Error>> {
        let filter: Filter<T> = Box::new(filter);
        self.request(|respond_to| ResourceRequest::Find { filter, respond_to }).await
    }

    pub async fn update(&self, tx: Option<TxId>, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Update { tx, id, patch, respond_to }).await
    }

    pub async fn delete(&self, tx: Option<TxId>, id: T::Id) -> Result<(), FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Delete { tx, id, respond_to }).await
    }

    pub async fn perform_action(
        &self,
        tx: Option<TxId>,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Action { tx, id, action, respond_to }).await
    }

    pub async fn begin(&self, tx: TxId) -> Result<(), FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Begin { tx, respond_to }).await
    }

    pub async fn prepare(&self, tx: TxId) -> Result<(), FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Prepare { tx, respond_to }).await
    }

    pub async fn commit(&self, tx: TxId) -> Result<(), FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Commit { tx, respond_to }).await
    }

    pub async fn rollback(&self, tx: TxId) -> Result<(), FrameworkError<T::Error>> {
        self.request(|respond_to| ResourceRequest::Rollback { tx, respond_to }).await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError<T::Error>> {
        self.sender
            .send(ResourceRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        id: String,
        handle: String,
        value: u64,
    }

    #[derive(Debug)]
    struct CounterCreate {
        handle: String,
        value: u64,
    }

    #[derive(Debug)]
    struct CounterPatch {
        handle: Option<String>,
    }

    #[derive(Debug)]
    enum CounterAction {
        Take(u64),
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterError {
        TooFew { requested: u64, available: u64 },
    }

    impl Display for CounterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::TooFew { requested, available } => {
                    write!(f, "requested {requested}, available {available}")
                }
            }
        }
    }

    impl Entity for Counter {
        type Id = String;
        type CreateParams = CounterCreate;
        type Patch = CounterPatch;
        type Action = CounterAction;
        type ActionResult = u64;
        type Error = CounterError;

        const KIND: &'static str = "counter";

        fn id(&self) -> &String {
            &self.id
        }

        fn from_create_params(id: String, params: CounterCreate) -> Result<Self, CounterError> {
            Ok(Self { id, handle: params.handle, value: params.value })
        }

        fn on_update(&mut self, patch: CounterPatch) -> Result<(), CounterError> {
            if let Some(handle) = patch.handle {
                self.handle = handle;
            }
            Ok(())
        }

        fn handle_action(&mut self, action: CounterAction) -> Result<u64, CounterError> {
            match action {
                CounterAction::Take(n) if n > self.value => {
                    Err(CounterError::TooFew { requested: n, available: self.value })
                }
                CounterAction::Take(n) => {
                    self.value -= n;
                    Ok(self.value)
                }
            }
        }

        fn unique_keys(&self) -> Vec<String> {
            vec![format!("handle:{}", self.handle)]
        }
    }

    fn start() -> ResourceClient<Counter> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("counter_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::new(16, next_id);
        tokio::spawn(actor.run());
        client
    }

    async fn seed(client: &ResourceClient<Counter>, handle: &str, value: u64) -> String {
        client
            .create(None, CounterCreate { handle: handle.into(), value })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_writes_without_transaction_apply_immediately() {
        let client = start();
        let id = seed(&client, "a", 10).await;

        let remaining = client.perform_action(None, id.clone(), CounterAction::Take(4)).await.unwrap();
        assert_eq!(remaining, 6);

        let err = client.perform_action(None, id.clone(), CounterAction::Take(7)).await.unwrap_err();
        assert_eq!(err, FrameworkError::Entity(CounterError::TooFew { requested: 7, available: 6 }));
        assert_eq!(client.get(None, id).await.unwrap().unwrap().value, 6);
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let client = start();
        let id = seed(&client, "a", 10).await;
        let tx = TxId::random();
        client.begin(tx).await.unwrap();

        client.perform_action(Some(tx), id.clone(), CounterAction::Take(3)).await.unwrap();
        let created = client
            .create(Some(tx), CounterCreate { handle: "b".into(), value: 1 })
            .await
            .unwrap();

        assert_eq!(client.get(Some(tx), id.clone()).await.unwrap().unwrap().value, 7);
        assert_eq!(client.get(None, id.clone()).await.unwrap().unwrap().value, 10);
        assert!(client.get(None, created.clone()).await.unwrap().is_none());

        client.commit(tx).await.unwrap();
        assert_eq!(client.get(None, id).await.unwrap().unwrap().value, 7);
        assert!(client.get(None, created).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_workspace() {
        let client = start();
        let id = seed(&client, "a", 10).await;
        let tx = TxId::random();
        client.begin(tx).await.unwrap();
        client.perform_action(Some(tx), id.clone(), CounterAction::Take(10)).await.unwrap();
        client.delete(Some(tx), id.clone()).await.unwrap();

        client.rollback(tx).await.unwrap();

        assert_eq!(client.get(None, id.clone()).await.unwrap().unwrap().value, 10);
        let err = client.perform_action(Some(tx), id, CounterAction::Take(1)).await.unwrap_err();
        assert_eq!(err, FrameworkError::UnknownTransaction(tx));
    }

    #[tokio::test]
    async fn test_prepared_transaction_rejects_writes_and_still_commits() {
        let client = start();
        let id = seed(&client, "a", 10).await;
        let tx = TxId::random();
        client.begin(tx).await.unwrap();
        client.perform_action(Some(tx), id.clone(), CounterAction::Take(4)).await.unwrap();

        client.prepare(tx).await.unwrap();
        let err = client.perform_action(Some(tx), id.clone(), CounterAction::Take(1)).await.unwrap_err();
        assert_eq!(err, FrameworkError::TransactionPrepared(tx));
        let err = client.create(Some(tx), CounterCreate { handle: "b".into(), value: 1 }).await.unwrap_err();
        assert_eq!(err, FrameworkError::TransactionPrepared(tx));

        client.commit(tx).await.unwrap();
        assert_eq!(client.get(None, id).await.unwrap().unwrap().value, 6);
        assert_eq!(client.prepare(tx).await.unwrap_err(), FrameworkError::UnknownTransaction(tx));
    }

    #[tokio::test]
    async fn test_prepared_transaction_can_roll_back() {
        let client = start();
        let id = seed(&client, "a", 10).await;
        let tx = TxId::random();
        client.begin(tx).await.unwrap();
        client.perform_action(Some(tx), id.clone(), CounterAction::Take(4)).await.unwrap();
        client.prepare(tx).await.unwrap();

        client.rollback(tx).await.unwrap();
        assert_eq!(client.get(None, id.clone()).await.unwrap().unwrap().value, 10);
        client.perform_action(None, id, CounterAction::Take(10)).await.unwrap();
    }

    #[tokio::test]
    async fn test_locked_write_waits_and_sees_committed_value() {
        let client = start();
        let id = seed(&client, "a", 10).await;
        let (first, second) = (TxId::random(), TxId::random());
        client.begin(first).await.unwrap();
        client.begin(second).await.unwrap();

        client.perform_action(Some(first), id.clone(), CounterAction::Take(8)).await.unwrap();

        let waiting = {
            let client = client.clone();
            let id = id.clone();
            tokio::spawn(async move {
                client.perform_action(Some(second), id, CounterAction::Take(8)).await
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        client.commit(first).await.unwrap();
        let err = waiting.await.unwrap().unwrap_err();
        assert_eq!(err, FrameworkError::Entity(CounterError::TooFew { requested: 8, available: 2 }));
    }

    #[tokio::test]
    async fn test_lock_wait_bounded_by_request_timeout() {
        let client = start();
        let id = seed(&client, "a", 10).await;
        let holder = TxId::random();
        client.begin(holder).await.unwrap();
        client.perform_action(Some(holder), id.clone(), CounterAction::Take(1)).await.unwrap();

        let impatient = client.clone().with_request_timeout(Duration::from_millis(20));
        let err = impatient.perform_action(None, id.clone(), CounterAction::Take(1)).await.unwrap_err();
        assert_eq!(err, FrameworkError::Timeout(Duration::from_millis(20)));
        assert!(err.is_transient());

        // the abandoned write is dropped when the lock is released
        client.rollback(holder).await.unwrap();
        assert_eq!(client.get(None, id).await.unwrap().unwrap().value, 10);
    }

    #[tokio::test]
    async fn test_unique_keys_duplicate_and_conflict() {
        let client = start();
        seed(&client, "taken", 1).await;

        let err = client
            .create(None, CounterCreate { handle: "taken".into(), value: 1 })
            .await
            .unwrap_err();
        assert_eq!(err, FrameworkError::Duplicate { kind: "counter", key: "handle:taken".into() });

        let (first, second) = (TxId::random(), TxId::random());
        client.begin(first).await.unwrap();
        client.begin(second).await.unwrap();
        client
            .create(Some(first), CounterCreate { handle: "fresh".into(), value: 1 })
            .await
            .unwrap();

        let err = client
            .create(Some(first), CounterCreate { handle: "fresh".into(), value: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, FrameworkError::Duplicate { .. }));

        let err = client
            .create(Some(second), CounterCreate { handle: "fresh".into(), value: 1 })
            .await
            .unwrap_err();
        assert_eq!(err, FrameworkError::Conflict { kind: "counter", key: "handle:fresh".into() });
    }

    #[tokio::test]
    async fn test_find_reads_committed_state() {
        let client = start();
        seed(&client, "a", 1).await;
        seed(&client, "b", 5).await;
        let tx = TxId::random();
        client.begin(tx).await.unwrap();
        client.create(Some(tx), CounterCreate { handle: "c".into(), value: 9 }).await.unwrap();

        let found = client.find(|c: &Counter| c.value > 2).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, "b");
    }

    #[tokio::test]
    async fn test_shutdown_closes_actor() {
        let client = start();
        client.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let err = client.get(None, "counter_1".into()).await.unwrap_err();
        assert!(matches!(err, FrameworkError::ActorClosed | FrameworkError::ActorDropped));
    }
}
