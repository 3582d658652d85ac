//! Ports the fulfillment pipeline depends on.
//!
//! Each port is an object-safe async trait so the pipeline can be wired with
//! the actor-backed clients in production and with mocks in tests. Store
//! failures are reported as [`StoreError`]; lookups distinguish a missing
//! record from a failing store through [`LookupError`].

use std::fmt::Display;

use thiserror::Error;

use crate::actor_framework::FrameworkError;

mod catalog_lookup;
mod event_ledger;
mod inventory_store;
mod ticket_store;
mod user_directory;

pub use catalog_lookup::*;
pub use event_ledger::*;
pub use inventory_store::*;
pub use ticket_store::*;
pub use user_directory::*;

/// Errors raised by a store while reading or writing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or stopped answering.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
    /// The request did not complete in time, including lock waits.
    #[error("store request timed out: {message}")]
    Timeout { message: String },
    /// A concurrent transaction holds a conflicting write.
    #[error("write conflict: {message}")]
    Conflict { message: String },
    /// The transaction was already committed or rolled back.
    #[error("transaction closed: {message}")]
    TransactionClosed { message: String },
    /// The store refused the write.
    #[error("write rejected: {message}")]
    Rejected { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    /// Everything except an outright rejection may succeed on redelivery.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

impl<E: Display> From<FrameworkError<E>> for StoreError {
    fn from(err: FrameworkError<E>) -> Self {
        let message = err.to_string();
        match err {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => Self::Unavailable { message },
            FrameworkError::Timeout(_) => Self::Timeout { message },
            FrameworkError::Conflict { .. } => Self::Conflict { message },
            FrameworkError::UnknownTransaction(_) | FrameworkError::TransactionPrepared(_) => {
                Self::TransactionClosed { message }
            }
            FrameworkError::NotFound { .. } | FrameworkError::Duplicate { .. } | FrameworkError::Entity(_) => {
                Self::Rejected { message }
            }
        }
    }
}

/// Lookup failure: either nothing matched or the store failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LookupError {
    pub fn not_found(kind: &'static str, key: impl Display) -> Self {
        Self::NotFound { kind, key: key.to_string() }
    }
}
