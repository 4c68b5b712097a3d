// Error taxonomy of the event store.
//
// Purpose
// - Let callers branch on "is this a conflict I should reload and retry" versus "is this fatal".
//
// Responsibilities
// - BackendError describes faults of the key-value backend.
// - EventStoreError is what every public store operation returns, with the cause attached.

use crate::core::keys::NamespaceError;
use crate::encoding::encoder::{DecodeError, EncodeError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("transaction aborted: a watched key changed")]
    TransactionAborted,

    #[error("backend is closed")]
    Closed,

    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("could not connect to the backing store")]
    Connection(#[source] BackendError),

    #[error("could not close the backing store")]
    Close(#[source] BackendError),

    #[error("event store is closed")]
    Closed,

    #[error("no events to append")]
    NoEvents,

    #[error("invalid event batch: event for aggregate {found} in a batch for aggregate {expected}")]
    InvalidBatch { expected: Uuid, found: Uuid },

    #[error("incorrect event version: expected {expected}, got {actual}")]
    VersionSequence { expected: u64, actual: u64 },

    #[error("version conflict: aggregate {aggregate_id} already has version(s) {versions:?}")]
    VersionConflict { aggregate_id: Uuid, versions: Vec<u64> },

    #[error("could not marshal event")]
    Encode(#[from] EncodeError),

    #[error("could not unmarshal event")]
    Decode(#[from] DecodeError),

    #[error("backing store fault")]
    Storage(#[source] BackendError),

    #[error("could not clear namespace {namespace}")]
    Clear {
        namespace: String,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    InvalidNamespace(#[from] NamespaceError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    TimedOut,
}

impl EventStoreError {
    /// Another writer got to the version first. Reload, re-derive the events and retry.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, EventStoreError::VersionConflict { .. })
    }

    /// The caller handed in a batch or namespace that can never succeed as is.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EventStoreError::NoEvents
                | EventStoreError::InvalidBatch { .. }
                | EventStoreError::VersionSequence { .. }
                | EventStoreError::InvalidNamespace(_)
        )
    }
}
