// Ports define what the store needs from the outside world, and what it offers, without implementing it.
//
// Purpose
// - KeyValueBackend and BackendTransaction describe the key-value store as a hash-per-key store
//   with optimistic transactions: watch keys, read, stage writes, commit.
// - EventStore is the contract the aggregate framework codes against, so backends can be swapped.
//
// Transaction contract
// - commit applies every staged write or none of them.
// - commit reports Aborted, and applies nothing, if any watched key changed since watch.
//
// Testing guidance
// - The in memory backend implements these traits for tests and local development.

use crate::core::context::Context;
use crate::core::errors::{BackendError, EventStoreError};
use crate::core::event::{Event, RecordedEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedWrite {
    HashSetIfAbsent {
        key: String,
        field: String,
        value: Vec<u8>,
    },
    Delete {
        key: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Aborted,
}

#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Every field of the hash at `key`; empty when the key does not exist.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, BackendError>;

    /// Every key matching a glob `pattern`.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, BackendError>;

    /// Start a transaction watching `keys`.
    async fn watch(&self, keys: &[String]) -> Result<Box<dyn BackendTransaction>, BackendError>;

    async fn close(&self) -> Result<(), BackendError>;
}

#[async_trait]
pub trait BackendTransaction: Send {
    /// The subset of `fields` already present in the hash at `key`.
    async fn existing_fields(&mut self, key: &str, fields: &[String]) -> Result<Vec<String>, BackendError>;

    fn stage(&mut self, write: StagedWrite);

    async fn commit(self: Box<Self>) -> Result<CommitOutcome, BackendError>;

    /// Drop the watch without writing anything.
    async fn discard(self: Box<Self>) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedStream<P> {
    pub events: Vec<RecordedEvent<P>>,
    pub version: u64,
}

#[async_trait]
pub trait EventStore<P: Send + Sync + 'static>: Send + Sync {
    /// Append `events` to their aggregate. Event i (from 1) must carry `original_version + i`.
    async fn append<E>(&self, ctx: &Context, events: &[E], original_version: u64) -> Result<(), EventStoreError>
    where
        E: Event<Data = P>;

    /// Every event of the aggregate in ascending version order. Empty when there are none.
    async fn load(&self, ctx: &Context, aggregate_id: Uuid) -> Result<Vec<RecordedEvent<P>>, EventStoreError>;

    /// Delete every aggregate in the context's namespace.
    async fn clear(&self, ctx: &Context) -> Result<(), EventStoreError>;

    async fn close(&self) -> Result<(), EventStoreError>;

    /// Events plus the aggregate's current version, the starting point for the next append.
    async fn load_stream(&self, ctx: &Context, aggregate_id: Uuid) -> Result<LoadedStream<P>, EventStoreError> {
        let events = self.load(ctx, aggregate_id).await?;
        let version = events.last().map(|event| event.version()).unwrap_or(0);
        Ok(LoadedStream { events, version })
    }
}
