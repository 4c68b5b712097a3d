// Append engine: validate a batch, turn it into records, commit them create-if-absent.
//
// Responsibilities
// - Reject empty batches, mixed aggregates and version gaps before touching storage.
// - Build one record per event with a fresh record id, encoded payload and metadata.
// - Commit all version fields of the batch in one backend transaction watching the aggregate key.
//
// Concurrency
// - A version field that already exists is a conflict: nothing is written, the caller decides.
// - A transaction aborted because the aggregate key changed is re-checked and retried, with
//   backoff, up to the configured number of attempts. The re-check turns a lost race into a
//   conflict, it never overwrites.

use crate::config::StoreConfig;
use crate::core::errors::{BackendError, EventStoreError};
use crate::core::event::Event;
use crate::core::ids::IdGenerator;
use crate::core::keys::{Namespace, parse_version_field, version_field};
use crate::core::ports::{CommitOutcome, KeyValueBackend, StagedWrite};
use crate::core::record::Record;
use crate::encoding::encoder::{EncodeError, Encoder};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct AppendEngine<P> {
    encoder: Arc<dyn Encoder<P>>,
    ids: Arc<dyn IdGenerator>,
    config: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBatch {
    pub aggregate_id: Uuid,
    pub records: Vec<Record>,
}

impl<P> AppendEngine<P> {
    pub fn new(encoder: Arc<dyn Encoder<P>>, ids: Arc<dyn IdGenerator>, config: StoreConfig) -> Self {
        Self { encoder, ids, config }
    }

    /// Validate `events` against `original_version` and build their records.
    pub fn prepare<E>(
        &self,
        namespace: &Namespace,
        events: &[E],
        original_version: u64,
    ) -> Result<PreparedBatch, EventStoreError>
    where
        E: Event<Data = P>,
    {
        let first = events.first().ok_or(EventStoreError::NoEvents)?;
        let aggregate_id = first.aggregate_id();

        let mut expected = original_version;
        for event in events {
            if event.aggregate_id() != aggregate_id {
                return Err(EventStoreError::InvalidBatch {
                    expected: aggregate_id,
                    found: event.aggregate_id(),
                });
            }
            // No version follows u64::MAX.
            let next = expected.checked_add(1).ok_or(EventStoreError::VersionSequence {
                expected,
                actual: event.version(),
            })?;
            if event.version() != next {
                return Err(EventStoreError::VersionSequence {
                    expected: next,
                    actual: event.version(),
                });
            }
            expected = next;
        }

        let records = events
            .iter()
            .map(|event| self.build_record(namespace, event))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PreparedBatch { aggregate_id, records })
    }

    fn build_record<E>(&self, namespace: &Namespace, event: &E) -> Result<Record, EncodeError>
    where
        E: Event<Data = P>,
    {
        let raw_payload = self.encoder.marshal(event.data())?;
        let raw_metadata = serde_json::to_vec(event.metadata()).map_err(EncodeError::Metadata)?;
        Ok(Record {
            record_id: self.ids.next_id(),
            namespace: namespace.to_string(),
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            event_type: event.event_type().to_string(),
            raw_payload,
            timestamp: event.timestamp(),
            version: event.version(),
            raw_metadata,
        })
    }

    /// Write every record of `batch` under `key`, all or nothing.
    pub async fn commit(
        &self,
        backend: &dyn KeyValueBackend,
        key: &str,
        batch: &PreparedBatch,
    ) -> Result<(), EventStoreError> {
        let mut slots = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            slots.push((version_field(record.version), record.to_bytes()?));
        }
        let fields: Vec<String> = slots.iter().map(|(field, _)| field.clone()).collect();
        let watched = [key.to_string()];
        let max_attempts = self.config.max_commit_attempts.max(1);

        let mut attempt = 1;
        loop {
            let mut tx = backend.watch(&watched).await.map_err(EventStoreError::Storage)?;
            let existing = match tx.existing_fields(key, &fields).await {
                Ok(existing) => existing,
                Err(err) => {
                    let _ = tx.discard().await;
                    return Err(EventStoreError::Storage(err));
                }
            };
            if !existing.is_empty() {
                tx.discard().await.map_err(EventStoreError::Storage)?;
                let mut versions: Vec<u64> = existing
                    .iter()
                    .filter_map(|field| parse_version_field(field))
                    .collect();
                versions.sort_unstable();
                warn!(key, ?versions, "version conflict on append");
                return Err(EventStoreError::VersionConflict {
                    aggregate_id: batch.aggregate_id,
                    versions,
                });
            }

            for (field, value) in &slots {
                tx.stage(StagedWrite::HashSetIfAbsent {
                    key: key.to_string(),
                    field: field.clone(),
                    value: value.clone(),
                });
            }

            match tx.commit().await.map_err(EventStoreError::Storage)? {
                CommitOutcome::Committed => {
                    debug!(key, events = slots.len(), attempt, "batch committed");
                    return Ok(());
                }
                CommitOutcome::Aborted if attempt < max_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(key, attempt, ?delay, "aggregate changed during append, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                CommitOutcome::Aborted => {
                    warn!(key, attempt, "aggregate kept changing during append, giving up");
                    return Err(EventStoreError::Storage(BackendError::TransactionAborted));
                }
            }
        }
    }
}
