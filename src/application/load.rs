// Load engine: fetch an aggregate's records and decode them into an ordered event sequence.
//
// Responsibilities
// - Read every version field of the aggregate key.
// - Decode envelope, payload (through the encoder, by event type) and metadata.
// - Order by version; storage gives no field order.
//
// Failure
// - Any record that fails to decode fails the whole load. No partial results.

use crate::core::errors::EventStoreError;
use crate::core::event::{Metadata, RecordedEvent};
use crate::core::keys::{Namespace, aggregate_key, parse_version_field};
use crate::core::ports::KeyValueBackend;
use crate::core::record::Record;
use crate::encoding::encoder::{DecodeError, Encoder};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct LoadEngine<P> {
    encoder: Arc<dyn Encoder<P>>,
}

impl<P> LoadEngine<P> {
    pub fn new(encoder: Arc<dyn Encoder<P>>) -> Self {
        Self { encoder }
    }

    pub async fn load(
        &self,
        backend: &dyn KeyValueBackend,
        namespace: &Namespace,
        aggregate_id: Uuid,
    ) -> Result<Vec<RecordedEvent<P>>, EventStoreError> {
        let key = aggregate_key(namespace, &aggregate_id);
        let slots = backend
            .hash_get_all(&key)
            .await
            .map_err(EventStoreError::Storage)?;

        let mut decoded = slots
            .iter()
            .map(|(field, raw)| self.decode(field, raw))
            .collect::<Result<Vec<_>, _>>()?;
        decoded.sort_by_key(|(version, _)| *version);
        debug!(key = %key, events = decoded.len(), "aggregate loaded");
        Ok(decoded.into_iter().map(|(_, event)| event).collect())
    }

    /// Decode the record stored under version field `field`.
    pub fn decode(&self, field: &str, raw: &[u8]) -> Result<(u64, RecordedEvent<P>), DecodeError> {
        let record = Record::from_bytes(raw)?;
        let field_version =
            parse_version_field(field).ok_or_else(|| DecodeError::InvalidVersionField(field.to_string()))?;
        if field_version != record.version {
            return Err(DecodeError::VersionFieldMismatch {
                field: field.to_string(),
                version: record.version,
            });
        }

        let data = record
            .raw_payload
            .as_deref()
            .map(|raw| self.encoder.unmarshal(&record.event_type, raw))
            .transpose()?;
        let metadata = decode_metadata(&record.raw_metadata)?;
        Ok((record.version, RecordedEvent::from_record(record, data, metadata)))
    }
}

fn decode_metadata(raw: &[u8]) -> Result<Metadata, DecodeError> {
    if raw.is_empty() {
        return Ok(Metadata::new());
    }
    let metadata: Option<Metadata> = serde_json::from_slice(raw).map_err(DecodeError::Metadata)?;
    Ok(metadata.unwrap_or_default())
}
