// Event abstraction consumed and produced by the store.
//
// Purpose
// - `Event` is what the aggregate framework hands to append.
// - `NewEvent` is a plain implementation for callers without their own event type.
// - `RecordedEvent` is the event view load returns, backed by a decoded record.
//
// Versioning
// - Versions start at 1 and increase by exactly one per aggregate.

use crate::core::record::Record;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type Metadata = BTreeMap<String, serde_json::Value>;

pub trait Event: Send + Sync {
    type Data;

    fn aggregate_id(&self) -> Uuid;
    fn aggregate_type(&self) -> &str;
    fn event_type(&self) -> &str;
    fn version(&self) -> u64;
    fn timestamp(&self) -> DateTime<Utc>;
    fn data(&self) -> Option<&Self::Data>;
    fn metadata(&self) -> &Metadata;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent<P> {
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub event_type: String,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub data: Option<P>,
    pub metadata: Metadata,
}

impl<P> NewEvent<P> {
    pub fn new(
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        version: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            version,
            timestamp,
            data: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_data(mut self, data: P) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl<P: Send + Sync> Event for NewEvent<P> {
    type Data = P;

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn data(&self) -> Option<&P> {
        self.data.as_ref()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent<P> {
    record_id: Uuid,
    namespace: String,
    aggregate_id: Uuid,
    aggregate_type: String,
    event_type: String,
    version: u64,
    timestamp: DateTime<Utc>,
    data: Option<P>,
    metadata: Metadata,
}

impl<P> RecordedEvent<P> {
    pub(crate) fn from_record(record: Record, data: Option<P>, metadata: Metadata) -> Self {
        Self {
            record_id: record.record_id,
            namespace: record.namespace,
            aggregate_id: record.aggregate_id,
            aggregate_type: record.aggregate_type,
            event_type: record.event_type,
            version: record.version,
            timestamp: record.timestamp,
            data,
            metadata,
        }
    }

    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn into_data(self) -> Option<P> {
        self.data
    }
}

impl<P: Send + Sync> Event for RecordedEvent<P> {
    type Data = P;

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn data(&self) -> Option<&P> {
        self.data.as_ref()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl<P> fmt::Display for RecordedEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.event_type, self.version)
    }
}
