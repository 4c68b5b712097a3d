// Encoder port: typed payload <-> raw bytes, keyed by event type name.
//
// Purpose
// - Keep the store independent of the payload encoding scheme.
//
// Contract
// - marshal(None) succeeds and yields None, the "no payload" representation.
// - unmarshal picks the concrete payload type from the event type name alone.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("could not marshal event payload")]
    Payload(#[source] anyhow::Error),

    #[error("could not marshal event metadata")]
    Metadata(#[source] serde_json::Error),

    #[error("could not marshal record envelope")]
    Envelope(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no payload decoder registered for event type {0:?}")]
    UnregisteredEventType(String),

    #[error("could not unmarshal payload of event type {event_type:?}")]
    Payload {
        event_type: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not unmarshal event metadata")]
    Metadata(#[source] serde_json::Error),

    #[error("could not unmarshal record envelope")]
    Envelope(#[source] serde_json::Error),

    #[error("record stored under field {0:?} which is not a version number")]
    InvalidVersionField(String),

    #[error("record stored under field {field:?} carries version {version}")]
    VersionFieldMismatch { field: String, version: u64 },
}

pub trait Encoder<P>: Send + Sync {
    fn marshal(&self, data: Option<&P>) -> Result<Option<Vec<u8>>, EncodeError>;
    fn unmarshal(&self, event_type: &str, raw: &[u8]) -> Result<P, DecodeError>;
}
