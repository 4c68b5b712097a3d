// Record model: the persisted form of one event occurrence.
//
// Purpose
// - Hold identity, aggregate linkage, version, timestamp and the raw payload and metadata bytes.
//
// Wire format
// - Self-describing JSON envelope stored as the value of one version field.
// - Raw byte fields are base64 so any encoder's output survives the envelope.
// - A record without payload omits `raw_payload`.
//
// Lifecycle
// - Built once per validated event, never mutated after commit.

use crate::encoding::encoder::{DecodeError, EncodeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: Uuid,
    pub namespace: String,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub event_type: String,
    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<Vec<u8>>,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
    #[serde(default, with = "base64_bytes")]
    pub raw_metadata: Vec<u8>,
}

impl Record {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        serde_json::to_vec(self).map_err(EncodeError::Envelope)
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(raw).map_err(DecodeError::Envelope)
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod base64_opt {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
