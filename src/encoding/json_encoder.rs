// JSON implementation of the Encoder port.
//
// Responsibilities
// - Marshal payloads with serde_json.
// - Delegate unmarshalling to the caller's EventRegistry.
//
// Payload shape
// - The serialized form of P must be what the registered decoders read back,
//   typically an untagged enum whose variants wrap one payload struct each.

use crate::encoding::encoder::{DecodeError, EncodeError, Encoder};
use crate::encoding::registry::EventRegistry;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct JsonEncoder<P> {
    registry: EventRegistry<P>,
}

impl<P> JsonEncoder<P> {
    pub fn new(registry: EventRegistry<P>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EventRegistry<P> {
        &self.registry
    }
}

impl<P> Encoder<P> for JsonEncoder<P>
where
    P: Serialize + Send + Sync + 'static,
{
    fn marshal(&self, data: Option<&P>) -> Result<Option<Vec<u8>>, EncodeError> {
        data.map(|payload| serde_json::to_vec(payload).map_err(|e| EncodeError::Payload(e.into())))
            .transpose()
    }

    fn unmarshal(&self, event_type: &str, raw: &[u8]) -> Result<P, DecodeError> {
        self.registry.decode(event_type, raw)
    }
}
