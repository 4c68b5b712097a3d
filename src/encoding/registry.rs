// Event type registry.
//
// Purpose
// - Map an event type name to the function that decodes its raw payload.
//
// Responsibilities
// - Owned by the caller and handed to an encoder at construction.
// - Unknown names are a decode error, never a silent default.

use crate::encoding::encoder::DecodeError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type DecodeFn<P> = Arc<dyn Fn(&[u8]) -> anyhow::Result<P> + Send + Sync>;

pub struct EventRegistry<P> {
    decoders: HashMap<String, DecodeFn<P>>,
}

impl<P> Default for EventRegistry<P> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<P> Clone for EventRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            decoders: self.decoders.clone(),
        }
    }
}

impl<P> fmt::Debug for EventRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EventRegistry")
            .field("event_types", &names)
            .finish()
    }
}

impl<P: 'static> EventRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a JSON payload type `T` for `event_type`, lifted into `P` by `into_payload`.
    pub fn register<T, F>(self, event_type: impl Into<String>, into_payload: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        self.register_with(event_type, move |raw| {
            let payload: T = serde_json::from_slice(raw)?;
            Ok(into_payload(payload))
        })
    }

    /// Register an arbitrary decode function, for encoders that are not JSON.
    pub fn register_with<F>(mut self, event_type: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&[u8]) -> anyhow::Result<P> + Send + Sync + 'static,
    {
        self.decoders.insert(event_type.into(), Arc::new(decode));
        self
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    pub fn decode(&self, event_type: &str, raw: &[u8]) -> Result<P, DecodeError> {
        let decode = self
            .decoders
            .get(event_type)
            .ok_or_else(|| DecodeError::UnregisteredEventType(event_type.to_string()))?;
        decode(raw).map_err(|source| DecodeError::Payload {
            event_type: event_type.to_string(),
            source,
        })
    }
}
