// Shared fixtures for the integration tests.
//
// Responsibilities
// - A small "Item" aggregate with its payload types, registry and event builders.
// - Opt-in log output: set RUST_LOG to see what the store does during a test.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use kv_event_store::core::event::NewEvent;
use kv_event_store::encoding::json_encoder::JsonEncoder;
use kv_event_store::encoding::registry::EventRegistry;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub const AGGREGATE_TYPE: &str = "Item";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRenamed {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemEvent {
    Created(ItemCreated),
    Renamed(ItemRenamed),
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn item_encoder() -> Arc<JsonEncoder<ItemEvent>> {
    Arc::new(JsonEncoder::new(
        EventRegistry::new()
            .register("Created", ItemEvent::Created)
            .register("Renamed", ItemEvent::Renamed),
    ))
}

pub fn timestamp(version: u64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + chrono::Duration::seconds(version as i64)
}

pub fn created(aggregate_id: Uuid, version: u64, name: &str) -> NewEvent<ItemEvent> {
    NewEvent::new(aggregate_id, AGGREGATE_TYPE, "Created", version, timestamp(version)).with_data(
        ItemEvent::Created(ItemCreated {
            name: name.to_string(),
        }),
    )
}

pub fn renamed(aggregate_id: Uuid, version: u64, from: &str, to: &str) -> NewEvent<ItemEvent> {
    NewEvent::new(aggregate_id, AGGREGATE_TYPE, "Renamed", version, timestamp(version)).with_data(
        ItemEvent::Renamed(ItemRenamed {
            from: from.to_string(),
            to: to.to_string(),
        }),
    )
}
