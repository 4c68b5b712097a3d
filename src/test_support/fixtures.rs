// Shared test fixtures for the unit tests inside the crate.
//
// Purpose
// - A small "Item" aggregate with two payload types, its registry, and event builders.

use crate::core::event::NewEvent;
use crate::encoding::registry::EventRegistry;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
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

pub fn item_registry() -> EventRegistry<ItemEvent> {
    EventRegistry::new()
        .register("Created", ItemEvent::Created)
        .register("Renamed", ItemEvent::Renamed)
}

pub fn fixed_timestamp(version: u64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + chrono::Duration::seconds(version as i64)
}

pub fn created_event(aggregate_id: Uuid, version: u64, name: &str) -> NewEvent<ItemEvent> {
    NewEvent::new(aggregate_id, AGGREGATE_TYPE, "Created", version, fixed_timestamp(version)).with_data(
        ItemEvent::Created(ItemCreated {
            name: name.to_string(),
        }),
    )
}

pub fn renamed_event(aggregate_id: Uuid, version: u64, from: &str, to: &str) -> NewEvent<ItemEvent> {
    NewEvent::new(aggregate_id, AGGREGATE_TYPE, "Renamed", version, fixed_timestamp(version)).with_data(
        ItemEvent::Renamed(ItemRenamed {
            from: from.to_string(),
            to: to.to_string(),
        }),
    )
}
