// Namespace key scheme.
//
// Purpose
// - Map (namespace, aggregate id) to the storage key holding that aggregate's records.
// - Map a namespace to the key pattern used to discover all of its keys.
//
// Layout
// - Aggregate key: "<namespace>:<aggregate_id>".
// - Each aggregate key is a hash whose fields are stringified versions.
// - Namespace pattern: "<namespace>:*" with glob metacharacters in the namespace escaped.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const KEY_SEPARATOR: char = ':';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("namespace must not be empty")]
    Empty,

    #[error("namespace {0:?} must not contain the key separator ':'")]
    ContainsSeparator(String),
}

/// Tenant isolation scope. Every storage key starts with it.
///
/// A namespace may not contain the key separator, otherwise the pattern of
/// namespace `a` would also match the keys of namespace `a:b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(value: impl Into<String>) -> Result<Self, NamespaceError> {
        let value = value.into();
        if value.is_empty() {
            return Err(NamespaceError::Empty);
        }
        if value.contains(KEY_SEPARATOR) {
            return Err(NamespaceError::ContainsSeparator(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_string())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn aggregate_key(namespace: &Namespace, aggregate_id: &Uuid) -> String {
    format!("{namespace}{KEY_SEPARATOR}{aggregate_id}")
}

pub fn namespace_pattern(namespace: &Namespace) -> String {
    format!("{}{KEY_SEPARATOR}*", escape_glob(namespace.as_str()))
}

pub fn version_field(version: u64) -> String {
    version.to_string()
}

pub fn parse_version_field(field: &str) -> Option<u64> {
    field.parse().ok().filter(|version| *version > 0)
}

fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
