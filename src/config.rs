// Store configuration.
//
// Responsibilities
// - Bound the transactional retry loop and the time an operation may block.
// - Read overrides from the environment; anything unset keeps its default.
//
// Environment
// - EVENT_STORE_MAX_COMMIT_ATTEMPTS: attempts per append when the watched key changes (default 5).
// - EVENT_STORE_RETRY_BACKOFF_MS: first retry delay, doubled per attempt, capped at 200 ms (default 10).
// - EVENT_STORE_OPERATION_TIMEOUT_MS: timeout for operations whose context has no deadline (default none).
// - EVENT_STORE_REDIS_URL: connection url for the redis backend.

use serde::Deserialize;
use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;

pub const MAX_RETRY_BACKOFF_MS: u64 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    InvalidValue {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_commit_attempts: u32,
    pub retry_backoff_ms: u64,
    pub operation_timeout_ms: Option<u64>,
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 5,
            retry_backoff_ms: 10,
            operation_timeout_ms: None,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(attempts) = parse(&lookup, "EVENT_STORE_MAX_COMMIT_ATTEMPTS")? {
            if attempts == 0 {
                return Err(ConfigError::Zero("EVENT_STORE_MAX_COMMIT_ATTEMPTS"));
            }
            config.max_commit_attempts = attempts;
        }
        if let Some(backoff) = parse(&lookup, "EVENT_STORE_RETRY_BACKOFF_MS")? {
            config.retry_backoff_ms = backoff;
        }
        if let Some(timeout) = parse(&lookup, "EVENT_STORE_OPERATION_TIMEOUT_MS")? {
            config.operation_timeout_ms = Some(timeout);
        }
        if let Some(url) = lookup("EVENT_STORE_REDIS_URL") {
            config.redis_url = url;
        }
        Ok(config)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Delay before retry number `attempt` (1-based) of an aborted transaction.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS))
    }
}

fn parse<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            let parsed = value.trim().parse();
            parsed.map_err(|source| ConfigError::InvalidValue { name, value, source })
        })
        .transpose()
}

#[cfg(test)]
mod store_config_tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[rstest]
    fn it_should_keep_defaults_when_nothing_is_set() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.operation_timeout(), None);
    }

    #[rstest]
    fn it_should_read_overrides() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("EVENT_STORE_MAX_COMMIT_ATTEMPTS", "3"),
            ("EVENT_STORE_RETRY_BACKOFF_MS", " 25 "),
            ("EVENT_STORE_OPERATION_TIMEOUT_MS", "1500"),
            ("EVENT_STORE_REDIS_URL", "redis://cache:6380"),
        ]))
        .unwrap();
        assert_eq!(config.max_commit_attempts, 3);
        assert_eq!(config.retry_backoff_ms, 25);
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.redis_url, "redis://cache:6380");
    }

    #[rstest]
    fn it_should_reject_unparsable_values() {
        let result = StoreConfig::from_lookup(lookup_from(&[("EVENT_STORE_RETRY_BACKOFF_MS", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "EVENT_STORE_RETRY_BACKOFF_MS", .. })
        ));
    }

    #[rstest]
    fn it_should_reject_zero_commit_attempts() {
        let result = StoreConfig::from_lookup(lookup_from(&[("EVENT_STORE_MAX_COMMIT_ATTEMPTS", "0")]));
        assert!(matches!(result, Err(ConfigError::Zero(_))));
    }

    #[rstest]
    #[case(1, 10)]
    #[case(2, 20)]
    #[case(3, 40)]
    #[case(6, 200)]
    #[case(60, 200)]
    fn it_should_double_the_retry_delay_up_to_the_cap(#[case] attempt: u32, #[case] expected_ms: u64) {
        let config = StoreConfig::default();
        assert_eq!(config.retry_delay(attempt), Duration::from_millis(expected_ms));
    }

    #[rstest]
    fn it_should_deserialize_partial_config() {
        let config: StoreConfig = serde_json::from_str(r#"{"max_commit_attempts": 2}"#).unwrap();
        assert_eq!(config.max_commit_attempts, 2);
        assert_eq!(config.retry_backoff_ms, 10);
    }
}
