// In memory implementation of the KeyValueBackend port.
//
// Purpose
// - Support store tests and local development without a key-value server.
//
// Responsibilities
// - Store one hash of fields per key.
// - Track a revision per key so transactions can tell whether a watched key changed.
//   Revisions survive deletion, so delete-then-recreate is still seen as a change.
// - Apply a transaction's staged writes under one write lock, or not at all.
//
// Testing knobs
// - toggle_offline makes every call fail as if the server were unreachable.
// - set_commit_delay_ms holds commits back so concurrent transactions interleave.

use crate::core::errors::BackendError;
use crate::adapters::in_memory::glob::glob_matches;
use crate::core::ports::{BackendTransaction, CommitOutcome, KeyValueBackend, StagedWrite};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
    revisions: HashMap<String, u64>,
    clock: u64,
}

impl Inner {
    fn revision(&self, key: &str) -> u64 {
        self.revisions.get(key).copied().unwrap_or(0)
    }

    fn touch(&mut self, key: &str) {
        self.clock += 1;
        self.revisions.insert(key.to_string(), self.clock);
    }
}

#[derive(Debug, Default)]
struct Switches {
    offline: AtomicBool,
    closed: AtomicBool,
    commit_delay_ms: AtomicU64,
}

impl Switches {
    fn check(&self) -> Result<(), BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("in memory backend offline".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    inner: Arc<RwLock<Inner>>,
    switches: Arc<Switches>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&self) {
        self.switches.offline.fetch_xor(true, Ordering::SeqCst);
    }

    pub fn set_commit_delay_ms(&self, delay_ms: u64) {
        self.switches.commit_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.read().await.hashes.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        self.switches.check()
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, BackendError> {
        self.switches.check()?;
        let guard = self.inner.read().await;
        Ok(guard.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        self.switches.check()?;
        let guard = self.inner.read().await;
        let mut keys: Vec<String> = guard
            .hashes
            .keys()
            .filter(|key| glob_matches(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn watch(&self, keys: &[String]) -> Result<Box<dyn BackendTransaction>, BackendError> {
        self.switches.check()?;
        let guard = self.inner.read().await;
        let watched = keys
            .iter()
            .map(|key| (key.clone(), guard.revision(key)))
            .collect();
        Ok(Box::new(InMemoryTransaction {
            inner: self.inner.clone(),
            switches: self.switches.clone(),
            watched,
            staged: Vec::new(),
        }))
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.switches.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct InMemoryTransaction {
    inner: Arc<RwLock<Inner>>,
    switches: Arc<Switches>,
    watched: Vec<(String, u64)>,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl BackendTransaction for InMemoryTransaction {
    async fn existing_fields(&mut self, key: &str, fields: &[String]) -> Result<Vec<String>, BackendError> {
        self.switches.check()?;
        let guard = self.inner.read().await;
        let Some(hash) = guard.hashes.get(key) else {
            return Ok(Vec::new());
        };
        Ok(fields
            .iter()
            .filter(|field| hash.contains_key(field.as_str()))
            .cloned()
            .collect())
    }

    fn stage(&mut self, write: StagedWrite) {
        self.staged.push(write);
    }

    async fn commit(self: Box<Self>) -> Result<CommitOutcome, BackendError> {
        let InMemoryTransaction {
            inner,
            switches,
            watched,
            staged,
        } = *self;
        let delay_ms = switches.commit_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        switches.check()?;

        let mut guard = inner.write().await;
        if watched
            .iter()
            .any(|(key, revision)| guard.revision(key) != *revision)
        {
            return Ok(CommitOutcome::Aborted);
        }

        for write in staged {
            match write {
                StagedWrite::HashSetIfAbsent { key, field, value } => {
                    let hash = guard.hashes.entry(key.clone()).or_default();
                    if !hash.contains_key(&field) {
                        hash.insert(field, value);
                        guard.touch(&key);
                    }
                }
                StagedWrite::Delete { key } => {
                    if guard.hashes.remove(&key).is_some() {
                        guard.touch(&key);
                    }
                }
            }
        }
        Ok(CommitOutcome::Committed)
    }

    async fn discard(self: Box<Self>) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod in_memory_backend_tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
    }

    fn set(key: &str, field: &str, value: &str) -> StagedWrite {
        StagedWrite::HashSetIfAbsent {
            key: key.to_string(),
            field: field.to_string(),
            value: value.as_bytes().to_vec(),
        }
    }

    async fn write(backend: &InMemoryBackend, key: &str, field: &str, value: &str) {
        let mut tx = backend.watch(&[key.to_string()]).await.unwrap();
        tx.stage(set(key, field, value));
        assert_eq!(tx.commit().await.unwrap(), CommitOutcome::Committed);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_commit_staged_writes(backend: InMemoryBackend) {
        write(&backend, "ns:a", "1", "one").await;
        let fields = backend.hash_get_all("ns:a").await.unwrap();
        assert_eq!(fields.get("1"), Some(&b"one".to_vec()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_return_an_empty_hash_for_a_missing_key(backend: InMemoryBackend) {
        assert!(backend.hash_get_all("ns:missing").await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_never_overwrite_an_existing_field(backend: InMemoryBackend) {
        write(&backend, "ns:a", "1", "one").await;
        write(&backend, "ns:a", "1", "uno").await;
        let fields = backend.hash_get_all("ns:a").await.unwrap();
        assert_eq!(fields.get("1"), Some(&b"one".to_vec()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_abort_when_a_watched_key_changed(backend: InMemoryBackend) {
        let key = "ns:a".to_string();
        let mut slow = backend.watch(&[key.clone()]).await.unwrap();
        write(&backend, "ns:a", "1", "fast").await;
        slow.stage(set("ns:a", "2", "slow"));
        assert_eq!(slow.commit().await.unwrap(), CommitOutcome::Aborted);
        let fields = backend.hash_get_all("ns:a").await.unwrap();
        assert_eq!(fields.len(), 1);
        assert!(!fields.contains_key("2"));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_detect_delete_then_recreate(backend: InMemoryBackend) {
        write(&backend, "ns:a", "1", "one").await;
        let mut slow = backend.watch(&["ns:a".to_string()]).await.unwrap();

        let mut delete = backend.watch(&[]).await.unwrap();
        delete.stage(StagedWrite::Delete { key: "ns:a".to_string() });
        delete.commit().await.unwrap();
        write(&backend, "ns:a", "1", "again").await;

        slow.stage(set("ns:a", "2", "two"));
        assert_eq!(slow.commit().await.unwrap(), CommitOutcome::Aborted);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_existing_fields(backend: InMemoryBackend) {
        write(&backend, "ns:a", "1", "one").await;
        let mut tx = backend.watch(&["ns:a".to_string()]).await.unwrap();
        let existing = tx
            .existing_fields("ns:a", &["1".to_string(), "2".to_string()])
            .await
            .unwrap();
        assert_eq!(existing, vec!["1".to_string()]);
        tx.discard().await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_scan_keys_matching_a_pattern(backend: InMemoryBackend) {
        write(&backend, "ns1:b", "1", "x").await;
        write(&backend, "ns1:a", "1", "x").await;
        write(&backend, "ns2:a", "1", "x").await;
        assert_eq!(
            backend.scan("ns1:*").await.unwrap(),
            vec!["ns1:a".to_string(), "ns1:b".to_string()]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_every_call_while_offline(backend: InMemoryBackend) {
        backend.toggle_offline();
        assert!(matches!(backend.ping().await, Err(BackendError::Unavailable(_))));
        assert!(backend.hash_get_all("ns:a").await.is_err());
        backend.toggle_offline();
        assert!(backend.ping().await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_calls_after_close(backend: InMemoryBackend) {
        backend.close().await.unwrap();
        assert!(matches!(backend.ping().await, Err(BackendError::Closed)));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_delete_keys(backend: InMemoryBackend) {
        write(&backend, "ns:a", "1", "one").await;
        let mut tx = backend.watch(&["ns:a".to_string()]).await.unwrap();
        tx.stage(StagedWrite::Delete { key: "ns:a".to_string() });
        assert_eq!(tx.commit().await.unwrap(), CommitOutcome::Committed);
        assert!(backend.keys().await.is_empty());
    }
}
