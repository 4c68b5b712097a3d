// Redis implementation of the KeyValueBackend port.
//
// Responsibilities
// - One hash per aggregate key: HGETALL to load, HMGET to check version fields, HSETNX to write them.
// - Transactions map onto WATCH / MULTI / EXEC. A nil EXEC reply means a watched key changed.
// - Key discovery for namespace purge walks SCAN with a MATCH pattern.
//
// Connections
// - Plain reads share one multiplexed connection.
// - Every transaction gets its own connection, because WATCH state belongs to the connection.
// - close drops the shared connection; later calls fail with Closed.

use crate::config::StoreConfig;
use crate::core::errors::BackendError;
use crate::core::ports::{BackendTransaction, CommitOutcome, KeyValueBackend, StagedWrite};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const SCAN_COUNT: usize = 500;

pub struct RedisBackend {
    client: redis::Client,
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        debug!(url, "redis connection established");
        Ok(Self {
            client,
            connection: RwLock::new(Some(connection)),
        })
    }

    pub async fn from_config(config: &StoreConfig) -> Result<Self, BackendError> {
        Self::connect(&config.redis_url).await
    }

    async fn shared(&self) -> Result<MultiplexedConnection, BackendError> {
        self.connection.read().await.clone().ok_or(BackendError::Closed)
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.shared().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(BackendError::Backend(format!("unexpected ping reply {reply:?}")));
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, BackendError> {
        let mut conn = self.shared().await?;
        let fields: HashMap<String, Vec<u8>> = redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(fields)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let mut conn = self.shared().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn watch(&self, keys: &[String]) -> Result<Box<dyn BackendTransaction>, BackendError> {
        self.shared().await?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        if !keys.is_empty() {
            let mut watch = redis::cmd("WATCH");
            for key in keys {
                watch.arg(key.as_str());
            }
            let _: () = watch.query_async(&mut conn).await?;
        }
        Ok(Box::new(RedisTransaction {
            conn,
            staged: Vec::new(),
        }))
    }

    async fn close(&self) -> Result<(), BackendError> {
        if self.connection.write().await.take().is_some() {
            debug!("redis connection released");
        }
        Ok(())
    }
}

struct RedisTransaction {
    conn: MultiplexedConnection,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl BackendTransaction for RedisTransaction {
    async fn existing_fields(&mut self, key: &str, fields: &[String]) -> Result<Vec<String>, BackendError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut hmget = redis::cmd("HMGET");
        hmget.arg(key);
        for field in fields {
            hmget.arg(field.as_str());
        }
        let values: Vec<Option<Vec<u8>>> = hmget.query_async(&mut self.conn).await?;
        Ok(fields
            .iter()
            .zip(values)
            .filter(|(_, value)| value.is_some())
            .map(|(field, _)| field.clone())
            .collect())
    }

    fn stage(&mut self, write: StagedWrite) {
        self.staged.push(write);
    }

    async fn commit(self: Box<Self>) -> Result<CommitOutcome, BackendError> {
        let RedisTransaction { mut conn, staged } = *self;
        if staged.is_empty() {
            let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
            return Ok(CommitOutcome::Committed);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for write in &staged {
            match write {
                StagedWrite::HashSetIfAbsent { key, field, value } => {
                    pipe.cmd("HSETNX").arg(key.as_str()).arg(field.as_str()).arg(value.as_slice());
                }
                StagedWrite::Delete { key } => {
                    pipe.cmd("DEL").arg(key.as_str());
                }
            }
        }
        let replies: Option<Vec<i64>> = pipe.query_async(&mut conn).await?;
        Ok(commit_outcome(&staged, replies))
    }

    async fn discard(self: Box<Self>) -> Result<(), BackendError> {
        let mut conn = self.conn;
        let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Outcome of an EXEC. A nil reply means a watched key changed. An HSETNX that
/// found its field already set is reported the same way, so the caller re-checks
/// the versions instead of assuming its write landed.
fn commit_outcome(staged: &[StagedWrite], replies: Option<Vec<i64>>) -> CommitOutcome {
    let Some(replies) = replies else {
        return CommitOutcome::Aborted;
    };
    let skipped: Vec<&str> = staged
        .iter()
        .zip(&replies)
        .filter_map(|(write, reply)| match write {
            StagedWrite::HashSetIfAbsent { field, .. } if *reply != 1 => Some(field.as_str()),
            _ => None,
        })
        .collect();
    if skipped.is_empty() && replies.len() == staged.len() {
        return CommitOutcome::Committed;
    }
    warn!(?skipped, "transaction committed but some fields already existed");
    CommitOutcome::Aborted
}
