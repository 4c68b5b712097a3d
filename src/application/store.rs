// Event store over a key-value backend.
//
// Purpose
// - Implement the EventStore port on top of any KeyValueBackend.
//
// Responsibilities
// - Check the backend is reachable when opening.
// - Run append, load and clear under the caller's context (namespace, cancellation, deadline).
// - Refuse every operation once closed. Closing twice is a no-op.

use crate::application::append::AppendEngine;
use crate::application::load::LoadEngine;
use crate::application::purge::purge_namespace;
use crate::config::StoreConfig;
use crate::core::context::Context;
use crate::core::errors::EventStoreError;
use crate::core::event::{Event, RecordedEvent};
use crate::core::ids::{IdGenerator, UuidV7Generator};
use crate::core::keys::aggregate_key;
use crate::core::ports::{EventStore, KeyValueBackend};
use crate::encoding::encoder::Encoder;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

pub struct KeyValueEventStore<P, B>
where
    B: KeyValueBackend + 'static,
{
    backend: Arc<B>,
    append: AppendEngine<P>,
    load: LoadEngine<P>,
    config: StoreConfig,
    closed: AtomicBool,
}

impl<P, B> KeyValueEventStore<P, B>
where
    P: Send + Sync + 'static,
    B: KeyValueBackend + 'static,
{
    pub async fn open(
        backend: Arc<B>,
        encoder: Arc<dyn Encoder<P>>,
        config: StoreConfig,
    ) -> Result<Self, EventStoreError> {
        Self::open_with_ids(backend, encoder, Arc::new(UuidV7Generator), config).await
    }

    pub async fn open_with_ids(
        backend: Arc<B>,
        encoder: Arc<dyn Encoder<P>>,
        ids: Arc<dyn IdGenerator>,
        config: StoreConfig,
    ) -> Result<Self, EventStoreError> {
        backend.ping().await.map_err(EventStoreError::Connection)?;
        info!(
            max_commit_attempts = config.max_commit_attempts,
            operation_timeout_ms = ?config.operation_timeout_ms,
            "event store opened"
        );
        Ok(Self {
            backend,
            append: AppendEngine::new(encoder.clone(), ids, config.clone()),
            load: LoadEngine::new(encoder),
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<(), EventStoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EventStoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl<P, B> EventStore<P> for KeyValueEventStore<P, B>
where
    P: Send + Sync + 'static,
    B: KeyValueBackend + 'static,
{
    async fn append<E>(&self, ctx: &Context, events: &[E], original_version: u64) -> Result<(), EventStoreError>
    where
        E: Event<Data = P>,
    {
        self.ensure_open()?;
        let namespace = ctx.namespace();
        let batch = self.append.prepare(namespace, events, original_version)?;
        let key = aggregate_key(namespace, &batch.aggregate_id);
        debug!(key = %key, events = batch.records.len(), original_version, "appending events");
        ctx.guard(
            self.config.operation_timeout(),
            self.append.commit(&*self.backend, &key, &batch),
        )
        .await
    }

    async fn load(&self, ctx: &Context, aggregate_id: Uuid) -> Result<Vec<RecordedEvent<P>>, EventStoreError> {
        self.ensure_open()?;
        ctx.guard(
            self.config.operation_timeout(),
            self.load.load(&*self.backend, ctx.namespace(), aggregate_id),
        )
        .await
    }

    async fn clear(&self, ctx: &Context) -> Result<(), EventStoreError> {
        self.ensure_open()?;
        let namespace = ctx.namespace();
        let removed = ctx
            .guard(
                self.config.operation_timeout(),
                purge_namespace(&*self.backend, namespace),
            )
            .await?;
        info!(%namespace, removed, "namespace cleared");
        Ok(())
    }

    async fn close(&self) -> Result<(), EventStoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.backend.close().await.map_err(EventStoreError::Close)?;
        info!("event store closed");
        Ok(())
    }
}
