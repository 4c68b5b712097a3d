// Integration tests of the event store against a live redis server.
//
// Responsibilities
// - Exercise the WATCH / MULTI / EXEC path, HSETNX writes and SCAN based purges for real.
//
// Running
// - Needs the `redis` feature and a server at EVENT_STORE_REDIS_URL (a .env file is honoured).
// - Ignored by default: cargo test --features redis -- --ignored integration
#![cfg(feature = "redis")]

mod fixtures;

use fixtures::{ItemEvent, created, init_tracing, item_encoder, renamed};
use kv_event_store::adapters::redis::redis_backend::RedisBackend;
use kv_event_store::application::store::KeyValueEventStore;
use kv_event_store::config::StoreConfig;
use kv_event_store::core::context::Context;
use kv_event_store::core::errors::{BackendError, EventStoreError};
use kv_event_store::core::event::Event;
use kv_event_store::core::ports::{EventStore, KeyValueBackend};
use rstest::{fixture, rstest};
use std::sync::Arc;
use tokio::join;
use uuid::Uuid;

type Store = KeyValueEventStore<ItemEvent, RedisBackend>;

#[fixture]
async fn store() -> (Store, Context) {
    init_tracing();
    let _ = dotenvy::dotenv();
    let config = StoreConfig::from_env().expect("invalid environment");
    let backend = RedisBackend::from_config(&config).await.expect("redis unreachable");
    let store = KeyValueEventStore::open(Arc::new(backend), item_encoder(), config)
        .await
        .expect("open failed");
    // Every test gets a namespace of its own so runs never see each other.
    let ctx = Context::for_namespace(&format!("it-{}", Uuid::now_v7())).unwrap();
    (store, ctx)
}

#[rstest]
#[ignore = "integration: needs a redis server"]
#[tokio::test]
async fn integration_it_should_append_and_load(#[future] store: (Store, Context)) {
    let (store, ctx) = store.await;
    let id = Uuid::now_v7();
    store
        .append(&ctx, &[created(id, 1, "a"), renamed(id, 2, "a", "b")], 0)
        .await
        .unwrap();

    let stream = store.load_stream(&ctx, id).await.unwrap();
    assert_eq!(stream.version, 2);
    assert_eq!(stream.events[0].event_type(), "Created");

    store.clear(&ctx).await.unwrap();
}

#[rstest]
#[ignore = "integration: needs a redis server"]
#[tokio::test]
async fn integration_it_should_reject_an_existing_version(#[future] store: (Store, Context)) {
    let (store, ctx) = store.await;
    let id = Uuid::now_v7();
    store.append(&ctx, &[created(id, 1, "a")], 0).await.unwrap();

    let result = store.append(&ctx, &[created(id, 1, "b")], 0).await;

    assert!(result.unwrap_err().is_version_conflict());
    store.clear(&ctx).await.unwrap();
}

#[rstest]
#[ignore = "integration: needs a redis server"]
#[tokio::test]
async fn integration_it_should_let_one_racing_writer_win(#[future] store: (Store, Context)) {
    let (store, ctx) = store.await;
    let id = Uuid::now_v7();
    let left = [created(id, 1, "left")];
    let right = [created(id, 1, "right")];

    let (left, right) = join!(store.append(&ctx, &left, 0), store.append(&ctx, &right, 0));

    assert!(left.is_ok() ^ right.is_ok());
    assert_eq!(store.load(&ctx, id).await.unwrap().len(), 1);
    store.clear(&ctx).await.unwrap();
}

#[rstest]
#[ignore = "integration: needs a redis server"]
#[tokio::test]
async fn integration_it_should_clear_only_its_namespace(#[future] store: (Store, Context)) {
    let (store, ctx) = store.await;
    let neighbour = Context::for_namespace(&format!("it-{}", Uuid::now_v7())).unwrap();
    let id = Uuid::now_v7();
    store.append(&ctx, &[created(id, 1, "mine")], 0).await.unwrap();
    store.append(&neighbour, &[created(id, 1, "theirs")], 0).await.unwrap();

    store.clear(&ctx).await.unwrap();

    assert!(store.load(&ctx, id).await.unwrap().is_empty());
    assert_eq!(store.load(&neighbour, id).await.unwrap().len(), 1);
    store.clear(&neighbour).await.unwrap();
    assert!(store.backend().scan(&format!("{}:*", ctx.namespace())).await.unwrap().is_empty());
}

#[rstest]
#[ignore = "integration: needs a redis server"]
#[tokio::test]
async fn integration_it_should_release_the_connection_on_close(#[future] store: (Store, Context)) {
    let (store, ctx) = store.await;
    store.close().await.unwrap();

    assert!(matches!(store.backend().ping().await, Err(BackendError::Closed)));
    assert!(matches!(store.backend().watch(&[]).await, Err(BackendError::Closed)));
    assert!(matches!(store.load(&ctx, Uuid::now_v7()).await, Err(EventStoreError::Closed)));
    store.backend().close().await.unwrap();
}
