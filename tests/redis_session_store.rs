//! Integration tests for the Redis session store.
//!
//! These tests require a running Redis instance.
//! Run with: cargo test --test redis_session_store -- --ignored

use redis::AsyncCommands;
use sessionkeeper::application_port::AuthError;
use sessionkeeper::domain_port::*;
use sessionkeeper::infra_redis::RedisSessionStore;
use std::time::Duration;

fn client() -> redis::Client {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    redis::Client::open(url).unwrap()
}

/// Returns the store and the key prefix it writes under.
async fn store_with_prefix(prefix: &str) -> (RedisSessionStore, String) {
    let client = client();
    let conn = client.get_connection_manager().await.unwrap();
    let prefix = format!("test:{}:{}", prefix, uuid::Uuid::new_v4());
    let store = RedisSessionStore::new(
        client,
        conn,
        prefix.clone(),
        RedisSessionStore::DEFAULT_CALL_TIMEOUT,
    );
    (store, prefix)
}

async fn store(prefix: &str) -> RedisSessionStore {
    store_with_prefix(prefix).await.0
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn pair_write_count_and_delete() {
    let store = store("pair").await;
    let ttl = Duration::from_secs(60);

    store
        .set_pair_with_expiry("a:7:one", ttl, "r:7:one", ttl)
        .await
        .unwrap();
    store
        .set_pair_with_expiry("a:7:two", ttl, "r:7:two", ttl)
        .await
        .unwrap();

    assert!(store.exists("a:7:one").await.unwrap());
    assert!(store.exists("r:7:two").await.unwrap());
    assert_eq!(store.count_by_prefix("r:7:*").await.unwrap(), 2);
    assert_eq!(store.count_by_prefix("r:70:*").await.unwrap(), 0);

    store
        .delete(&["a:7:one".to_string(), "r:7:one".to_string()])
        .await
        .unwrap();
    // already gone
    store
        .delete(&["a:7:one".to_string(), "r:7:one".to_string()])
        .await
        .unwrap();

    assert!(!store.exists("a:7:one").await.unwrap());
    assert_eq!(store.count_by_prefix("r:7:*").await.unwrap(), 1);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn keys_expire_with_their_own_ttl() {
    let store = store("ttl").await;

    store
        .set_pair_with_expiry(
            "a:1:s",
            Duration::from_secs(1),
            "r:1:s",
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!store.exists("a:1:s").await.unwrap());
    assert!(store.exists("r:1:s").await.unwrap());
    assert_eq!(store.count_by_prefix("r:1:*").await.unwrap(), 1);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn unreachable_server_surfaces_as_error() {
    let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
    let conn = client.get_connection_manager().await.unwrap();
    let dead = redis::Client::open("redis://127.0.0.1:1").unwrap();
    let store = RedisSessionStore::new(dead, conn, "test:dead", Duration::from_millis(200));

    let ttl = Duration::from_secs(60);
    let err = store
        .set_pair_with_expiry("a:1:s", ttl, "r:1:s", ttl)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionStoreError::Store(_) | SessionStoreError::Timeout(_)
    ));
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn concurrent_write_aborts_pair_write() {
    let (store, prefix) = store_with_prefix("watch").await;
    let ttl = Duration::from_secs(60);

    let pending = store.watch_pair("a:4:s", "r:4:s").await.unwrap();

    let mut other = client().get_multiplexed_async_connection().await.unwrap();
    let _: () = other
        .set_ex(format!("{}:r:4:s", prefix), "other", 60)
        .await
        .unwrap();

    let err = pending.commit(ttl, ttl).await.unwrap_err();
    assert!(matches!(err, SessionStoreError::Conflict(_)));
    // the aborted transaction wrote neither key
    assert!(!store.exists("a:4:s").await.unwrap());

    let err = AuthError::from(err);
    assert!(matches!(err, AuthError::Store(_)));
    assert!(err.is_internal());

    // a fresh attempt goes through
    store
        .set_pair_with_expiry("a:4:s", ttl, "r:4:s", ttl)
        .await
        .unwrap();
    assert!(store.exists("a:4:s").await.unwrap());
}
