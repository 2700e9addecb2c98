//! KV-contract conformance tests for the in-memory reference store.

use std::time::Duration;

use kvlimit::{KvStore, MemoryStore, RatelimitError, StoreError, SweepConfig};

#[tokio::test]
async fn test_px_key_expires() {
    let store = MemoryStore::new();

    store
        .set("k", "v", Some(Duration::from_millis(40)))
        .await
        .unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_reset_with_new_px_replaces_deadline() {
    let store = MemoryStore::new();

    store
        .set("k", "v1", Some(Duration::from_millis(30)))
        .await
        .unwrap();
    store
        .set("k", "v2", Some(Duration::from_millis(300)))
        .await
        .unwrap();

    // Past the old deadline, inside the new one.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_incrby_absent_starts_at_zero() {
    let store = MemoryStore::new();

    assert_eq!(store.incrby("counter", 3).await.unwrap(), 3);
    assert_eq!(store.incr("counter").await.unwrap(), 4);
}

#[tokio::test]
async fn test_incrby_non_numeric_value_errors() {
    let store = MemoryStore::new();

    store.set("garbled", "{}", None).await.unwrap();
    let err = store.incr("garbled").await.unwrap_err();
    assert!(matches!(
        err,
        RatelimitError::Store(StoreError::NonNumericValue { .. })
    ));
}

#[tokio::test]
async fn test_hmset_merges_and_hmget_pads() {
    let store = MemoryStore::new();

    store
        .hmset(
            "record",
            &[("tokens", "9".to_string()), ("lastRefill", "123".to_string())],
        )
        .await
        .unwrap();
    store
        .hmset("record", &[("tokens", "8".to_string())])
        .await
        .unwrap();

    let values = store
        .hmget("record", &["tokens", "lastRefill", "nope"])
        .await
        .unwrap();
    assert_eq!(values, vec!["8", "123", ""]);
}

#[tokio::test]
async fn test_pexpire_contract() {
    let store = MemoryStore::new();

    assert!(!store.pexpire("absent", Duration::from_secs(1)).await.unwrap());

    store.set("k", "v", None).await.unwrap();
    assert!(store.pexpire("k", Duration::from_millis(30)).await.unwrap());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_del_count_matches_arguments() {
    let store = MemoryStore::new();

    store.set("a", "1", None).await.unwrap();
    store.set("b", "2", None).await.unwrap();

    assert_eq!(store.del(&["a", "b", "c"]).await.unwrap(), 3);
    assert_eq!(store.get("a").await.unwrap(), None);
    assert_eq!(store.get("b").await.unwrap(), None);
}

#[tokio::test]
async fn test_clear_is_bulk_teardown() {
    let store = MemoryStore::with_sweep(SweepConfig::manual());

    store.set("a", "1", Some(Duration::from_secs(60))).await.unwrap();
    store.incr("b").await.unwrap();
    assert_eq!(store.len(), 2);

    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.get("a").await.unwrap(), None);
}

#[tokio::test]
async fn test_background_sweep_reclaims_keys() {
    let store = MemoryStore::with_sweep(SweepConfig::on_duration(Duration::from_millis(25)));

    store
        .set("short", "v", Some(Duration::from_millis(10)))
        .await
        .unwrap();
    store.set("kept", "v", None).await.unwrap();

    // The expired key is reclaimed without ever being touched again.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("kept").await.unwrap().as_deref(), Some("v"));
}
