//! In-memory reference store with TTL sweeping.
//!
//! This backend uses `DashMap` for thread-safe concurrent access. Expiry is
//! a scoped-TTL contract rather than per-key timers: an expired key is
//! dropped lazily the next time it is touched, and a configurable sweep
//! reclaims keys that are never touched again.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, StoreError};
use crate::store::{KvStore, current_timestamp_ms};

/// Sweep interval configuration.
#[derive(Debug, Clone)]
pub enum SweepInterval {
    /// Sweep every N store operations.
    Requests(u64),
    /// Sweep at fixed time intervals on a background task.
    Duration(Duration),
    /// Sweep only when [`MemoryStore::sweep`] is called.
    Manual,
}

impl Default for SweepInterval {
    fn default() -> Self {
        Self::Requests(10000)
    }
}

/// Sweep configuration for expired-key reclamation.
#[derive(Debug, Clone, Default)]
pub struct SweepConfig {
    /// When to reclaim expired keys.
    pub interval: SweepInterval,
}

impl SweepConfig {
    /// Create config with operation-count-based sweeping.
    pub fn on_requests(count: u64) -> Self {
        Self {
            interval: SweepInterval::Requests(count),
        }
    }

    /// Create config with time-based sweeping.
    pub fn on_duration(interval: Duration) -> Self {
        Self {
            interval: SweepInterval::Duration(interval),
        }
    }

    /// Create config with manual sweeping only.
    pub fn manual() -> Self {
        Self {
            interval: SweepInterval::Manual,
        }
    }
}

/// One stored value with its optional expiry deadline.
#[derive(Debug, Clone)]
struct Slot {
    value: String,
    /// Epoch-ms deadline; `None` means the key never expires.
    deadline: Option<u64>,
}

impl Slot {
    fn is_live(&self, now: u64) -> bool {
        self.deadline.is_none_or(|d| d > now)
    }
}

/// In-memory reference implementation of the [`KvStore`] contract.
///
/// Hash-typed values are serialized as JSON string-keyed documents before
/// storage, so the whole keyspace is a flat string-to-string map. Intended
/// for tests and non-shared deployments; a shared backend replaces it
/// without algorithm changes.
///
/// # TTL semantics
///
/// `set` with `px` and `pexpire` always replace any prior deadline
/// (re-arming never stacks). `set` *without* `px` preserves a previously
/// armed deadline, matching the reference behavior the algorithms were
/// written against; backends that clear TTL on plain overwrite also satisfy
/// the algorithms, which never plain-`set` a key whose TTL they rely on.
///
/// # Example
///
/// ```ignore
/// use kvlimit::store::{MemoryStore, SweepConfig};
/// use std::time::Duration;
///
/// // Default sweep (every 10000 operations)
/// let store = MemoryStore::new();
///
/// // Background sweep task
/// let store = MemoryStore::with_sweep(SweepConfig::on_duration(Duration::from_secs(60)));
///
/// // Manual sweep only
/// let store = MemoryStore::with_sweep(SweepConfig::manual());
/// store.sweep();
/// ```
pub struct MemoryStore {
    data: Arc<DashMap<String, Slot>>,
    sweep_config: SweepConfig,
    op_count: AtomicU64,
    sweep_lock: Mutex<()>,
    shutdown: Arc<Notify>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.data.len())
            .field("sweep_config", &self.sweep_config)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new memory store with the default sweep configuration.
    pub fn new() -> Self {
        Self::with_sweep(SweepConfig::default())
    }

    /// Create a new memory store with a custom sweep configuration.
    pub fn with_sweep(sweep_config: SweepConfig) -> Self {
        let store = Self {
            data: Arc::new(DashMap::new()),
            sweep_config: sweep_config.clone(),
            op_count: AtomicU64::new(0),
            sweep_lock: Mutex::new(()),
            shutdown: Arc::new(Notify::new()),
        };

        if let SweepInterval::Duration(interval) = sweep_config.interval {
            store.start_sweep_task(interval);
        }

        store
    }

    /// Start the background sweep task.
    fn start_sweep_task(&self, interval: Duration) {
        let data = self.data.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        sweep_map(&data);
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });
    }

    /// Manually reclaim all expired keys.
    pub fn sweep(&self) {
        sweep_map(&self.data);
    }

    /// Number of keys currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop every key and pending deadline.
    ///
    /// The single bulk-teardown path; call between test runs or before
    /// process shutdown.
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Run a sweep if the operation counter crossed the threshold.
    fn maybe_sweep(&self) {
        if let SweepInterval::Requests(threshold) = self.sweep_config.interval {
            let count = self.op_count.fetch_add(1, Ordering::Relaxed);
            if count % threshold == 0 && count > 0 {
                // Non-blocking: a concurrent sweep already covers this pass.
                if let Some(_guard) = self.sweep_lock.try_lock() {
                    sweep_map(&self.data);
                }
            }
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

/// Remove every expired slot from the keyspace.
fn sweep_map(data: &DashMap<String, Slot>) {
    let now = current_timestamp_ms();
    let before = data.len();
    data.retain(|_, slot| slot.is_live(now));
    let removed = before - data.len();
    if removed > 0 {
        tracing::debug!(removed, "swept expired keys");
    }
}

/// Decode a hash record from its stored JSON form.
fn decode_hash(key: &str, raw: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(raw).map_err(|e| {
        StoreError::Serialization(format!("hash record at {key:?}: {e}")).into()
    })
}

/// Encode a hash record into its stored JSON form.
fn encode_hash(key: &str, map: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string(map).map_err(|e| {
        StoreError::Serialization(format!("hash record at {key:?}: {e}")).into()
    })
}

impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.maybe_sweep();

        let now = current_timestamp_ms();
        if let Some(slot) = self.data.get(key) {
            if slot.is_live(now) {
                return Ok(Some(slot.value.clone()));
            }
            drop(slot);
            self.data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, px: Option<Duration>) -> Result<()> {
        self.maybe_sweep();

        let now = current_timestamp_ms();
        let px_deadline = px.map(|ttl| now + ttl.as_millis() as u64);

        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                let deadline = if px_deadline.is_some() {
                    px_deadline
                } else if slot.is_live(now) {
                    // Plain overwrite keeps the armed deadline.
                    slot.deadline
                } else {
                    None
                };
                *slot = Slot {
                    value: value.to_string(),
                    deadline,
                };
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: value.to_string(),
                    deadline: px_deadline,
                });
            }
        }
        Ok(())
    }

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64> {
        self.maybe_sweep();

        let now = current_timestamp_ms();

        // The entry guard holds the shard lock, so the read-parse-write is
        // atomic with respect to other incrby calls on the same key.
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.is_live(now) {
                    let current: i64 = slot.value.parse().map_err(|_| {
                        StoreError::NonNumericValue {
                            key: key.to_string(),
                        }
                    })?;
                    let next = current + delta;
                    slot.value = next.to_string();
                    Ok(next)
                } else {
                    *slot = Slot {
                        value: delta.to_string(),
                        deadline: None,
                    };
                    Ok(delta)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: delta.to_string(),
                    deadline: None,
                });
                Ok(delta)
            }
        }
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.maybe_sweep();

        let now = current_timestamp_ms();
        if let Some(mut slot) = self.data.get_mut(key) {
            if slot.is_live(now) {
                slot.deadline = Some(now + ttl.as_millis() as u64);
                return Ok(true);
            }
            drop(slot);
            self.data.remove(key);
        }
        Ok(false)
    }

    async fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<String>> {
        self.maybe_sweep();

        let now = current_timestamp_ms();
        let map = match self.data.get(key) {
            Some(slot) if slot.is_live(now) => decode_hash(key, &slot.value)?,
            Some(slot) => {
                drop(slot);
                self.data.remove(key);
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        Ok(fields
            .iter()
            .map(|field| map.get(*field).cloned().unwrap_or_default())
            .collect())
    }

    async fn hmset(&self, key: &str, fields: &[(&str, String)]) -> Result<()> {
        self.maybe_sweep();

        let now = current_timestamp_ms();

        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                let (mut map, deadline) = if slot.is_live(now) {
                    (decode_hash(key, &slot.value)?, slot.deadline)
                } else {
                    (BTreeMap::new(), None)
                };
                for (field, value) in fields {
                    map.insert((*field).to_string(), value.clone());
                }
                *slot = Slot {
                    value: encode_hash(key, &map)?,
                    deadline,
                };
            }
            Entry::Vacant(vacant) => {
                let mut map = BTreeMap::new();
                for (field, value) in fields {
                    map.insert((*field).to_string(), value.clone());
                }
                vacant.insert(Slot {
                    value: encode_hash(key, &map)?,
                    deadline: None,
                });
            }
        }
        Ok(())
    }

    async fn del(&self, keys: &[&str]) -> Result<u64> {
        for key in keys {
            self.data.remove(*key);
        }
        // Count is unconditional: deletion was attempted on every key.
        Ok(keys.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = MemoryStore::new();

        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_px_expiry() {
        let store = MemoryStore::new();

        store
            .set("k", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_plain_set_preserves_deadline() {
        let store = MemoryStore::new();

        store
            .set("k", "v1", Some(Duration::from_millis(30)))
            .await
            .unwrap();
        store.set("k", "v2", None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pexpire_rearm_replaces() {
        let store = MemoryStore::new();

        store
            .set("k", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(store.pexpire("k", Duration::from_millis(200)).await.unwrap());

        // Past the original deadline but inside the re-armed one.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_pexpire_absent_is_noop() {
        let store = MemoryStore::new();
        assert!(!store.pexpire("nope", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_incrby_from_absent() {
        let store = MemoryStore::new();

        assert_eq!(store.incr("c").await.unwrap(), 1);
        assert_eq!(store.incrby("c", 5).await.unwrap(), 6);
        assert_eq!(store.incrby("c", -2).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_incrby_non_numeric() {
        let store = MemoryStore::new();

        store.set("c", "not a number", None).await.unwrap();
        let err = store.incr("c").await.unwrap_err();
        assert!(err.to_string().contains("not an integer"));
    }

    #[tokio::test]
    async fn test_incrby_after_expiry_starts_fresh() {
        let store = MemoryStore::new();

        store
            .set("c", "40", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.incr("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hash_merge_and_padding() {
        let store = MemoryStore::new();

        store
            .hmset("h", &[("tokens", "5".to_string())])
            .await
            .unwrap();
        store
            .hmset("h", &[("lastRefill", "1000".to_string())])
            .await
            .unwrap();

        let values = store
            .hmget("h", &["tokens", "lastRefill", "missing"])
            .await
            .unwrap();
        assert_eq!(values, vec!["5", "1000", ""]);

        let values = store.hmget("absent", &["a", "b"]).await.unwrap();
        assert_eq!(values, vec!["", ""]);
    }

    #[tokio::test]
    async fn test_del_count_unconditional() {
        let store = MemoryStore::new();

        store.set("a", "1", None).await.unwrap();
        assert_eq!(store.del(&["a", "never-existed"]).await.unwrap(), 2);
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_and_manual_sweep() {
        let store = MemoryStore::with_sweep(SweepConfig::manual());

        store
            .set("a", "1", Some(Duration::from_millis(5)))
            .await
            .unwrap();
        store.set("b", "2", None).await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.sweep();
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_incr_loses_nothing() {
        let store = Arc::new(MemoryStore::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.incr("contended").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            store.get("contended").await.unwrap(),
            Some("800".to_string())
        );
    }
}
