//! Key-value store contract and implementations.
//!
//! This module defines the [`KvStore`] trait, the capability set every
//! backing store must satisfy, along with the built-in in-memory reference
//! implementation. Any conforming backend (local or networked) may be
//! substituted without algorithm changes; the algorithms never branch on
//! which backend they hold.

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryStore, SweepConfig, SweepInterval};

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Key-value store contract for rate limiting state.
///
/// All operations are async to support both local and distributed backends.
/// Implementations must be thread-safe (`Send + Sync`).
///
/// Each operation is expected to be atomic *with respect to itself*: two
/// concurrent `incr` calls on the same key must never lose an update. The
/// algorithms do no client-side locking and trust the store for this. The
/// store also owns key lifecycle: a key given a TTL (via `set` with `px` or
/// via `pexpire`) must become unobservable to `get`/`hmget`/`incrby` after
/// approximately that many milliseconds; the algorithms never explicitly
/// delete their own records.
pub trait KvStore: Send + Sync + 'static {
    /// Get the string value at `key`.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Set the string value at `key`, with an optional `px` TTL.
    ///
    /// With `px`, the key expires and becomes absent after approximately
    /// that duration. Without `px`, any previously armed TTL on the key is
    /// left in place (reference-store behavior; see the backend docs).
    fn set(
        &self,
        key: &str,
        value: &str,
        px: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Atomically increment the integer at `key` by 1.
    ///
    /// Equivalent to `incrby(key, 1)`.
    fn incr(&self, key: &str) -> impl Future<Output = Result<i64>> + Send {
        async move { self.incrby(key, 1).await }
    }

    /// Atomically increment the integer at `key` by `delta`.
    ///
    /// A non-existent key behaves as 0 before the increment. Returns the
    /// value AFTER incrementing. Fails with
    /// [`StoreError::NonNumericValue`](crate::error::StoreError::NonNumericValue)
    /// if the existing value cannot parse as an integer.
    fn incrby(&self, key: &str, delta: i64) -> impl Future<Output = Result<i64>> + Send;

    /// Set a TTL on `key`, replacing any prior TTL.
    ///
    /// Returns `true` if the key existed and the TTL was armed, `false` for
    /// an absent key (no-op).
    fn pexpire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<bool>> + Send;

    /// Read `fields` from the hash record at `key`.
    ///
    /// Returns one string per requested field, in order; a missing key or a
    /// missing field yields the empty string at that position.
    fn hmget(&self, key: &str, fields: &[&str]) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Write `fields` into the hash record at `key`.
    ///
    /// Merges into any existing field-set, creating the key if absent.
    fn hmset(
        &self,
        key: &str,
        fields: &[(&str, String)],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete `keys`.
    ///
    /// The returned count is unconditional: it equals the argument count
    /// regardless of prior existence (reference-store contract).
    fn del(&self, keys: &[&str]) -> impl Future<Output = Result<u64>> + Send;
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str, px: Option<Duration>) -> Result<()> {
        (**self).set(key, value, px).await
    }

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64> {
        (**self).incrby(key, delta).await
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> Result<bool> {
        (**self).pexpire(key, ttl).await
    }

    async fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<String>> {
        (**self).hmget(key, fields).await
    }

    async fn hmset(&self, key: &str, fields: &[(&str, String)]) -> Result<()> {
        (**self).hmset(key, fields).await
    }

    async fn del(&self, keys: &[&str]) -> Result<u64> {
        (**self).del(keys).await
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
