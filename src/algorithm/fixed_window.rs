//! Fixed Window admission algorithm.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::duration::parse_duration;
use crate::error::{ConfigError, Result};
use crate::response::RatelimitResponse;
use crate::store::{KvStore, current_timestamp_ms};

/// Fixed Window admission algorithm.
///
/// Divides time into windows of fixed length and admits up to `tokens`
/// requests per window. Each window owns one counter key
/// `namespace:identifier:bucket` that self-destructs at window end, so the
/// store holds at most one live key per active identifier per window.
///
/// Fixed window counts *attempts*: a denied caller still burns a counter
/// unit. Simple and cheap, but allows up to `2 × tokens` requests across a
/// window boundary.
#[derive(Debug, Clone)]
pub struct FixedWindow {
    tokens: u64,
    window_ms: u64,
}

impl FixedWindow {
    /// Create a fixed window policy of `tokens` admissions per `window`.
    ///
    /// `window` is any string accepted by
    /// [`parse_duration`](crate::duration::parse_duration), e.g. `"10 s"`.
    ///
    /// # Errors
    ///
    /// Fails when `tokens` is zero, when `window` does not parse, or when it
    /// parses to a non-positive duration.
    pub fn new(tokens: u64, window: &str) -> Result<Self> {
        if tokens == 0 {
            return Err(ConfigError::InvalidLimit("tokens must be greater than 0".into()).into());
        }
        let window_ms = parse_duration(window)?;
        if window_ms <= 0 {
            return Err(
                ConfigError::InvalidWindow(format!("window must be positive, got {window:?}"))
                    .into(),
            );
        }
        Ok(Self {
            tokens,
            window_ms: window_ms as u64,
        })
    }

    /// Decide at an explicit timestamp. `limit` pins `now` to the wall clock.
    pub(crate) async fn limit_at<S: KvStore>(
        &self,
        store: &S,
        namespace: &str,
        identifier: &str,
        now: u64,
    ) -> Result<RatelimitResponse> {
        let bucket = now / self.window_ms;
        let key = format!("{namespace}:{identifier}:{bucket}");

        let current = store.incr(&key).await?;
        if current == 1 {
            store
                .pexpire(&key, Duration::from_millis(self.window_ms))
                .await?;
        }

        let used = current.max(0) as u64;
        Ok(RatelimitResponse {
            success: used <= self.tokens,
            limit: self.tokens,
            remaining: self.tokens.saturating_sub(used) as f64,
            reset: (bucket + 1) * self.window_ms,
        })
    }
}

impl Algorithm for FixedWindow {
    fn name(&self) -> &'static str {
        "fixed_window"
    }

    async fn limit<S: KvStore>(
        &self,
        store: &S,
        namespace: &str,
        identifier: &str,
    ) -> Result<RatelimitResponse> {
        self.limit_at(store, namespace, identifier, current_timestamp_ms())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_exhaustion_within_window() {
        let store = MemoryStore::new();
        let algorithm = FixedWindow::new(5, "100 s").unwrap();
        let now = 1_700_000_042_123;

        for i in 1..=5 {
            let response = algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
            assert!(response.success, "request {} should be admitted", i);
            assert_eq!(response.limit, 5);
            assert_eq!(response.remaining, (5 - i) as f64);
        }

        let response = algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
        assert!(response.is_denied());
        assert_eq!(response.remaining, 0.0);
    }

    #[tokio::test]
    async fn test_reset_is_next_window_boundary() {
        let store = MemoryStore::new();
        let algorithm = FixedWindow::new(3, "10s").unwrap();
        let now = 1_700_000_042_123;

        let response = algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
        assert_eq!(response.reset, (now / 10_000 + 1) * 10_000);
    }

    #[tokio::test]
    async fn test_window_rollover_readmits() {
        let store = MemoryStore::new();
        let algorithm = FixedWindow::new(4, "10s").unwrap();
        let now = 1_700_000_040_000;

        for _ in 0..5 {
            algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
        }

        // Exactly one window later the counter key is a new bucket.
        let response = algorithm
            .limit_at(&store, "api", "user:1", now + 10_000)
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.remaining, 3.0);
    }

    #[tokio::test]
    async fn test_denied_attempt_still_burns_a_unit() {
        let store = MemoryStore::new();
        let algorithm = FixedWindow::new(1, "10s").unwrap();
        let now = 1_700_000_040_000;

        algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
        algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();

        let bucket = now / 10_000;
        let count = store
            .get(&format!("api:user:1:{bucket}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count, "2", "attempts are counted even on denial");
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let store = MemoryStore::new();
        let algorithm = FixedWindow::new(1, "10s").unwrap();
        let now = 1_700_000_040_000;

        let response = algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
        assert!(response.success);
        let response = algorithm.limit_at(&store, "api", "user:1", now).await.unwrap();
        assert!(response.is_denied());

        let response = algorithm.limit_at(&store, "api", "user:2", now).await.unwrap();
        assert!(response.success, "user:2 has its own counter");
    }

    #[tokio::test]
    async fn test_construction_validation() {
        assert!(FixedWindow::new(0, "10s").is_err());
        assert!(FixedWindow::new(5, "bogus").is_err());
        assert!(FixedWindow::new(5, "-10s").is_err());
        assert!(FixedWindow::new(5, "10s").is_ok());
    }
}
