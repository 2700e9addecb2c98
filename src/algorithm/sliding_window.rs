//! Sliding Window admission algorithm.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::duration::parse_duration;
use crate::error::{ConfigError, Result, StoreError};
use crate::response::RatelimitResponse;
use crate::store::{KvStore, current_timestamp_ms};

/// Sliding Window admission algorithm.
///
/// Approximates a continuous sliding window from two adjacent fixed buckets:
/// the previous bucket's count is weighted by the fraction of the current
/// bucket not yet elapsed, then added to the current count. This smooths the
/// boundary burst that fixed window allows, at O(1) storage and O(1) work
/// per decision. This is a weighted-average approximation, not an exact
/// sliding log.
///
/// The previous-bucket read is a separate, non-atomic `get` relative to the
/// increment, so the estimate can be momentarily stale across adjacent
/// bucket transitions. Accepted approximation error.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    tokens: u64,
    window_ms: u64,
}

impl SlidingWindow {
    /// Create a sliding window policy of `tokens` admissions per `window`.
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
        let current_window = now / self.window_ms;
        let previous_window = current_window.wrapping_sub(1);
        let current_key = format!("{namespace}:{identifier}:{current_window}");
        let previous_key = format!("{namespace}:{identifier}:{previous_window}");

        let current = store.incr(&current_key).await?;
        if current == 1 {
            store
                .pexpire(&current_key, Duration::from_millis(self.window_ms))
                .await?;
        }

        let previous: i64 = match store.get(&previous_key).await? {
            Some(raw) => raw.parse().map_err(|_| StoreError::NonNumericValue {
                key: previous_key.clone(),
            })?,
            None => 0,
        };

        let percentage = (now % self.window_ms) as f64 / self.window_ms as f64;
        let estimate = previous.max(0) as f64 * (1.0 - percentage) + current.max(0) as f64;

        let success = estimate <= self.tokens as f64;
        let remaining = if success {
            round_tenths((self.tokens as f64 - estimate).max(0.0))
        } else {
            0.0
        };

        Ok(RatelimitResponse {
            success,
            limit: self.tokens,
            remaining,
            reset: (current_window + 1) * self.window_ms,
        })
    }
}

/// Round to one decimal place.
fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl Algorithm for SlidingWindow {
    fn name(&self) -> &'static str {
        "sliding_window"
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
