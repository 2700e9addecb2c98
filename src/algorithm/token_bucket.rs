//! Token Bucket admission algorithm.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::duration::parse_duration;
use crate::error::{ConfigError, Result, StoreError};
use crate::response::RatelimitResponse;
use crate::store::{KvStore, current_timestamp_ms};

/// Token Bucket admission algorithm.
///
/// Each identifier owns one persistent `{tokens, lastRefill}` record at
/// `namespace:identifier:bucket` (not bucketed by time). Every elapsed
/// `refill_interval` credits `refill_rate` tokens up to `max_tokens`; one
/// token is consumed per admitted request, and a denied request consumes
/// nothing.
///
/// The refill clock only advances when at least one whole tick's worth of
/// tokens was credited, so repeated partial ticks are carried forward
/// instead of rounded away.
///
/// The record's TTL is re-armed on every access to `expiry_factor ×
/// refill_interval` (default 2×): long enough for a dormant identifier's
/// elapsed ticks to be measured on its next access, short enough that an
/// abandoned record is eventually reclaimed.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    refill_rate: f64,
    interval_ms: u64,
    max_tokens: u64,
    expiry_factor: f64,
}

/// Hash fields of the stored bucket record.
const FIELD_TOKENS: &str = "tokens";
const FIELD_LAST_REFILL: &str = "lastRefill";

impl TokenBucket {
    /// Create a token bucket policy crediting `refill_rate` tokens per
    /// `refill_interval`, capped at `max_tokens`.
    ///
    /// # Errors
    ///
    /// Fails when `refill_rate` is not a positive finite number, when
    /// `max_tokens` is zero, or when `refill_interval` does not parse to a
    /// positive duration.
    pub fn new(refill_rate: f64, refill_interval: &str, max_tokens: u64) -> Result<Self> {
        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(
                ConfigError::InvalidRefillRate(format!("must be positive, got {refill_rate}"))
                    .into(),
            );
        }
        if max_tokens == 0 {
            return Err(
                ConfigError::InvalidLimit("max_tokens must be greater than 0".into()).into(),
            );
        }
        let interval_ms = parse_duration(refill_interval)?;
        if interval_ms <= 0 {
            return Err(ConfigError::InvalidWindow(format!(
                "refill interval must be positive, got {refill_interval:?}"
            ))
            .into());
        }
        Ok(Self {
            refill_rate,
            interval_ms: interval_ms as u64,
            max_tokens,
            expiry_factor: 2.0,
        })
    }

    /// Override the TTL safety margin on the bucket record.
    ///
    /// Clamped to at least 1.0 so a record never expires before the interval
    /// it is supposed to measure.
    pub fn with_expiry_factor(mut self, factor: f64) -> Self {
        self.expiry_factor = factor.max(1.0);
        self
    }

    /// Decide at an explicit timestamp. `limit` pins `now` to the wall clock.
    pub(crate) async fn limit_at<S: KvStore>(
        &self,
        store: &S,
        namespace: &str,
        identifier: &str,
        now: u64,
    ) -> Result<RatelimitResponse> {
        let key = format!("{namespace}:{identifier}:bucket");

        let record = store.hmget(&key, &[FIELD_TOKENS, FIELD_LAST_REFILL]).await?;
        let (tokens, last_refill) = if record[0].is_empty() && record[1].is_empty() {
            // First sighting: a full bucket refilled right now.
            (self.max_tokens as f64, now)
        } else {
            let tokens: f64 = record[0].parse().map_err(|_| StoreError::NonNumericValue {
                key: key.clone(),
            })?;
            let last_refill: u64 = record[1].parse().map_err(|_| StoreError::NonNumericValue {
                key: key.clone(),
            })?;
            (tokens, last_refill)
        };

        let elapsed = now.saturating_sub(last_refill);
        let ticks = elapsed / self.interval_ms;
        let to_add = ticks as f64 * self.refill_rate;
        let refilled = (tokens + to_add).min(self.max_tokens as f64);

        let success = refilled >= 1.0;
        let stored = if success { refilled - 1.0 } else { refilled };
        // Whole-tick advance only: fractional elapsed time stays creditable.
        let refill_date = if to_add > 0.0 { now } else { last_refill };

        store
            .hmset(
                &key,
                &[
                    (FIELD_TOKENS, stored.to_string()),
                    (FIELD_LAST_REFILL, refill_date.to_string()),
                ],
            )
            .await?;
        let ttl_ms = (self.expiry_factor * self.interval_ms as f64) as u64;
        store.pexpire(&key, Duration::from_millis(ttl_ms)).await?;

        Ok(RatelimitResponse {
            success,
            limit: self.max_tokens,
            remaining: stored.max(0.0),
            reset: refill_date + self.interval_ms,
        })
    }
}

impl Algorithm for TokenBucket {
    fn name(&self) -> &'static str {
        "token_bucket"
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
