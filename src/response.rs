//! Admission decision response type.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::current_timestamp_ms;

/// The result of one admission decision.
///
/// Produced fresh on every [`Limiter::limit`](crate::Limiter::limit) call;
/// never persisted. `remaining` is fractional-capable because the sliding
/// window reports a weighted estimate rounded to tenths; it is always
/// clamped to `0.0 ..= limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatelimitResponse {
    /// Whether the request is admitted.
    pub success: bool,
    /// Maximum admissions per accounting period.
    pub limit: u64,
    /// Admissions remaining in the current period.
    pub remaining: f64,
    /// Epoch-ms timestamp when the decision resets: the period rollover, or
    /// the next moment a denied identifier could succeed again.
    pub reset: u64,
}

impl RatelimitResponse {
    /// Check if the request was denied.
    pub fn is_denied(&self) -> bool {
        !self.success
    }

    /// Time until the decision resets, measured from now.
    ///
    /// Zero if the reset boundary has already passed.
    pub fn time_until_reset(&self) -> Duration {
        Duration::from_millis(self.reset.saturating_sub(current_timestamp_ms()))
    }

    /// Convert to HTTP headers.
    ///
    /// Returns a vector of (header_name, header_value) pairs. `Retry-After`
    /// is included only on denial.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", format!("{}", self.remaining)),
            ("X-RateLimit-Reset", self.reset.to_string()),
        ];

        if self.is_denied() {
            headers.push((
                "Retry-After",
                self.time_until_reset().as_secs().to_string(),
            ));
        }

        headers
    }
}
