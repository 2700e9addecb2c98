//! Admission algorithm trait and implementations.
//!
//! Each algorithm is a pure function from `(store, namespace, identifier)`
//! to a decision, parameterized by policy constants fixed at construction
//! time. All state lives in the store; the algorithms hold only their
//! immutable policy.
//!
//! # Available Algorithms
//!
//! | Algorithm | Storage per identifier | Behavior |
//! |-----------|------------------------|----------|
//! | Fixed Window | one counter per window | counts attempts, bursts at boundaries |
//! | Sliding Window | two adjacent counters | weighted estimate, smooths boundaries |
//! | Token Bucket | one persistent record | controlled bursts, steady refill |

mod fixed_window;
mod sliding_window;
mod token_bucket;

pub use fixed_window::FixedWindow;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

use std::future::Future;

use crate::error::Result;
use crate::response::RatelimitResponse;
use crate::store::KvStore;

/// Admission algorithm trait.
///
/// Implementations must be thread-safe; one instance may serve concurrent
/// callers because every decision round-trips through the store. Cross-caller
/// serialization is delegated entirely to the store's atomicity guarantees;
/// no algorithm takes a lock or retries.
pub trait Algorithm: Send + Sync + 'static {
    /// Get the algorithm name (for logging/metrics).
    fn name(&self) -> &'static str;

    /// Decide whether one request for `identifier` under `namespace` is
    /// admitted, recording the attempt against the store.
    fn limit<S: KvStore>(
        &self,
        store: &S,
        namespace: &str,
        identifier: &str,
    ) -> impl Future<Output = Result<RatelimitResponse>> + Send;
}
