//! Request-admission rate limiting over a shared key-value store.
//!
//! `kvlimit` decides whether a request identified by a string (user, IP,
//! API key) is allowed under a named policy, how many admissions remain in
//! the current accounting period, and when the decision resets. Decision
//! state is never held in process memory as the source of truth: it lives
//! in a key-value store behind the [`KvStore`] trait, so multiple
//! independent processes sharing one store enforce one consistent limit.
//!
//! # Quick Start
//!
//! ```ignore
//! use kvlimit::{FixedWindow, Limiter, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> kvlimit::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let limiter = Limiter::new("api", FixedWindow::new(100, "1 m")?, store);
//!
//!     let response = limiter.limit("user:123").await?;
//!     if response.success {
//!         println!("allowed, {} remaining", response.remaining);
//!     } else {
//!         println!("limited until {}", response.reset);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Algorithms
//!
//! | Algorithm | Keys per identifier | Behavior |
//! |-----------|---------------------|----------|
//! | [`FixedWindow`] | 1 per window | counts attempts; bursts at boundaries |
//! | [`SlidingWindow`] | 2 adjacent windows | weighted estimate; smooth boundaries |
//! | [`TokenBucket`] | 1 persistent record | controlled bursts; steady refill |
//!
//! Durations are human-readable strings (`"500ms"`, `"10 s"`, `"2 hrs"`,
//! `"1d"`), parsed by [`duration::parse_duration`].
//!
//! # Consistency
//!
//! Each [`KvStore`] operation is atomic with respect to itself, and that is
//! the only serialization this layer relies on. The token bucket's
//! read-modify-write is not linearizable across processes on a non-atomic
//! backend, and the sliding window's previous-bucket read can be momentarily
//! stale. Both are accepted trade-offs, not hidden. Store errors propagate
//! unchanged out of [`Limiter::limit`]; failing open or closed is the
//! caller's policy.
//!
//! # Feature Flags
//!
//! - `memory` (default): the in-memory reference store with TTL sweeping

pub mod algorithm;
pub mod duration;
pub mod error;
pub mod limiter;
pub mod response;
pub mod store;

// Re-export main types
pub use algorithm::{Algorithm, FixedWindow, SlidingWindow, TokenBucket};
pub use duration::parse_duration;
pub use error::{ConfigError, RatelimitError, Result, StoreError};
pub use limiter::Limiter;
pub use response::RatelimitResponse;
pub use store::KvStore;

#[cfg(feature = "memory")]
pub use store::{MemoryStore, SweepConfig, SweepInterval};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::algorithm::{Algorithm, FixedWindow, SlidingWindow, TokenBucket};
    pub use crate::duration::parse_duration;
    pub use crate::error::{RatelimitError, Result};
    pub use crate::limiter::Limiter;
    pub use crate::response::RatelimitResponse;
    pub use crate::store::KvStore;

    #[cfg(feature = "memory")]
    pub use crate::store::{MemoryStore, SweepConfig, SweepInterval};
}
