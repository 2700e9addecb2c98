//! Error types for rate limiting operations.
//!
//! Construction-time errors (bad durations, zero limits) surface before any
//! traffic is processed. Per-request store errors propagate unmodified out of
//! [`Limiter::limit`](crate::Limiter::limit): this layer adds no retry,
//! circuit breaking, or fallback; whether a store failure fails open or
//! closed is the caller's decision.

use thiserror::Error;

/// Result type for rate limiting operations.
pub type Result<T> = std::result::Result<T, RatelimitError>;

/// Main error type for rate limiting operations.
#[derive(Debug, Error)]
pub enum RatelimitError {
    /// Duration string was empty or did not match the `<magnitude> <unit>` grammar.
    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    /// Duration magnitude parsed, but the unit token is not a recognized spelling.
    #[error("Unrecognized duration unit: {0:?}")]
    UnrecognizedUnit(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store backend error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors, raised at algorithm construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Token limit must be greater than zero.
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Window or refill interval must be a positive duration.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Refill rate must be greater than zero.
    #[error("Invalid refill rate: {0}")]
    InvalidRefillRate(String),
}

/// Store-related errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A counter key holds data that does not parse as an integer.
    ///
    /// Indicates data corruption or a key collision; propagated, not retried.
    #[error("Value at key {key:?} is not an integer")]
    NonNumericValue {
        /// The offending key.
        key: String,
    },

    /// Serialization/deserialization of a hash record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic store operation failed (e.g. network error from a shared backend).
    #[error("{message}")]
    OperationFailed {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },
}

impl StoreError {
    /// Create a new operation failed error.
    pub fn operation_failed(message: impl Into<String>, retryable: bool) -> Self {
        Self::OperationFailed {
            message: message.into(),
            retryable,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OperationFailed { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
