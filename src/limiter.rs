//! Limiter facade binding a namespace, an algorithm, and a store.

use std::sync::Arc;

use crate::algorithm::Algorithm;
use crate::error::Result;
use crate::response::RatelimitResponse;
use crate::store::KvStore;

/// One logical rate limiter: a namespace bound to an algorithm and a store.
///
/// The namespace scopes every key this limiter writes, so several limiters
/// with distinct namespaces can share one store without key collisions.
/// The facade is stateless beyond the binding, since all mutable state
/// lives in the store, so one instance (or clones of it) can serve
/// concurrent callers.
///
/// # Example
///
/// ```ignore
/// use kvlimit::{FixedWindow, Limiter, MemoryStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryStore::new());
/// let limiter = Limiter::new("api", FixedWindow::new(100, "1m")?, store);
///
/// let response = limiter.limit("user:123").await?;
/// if response.success {
///     // handle the request
/// }
/// ```
#[derive(Debug)]
pub struct Limiter<A, S> {
    namespace: String,
    algorithm: A,
    store: Arc<S>,
}

impl<A: Clone, S> Clone for Limiter<A, S> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            algorithm: self.algorithm.clone(),
            store: self.store.clone(),
        }
    }
}

impl<A, S> Limiter<A, S>
where
    A: Algorithm,
    S: KvStore,
{
    /// Bind `namespace` and `algorithm` to a shared store.
    pub fn new(namespace: impl Into<String>, algorithm: A, store: Arc<S>) -> Self {
        Self {
            namespace: namespace.into(),
            algorithm,
            store,
        }
    }

    /// The namespace scoping this limiter's keys.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decide whether one request for `identifier` is admitted.
    ///
    /// Any store error propagates unchanged; whether that fails the request
    /// open or closed is the caller's decision.
    pub async fn limit(&self, identifier: &str) -> Result<RatelimitResponse> {
        let response = self
            .algorithm
            .limit(&*self.store, &self.namespace, identifier)
            .await?;

        tracing::debug!(
            namespace = %self.namespace,
            identifier,
            algorithm = self.algorithm.name(),
            success = response.success,
            remaining = response.remaining,
            "admission decision"
        );

        Ok(response)
    }
}
