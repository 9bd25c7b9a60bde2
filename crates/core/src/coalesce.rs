//! At most one in-flight execution per request key.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error};

use crate::metrics::COALESCED_JOINS;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoalesceError {
    #[error("shared execution for key '{0}' aborted")]
    Aborted(String),
}

type InFlight<T> = Shared<BoxFuture<'static, Result<T, CoalesceError>>>;

/// Shares one execution of a producer between concurrent callers of the same key.
///
/// The producer runs on its own task: a caller giving up does not cancel it.
/// The key is released once the execution finishes, after which the next call
/// starts a fresh execution.
pub struct RequestCoalescer<T> {
    inflight: Arc<Mutex<HashMap<String, InFlight<T>>>>,
}

impl<T> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> std::fmt::Debug for RequestCoalescer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &lock(&self.inflight).len())
            .finish()
    }
}

fn lock<V>(map: &Mutex<V>) -> MutexGuard<'_, V> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently executing.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Run `producer` for `key`, or join the execution already running for it.
    pub async fn wrap<F, Fut>(&self, key: &str, producer: F) -> Result<T, CoalesceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(key) {
                Some(existing) => {
                    debug!(key, "Joining in-flight execution");
                    COALESCED_JOINS.inc();
                    existing.clone()
                }
                None => {
                    let shared = self.spawn(key, producer());
                    inflight.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    fn spawn<Fut>(&self, key: &str, work: Fut) -> InFlight<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let map = Arc::clone(&self.inflight);
        let key = key.to_string();

        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(work).catch_unwind().await;
            lock(&map).remove(&key);
            outcome.map_err(|_| {
                error!(key = %key, "Coalesced execution panicked");
                CoalesceError::Aborted(key)
            })
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(CoalesceError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }
}
