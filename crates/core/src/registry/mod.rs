//! Provider registry.
//!
//! Holds the list of providers offered to users. The list starts as the
//! built-in legacy set and is replaced wholesale by the indexers enabled in
//! the aggregation service whenever a refresh succeeds.

mod providers;

pub use providers::{legacy_providers, provider_key, ProviderDescriptor};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::searcher::Indexer;

/// Shared, periodically refreshed provider list.
pub struct ProviderRegistry {
    indexer: Option<Arc<dyn Indexer>>,
    providers: RwLock<Arc<Vec<ProviderDescriptor>>>,
    last_success: Mutex<Option<Instant>>,
    /// Serializes refreshes; waiters observe the outcome of the running one.
    refresh_lock: tokio::sync::Mutex<()>,
    /// Bumped after every completed refresh attempt.
    generation: AtomicU64,
    freshness: Duration,
}

impl ProviderRegistry {
    pub fn new(indexer: Option<Arc<dyn Indexer>>, freshness: Duration) -> Self {
        Self {
            indexer,
            providers: RwLock::new(Arc::new(legacy_providers())),
            last_success: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            freshness,
        }
    }

    /// Current provider list.
    pub fn snapshot(&self) -> Arc<Vec<ProviderDescriptor>> {
        match self.providers.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn is_fresh(&self) -> bool {
        self.last_success
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .is_some_and(|at| at.elapsed() < self.freshness)
    }

    fn swap(&self, providers: Vec<ProviderDescriptor>) {
        let providers = Arc::new(providers);
        match self.providers.write() {
            Ok(mut guard) => *guard = providers,
            Err(poisoned) => *poisoned.into_inner() = providers,
        }
        if let Ok(mut guard) = self.last_success.lock() {
            *guard = Some(Instant::now());
        }
    }

    /// Refresh the list from the indexer and return the resulting snapshot.
    ///
    /// A caller arriving while a refresh runs waits for it and gets its
    /// outcome. Unless `force` is set, a list refreshed within the freshness
    /// window is returned as is. Failures and empty answers keep the
    /// previous list.
    pub async fn refresh(&self, force: bool) -> Arc<Vec<ProviderDescriptor>> {
        let Some(indexer) = &self.indexer else {
            return self.snapshot();
        };

        let seen_generation = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != seen_generation {
            debug!("Provider refresh joined a concurrent refresh");
            return self.snapshot();
        }
        if !force && self.is_fresh() {
            return self.snapshot();
        }

        match indexer.list_indexers().await {
            Ok(indexers) => {
                let providers: Vec<ProviderDescriptor> = indexers
                    .iter()
                    .filter(|i| i.enabled)
                    .map(ProviderDescriptor::from_indexer)
                    .collect();
                if providers.is_empty() {
                    warn!(indexer = indexer.name(), "No enabled indexers, keeping previous providers");
                } else {
                    info!(indexer = indexer.name(), count = providers.len(), "Refreshed providers");
                    self.swap(providers);
                }
            }
            Err(e) => {
                warn!(indexer = indexer.name(), error = %e, "Provider refresh failed, keeping previous providers");
            }
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }

    /// Run non-forced refreshes every `interval` until shutdown is signalled.
    pub fn spawn_refresher(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Provider refresher started");
            registry.refresh(false).await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Provider refresher received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        registry.refresh(false).await;
                    }
                }
            }
            info!("Provider refresher stopped");
        })
    }
}
