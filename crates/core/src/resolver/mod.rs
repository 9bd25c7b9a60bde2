//! Stream resolution.
//!
//! [`StreamResolver`] turns a content id into a ranked stream list:
//!
//! 1. stream cache
//! 2. stored results, trusted when there are enough of them
//! 3. title lookup
//! 4. live indexer search, raced against a timeout
//! 5. normalization (hash check, ordering, cache write, presentation)
//!
//! Concurrent requests for the same id share one resolution. Failures of the
//! title lookup or the indexer degrade to the stored results.

mod types;

pub use types::{ResolveError, ResolverSettings, StreamRequest};

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::TieredCache;
use crate::coalesce::RequestCoalescer;
use crate::content::ContentId;
use crate::filter::{apply_filters, apply_sorting, UserConfig};
use crate::metadata::TitleResolver;
use crate::metrics::{
    DEGRADED_FALLBACKS, LIVE_SEARCH_TIMEOUTS, RESOLUTION_DURATION, STREAM_RESOLUTIONS,
};
use crate::registry::ProviderRegistry;
use crate::searcher::{LiveSearch, SearchError};
use crate::store::StreamStore;
use crate::stream::{
    sort_by_seeders_then_recency, to_resolved_stream, ResolvedStream, StreamCandidate,
    StreamResponse,
};

type Resolution = Result<Vec<ResolvedStream>, ResolveError>;

/// The per-request pipeline. Cheap to clone so a coalesced execution can own it.
#[derive(Clone)]
struct Pipeline {
    cache: TieredCache,
    store: Arc<dyn StreamStore>,
    titles: Arc<dyn TitleResolver>,
    live: Option<Arc<LiveSearch>>,
    search_permits: Arc<Semaphore>,
    settings: ResolverSettings,
}

/// Resolves stream lists for content ids.
pub struct StreamResolver {
    pipeline: Pipeline,
    coalescer: RequestCoalescer<Resolution>,
    registry: Arc<ProviderRegistry>,
}

impl StreamResolver {
    pub fn new(
        cache: TieredCache,
        store: Arc<dyn StreamStore>,
        titles: Arc<dyn TitleResolver>,
        live: Option<LiveSearch>,
        registry: Arc<ProviderRegistry>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                cache,
                store,
                titles,
                live: live.map(Arc::new),
                search_permits: Arc::new(Semaphore::new(settings.max_concurrent_searches)),
                settings,
            },
            coalescer: RequestCoalescer::new(),
            registry,
        }
    }

    pub fn cache(&self) -> &TieredCache {
        &self.pipeline.cache
    }

    pub fn store(&self) -> &Arc<dyn StreamStore> {
        &self.pipeline.store
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Whether live searches are possible.
    pub fn has_indexer(&self) -> bool {
        self.pipeline.live.is_some()
    }

    /// Resolutions currently running.
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Resolve the stream list for a request, sharing in-flight work for the same id.
    pub async fn resolve(&self, request: &StreamRequest) -> Resolution {
        let pipeline = self.pipeline.clone();
        let content = request.content.clone();
        self.coalescer
            .wrap(request.key(), move || async move { pipeline.run(content).await })
            .await
            .map_err(|e| ResolveError::Internal(e.to_string()))?
    }

    /// Resolve, then filter and sort for the user and wrap with cache hints.
    pub async fn streams(
        &self,
        request: &StreamRequest,
        config: &UserConfig,
    ) -> Result<StreamResponse, ResolveError> {
        let streams = self.resolve(request).await?;
        let providers = self.registry.snapshot();
        let filtered = apply_filters(
            streams,
            config,
            request.content.content_type(),
            &providers,
        );
        Ok(StreamResponse::new(apply_sorting(filtered, config.sort)))
    }
}

impl Pipeline {
    async fn run(self, content: ContentId) -> Resolution {
        let start = Instant::now();
        let (path, result) = self.resolve_content(&content).await;
        STREAM_RESOLUTIONS.with_label_values(&[path]).inc();
        RESOLUTION_DURATION
            .with_label_values(&[path])
            .observe(start.elapsed().as_secs_f64());

        if let Ok(streams) = &result {
            info!(
                content_id = %content.key(),
                path,
                streams = streams.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Resolved streams"
            );
        }
        result
    }

    /// Run the steps and report which terminal path produced the result.
    async fn resolve_content(&self, content: &ContentId) -> (&'static str, Resolution) {
        let key = content.key();

        if let Some(cached) = self.cache.get_stream_results(key).await {
            if !cached.is_empty() {
                debug!(content_id = %key, stage = "cache", count = cached.len(), "Stream cache hit");
                return ("cache", Ok(present(cached)));
            }
        }

        let stored = match self.store.query_by_content(content) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(content_id = %key, stage = "store", error = %e, "Store query failed");
                return ("error", Err(e.into()));
            }
        };
        if stored.len() >= self.settings.min_store_results {
            debug!(content_id = %key, stage = "store", count = stored.len(), "Enough stored results");
            return ("store", Ok(self.normalize(key, stored).await));
        }

        let Some(live) = self.live.clone() else {
            return self.degrade(key, "no_indexer", stored).await;
        };

        let title = match content.imdb_id() {
            Some(imdb_id) => match self.titles.lookup_title(imdb_id).await {
                Ok(title) => title,
                Err(e) => {
                    warn!(content_id = %key, stage = "title", error = %e, "Title lookup failed");
                    return self.degrade(key, "title_lookup", stored).await;
                }
            },
            None => {
                debug!(content_id = %key, stage = "title", "No title source for this id");
                return self.degrade(key, "title_lookup", stored).await;
            }
        };

        match self.race_live_search(live, content, title, stored.clone()).await {
            LiveOutcome::Found(results) => ("live", Ok(self.normalize(key, results).await)),
            LiveOutcome::Failed(reason) => self.degrade(key, reason, stored).await,
            LiveOutcome::TimedOut => {
                LIVE_SEARCH_TIMEOUTS.inc();
                warn!(
                    content_id = %key,
                    stage = "live_search",
                    timeout_secs = self.settings.search_timeout.as_secs(),
                    "Live search timed out"
                );
                ("timeout", Ok(Vec::new()))
            }
        }
    }

    /// Spawn the live search and wait for it up to the configured timeout.
    ///
    /// On timeout the task is left running so its store writes still land.
    async fn race_live_search(
        &self,
        live: Arc<LiveSearch>,
        content: &ContentId,
        title: String,
        prior: Vec<StreamCandidate>,
    ) -> LiveOutcome {
        let permits = Arc::clone(&self.search_permits);
        let task_content = content.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| SearchError::Internal(e.to_string()))?;
            live.search(&task_content, &title, prior).await
        });

        match tokio::time::timeout(self.settings.search_timeout, handle).await {
            Ok(Ok(Ok(results))) => LiveOutcome::Found(results),
            Ok(Ok(Err(e))) => {
                warn!(content_id = %content.key(), stage = "live_search", error = %e, "Live search failed");
                LiveOutcome::Failed("search_failed")
            }
            Ok(Err(e)) => {
                warn!(content_id = %content.key(), stage = "live_search", error = %e, "Live search task aborted");
                LiveOutcome::Failed("search_panicked")
            }
            Err(_) => LiveOutcome::TimedOut,
        }
    }

    async fn degrade(
        &self,
        key: &str,
        reason: &'static str,
        stored: Vec<StreamCandidate>,
    ) -> (&'static str, Resolution) {
        DEGRADED_FALLBACKS.with_label_values(&[reason]).inc();
        debug!(content_id = %key, reason, count = stored.len(), "Serving stored results");
        ("degraded", Ok(self.normalize(key, stored).await))
    }

    /// Drop hashless candidates, order them, cache non-empty lists and present them.
    ///
    /// The cache write runs on its own task and never delays the response.
    async fn normalize(&self, key: &str, candidates: Vec<StreamCandidate>) -> Vec<ResolvedStream> {
        let mut candidates: Vec<StreamCandidate> = candidates
            .into_iter()
            .filter(StreamCandidate::has_info_hash)
            .collect();
        sort_by_seeders_then_recency(&mut candidates);
        if !candidates.is_empty() && self.cache.is_enabled() {
            let cache = self.cache.clone();
            let key = key.to_string();
            let to_cache = candidates.clone();
            tokio::spawn(async move {
                cache.set_stream_results(&key, &to_cache).await;
            });
        }
        candidates.iter().map(to_resolved_stream).collect()
    }
}

enum LiveOutcome {
    Found(Vec<StreamCandidate>),
    Failed(&'static str),
    TimedOut,
}

fn present(mut candidates: Vec<StreamCandidate>) -> Vec<ResolvedStream> {
    sort_by_seeders_then_recency(&mut candidates);
    candidates.iter().map(to_resolved_stream).collect()
}
