//! Mock magnet resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::searcher::{MagnetResolver, RawCandidate};

/// Mock implementation of the MagnetResolver trait.
///
/// Returns the candidate's magnet URI, a magnet download link, or a magnet
/// registered for its download URL with [`MockMagnetResolver::set_redirect`].
#[derive(Default)]
pub struct MockMagnetResolver {
    redirects: Arc<RwLock<HashMap<String, String>>>,
    calls: AtomicUsize,
}

impl MockMagnetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `download_url` with `magnet`, as an indexer redirect would.
    pub async fn set_redirect(&self, download_url: &str, magnet: &str) {
        self.redirects
            .write()
            .await
            .insert(download_url.to_string(), magnet.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MagnetResolver for MockMagnetResolver {
    async fn resolve_magnet(&self, candidate: &RawCandidate) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(magnet) = &candidate.magnet_url {
            return Some(magnet.clone());
        }
        let url = candidate.download_url.as_deref()?;
        if url.starts_with("magnet:") {
            return Some(url.to_string());
        }
        self.redirects.read().await.get(url).cloned()
    }
}
