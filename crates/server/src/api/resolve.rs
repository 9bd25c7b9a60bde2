//! Playback link resolution.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mirador_core::searcher::build_magnet_link;
use mirador_core::StoreError;
use tracing::{error, info};

use super::handlers::error_response;
use crate::state::AppState;

enum LookupError {
    NotFound,
    Store(StoreError),
}

/// GET /resolve/{infoHash}/{fileIndex}
///
/// Redirects to the magnet link of a stored torrent, marks the file as played
/// and records it as available.
pub async fn resolve_stream(
    State(state): State<Arc<AppState>>,
    Path((info_hash, file_index)): Path<(String, u32)>,
) -> Response {
    let info_hash = info_hash.to_lowercase();
    let resolver = state.resolver();
    let cache = resolver.cache();
    let store = resolver.store();

    let url = cache
        .wrap_resolved_url(&format!("{info_hash}:{file_index}"), || async {
            match store.get_torrent(&info_hash) {
                Ok(Some(torrent)) => Ok(build_magnet_link(
                    &torrent.info_hash,
                    Some(&torrent.title),
                    &torrent.trackers,
                )),
                Ok(None) => Err(LookupError::NotFound),
                Err(e) => Err(LookupError::Store(e)),
            }
        })
        .await;

    match url {
        Ok(url) => {
            cache.mark_played(&info_hash, file_index).await;
            cache.cache_availability(&info_hash, &[file_index]).await;
            info!(info_hash = %info_hash, file_index, "Resolved playback link");
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        Err(LookupError::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            format!("Torrent not found: {info_hash}"),
        ),
        Err(LookupError::Store(e)) => {
            error!(info_hash = %info_hash, error = %e, "Torrent lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
