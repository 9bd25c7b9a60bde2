//! Stream list handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mirador_core::{ResolveError, StreamRequest, UserConfig};
use tracing::{debug, error};

use super::handlers::error_response;
use crate::metrics::AUTH_FAILURES_TOTAL;
use crate::state::AppState;

const JSON_SUFFIX: &str = ".json";

/// GET /stream/{type}/{id}.json
pub async fn get_streams(
    State(state): State<Arc<AppState>>,
    Path((content_type, id)): Path<(String, String)>,
) -> Response {
    respond(&state, "", &content_type, &id).await
}

/// GET /{config}/stream/{type}/{id}.json
pub async fn get_configured_streams(
    State(state): State<Arc<AppState>>,
    Path((config, content_type, id)): Path<(String, String, String)>,
) -> Response {
    respond(&state, &config, &content_type, &id).await
}

async fn respond(state: &AppState, segment: &str, content_type: &str, id: &str) -> Response {
    let Some(id) = id.strip_suffix(JSON_SUFFIX) else {
        return error_response(StatusCode::NOT_FOUND, format!("Not found: {id}"));
    };

    let config = match UserConfig::parse(segment) {
        Ok(config) => config,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if !state.accepts_api_key(config.api_key.as_deref()) {
        let reason = if config.api_key.is_some() {
            "invalid_key"
        } else {
            "missing_key"
        };
        AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
    }

    let request = match StreamRequest::from_path(content_type, id) {
        Ok(request) => request,
        Err(e) => {
            debug!(content_type, id, error = %e, "Rejected stream request");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.resolver().streams(&request, &config).await {
        Ok(response) => (
            [(header::CACHE_CONTROL, response.cache_control())],
            Json(response),
        )
            .into_response(),
        Err(e) => {
            let status = match &e {
                ResolveError::UnsupportedContent(_) => StatusCode::BAD_REQUEST,
                ResolveError::Store(_) | ResolveError::Internal(_) => {
                    error!(content_id = %request.key(), error = %e, "Stream resolution failed");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            error_response(status, e.to_string())
        }
    }
}
