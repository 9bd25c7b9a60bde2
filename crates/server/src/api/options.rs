//! Configuration options offered to clients.

use std::sync::Arc;

use axum::{extract::State, Json};
use mirador_core::{ProviderDescriptor, QualityFilter, SortOrder};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SortOption {
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub providers: Vec<ProviderDescriptor>,
    pub quality_filters: Vec<QualityFilter>,
    pub sort_options: Vec<SortOption>,
}

/// GET /options
///
/// Providers come from the registry, refreshed first when stale.
pub async fn get_options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    let providers = state.resolver().registry().refresh(false).await;

    Json(OptionsResponse {
        providers: providers.as_ref().clone(),
        quality_filters: QualityFilter::ALL.to_vec(),
        sort_options: SortOrder::ALL
            .iter()
            .map(|sort| SortOption {
                key: sort.key(),
                label: sort.label(),
            })
            .collect(),
    })
}
