//! Filter and sort stage applied to resolved streams.
//!
//! Filters run in a fixed order (provider, quality, size) over the
//! [`ResolvedStream`] list produced by the resolver, then [`apply_sorting`]
//! reorders the survivors according to the user's choice.

mod quality;
mod size;
mod sort;
mod user_config;

pub use quality::{quality_rank, QualityFilter, QualityOption};
pub use size::parse_size;
pub use sort::{apply_sorting, SortOrder};
pub use user_config::{UserConfig, UserConfigError};

use tracing::debug;

use crate::content::ContentType;
use crate::registry::ProviderDescriptor;
use crate::stream::ResolvedStream;

/// Apply the provider, quality and size filters configured by the user.
pub fn apply_filters(
    streams: Vec<ResolvedStream>,
    config: &UserConfig,
    content_type: ContentType,
    providers: &[ProviderDescriptor],
) -> Vec<ResolvedStream> {
    let before = streams.len();
    let streams = filter_by_provider(streams, config, providers);
    let streams = filter_by_quality(streams, config);
    let streams = filter_by_size(streams, config, content_type);
    if streams.len() != before {
        debug!(before, after = streams.len(), "Filtered streams");
    }
    streams
}

fn filter_by_provider(
    streams: Vec<ResolvedStream>,
    config: &UserConfig,
    providers: &[ProviderDescriptor],
) -> Vec<ResolvedStream> {
    if config.providers.is_empty() {
        return streams;
    }

    let allowed: Vec<String> = config
        .providers
        .iter()
        .cloned()
        .chain(
            providers
                .iter()
                .filter(|p| config.providers.contains(&p.key))
                .map(|p| p.label.to_lowercase()),
        )
        .collect();

    streams
        .into_iter()
        .filter(|stream| {
            let provider = stream.provider.trim().to_lowercase();
            provider.is_empty() || allowed.contains(&provider)
        })
        .collect()
}

fn filter_by_quality(streams: Vec<ResolvedStream>, config: &UserConfig) -> Vec<ResolvedStream> {
    if config.quality_filters.is_empty() {
        return streams;
    }
    streams
        .into_iter()
        .filter(|stream| {
            !config
                .quality_filters
                .iter()
                .any(|f| f.matches(stream.quality.as_deref(), stream.binge_group()))
        })
        .collect()
}

fn filter_by_size(
    streams: Vec<ResolvedStream>,
    config: &UserConfig,
    content_type: ContentType,
) -> Vec<ResolvedStream> {
    let limit = match content_type {
        ContentType::Movie => config.size_limits.first(),
        ContentType::Series => config.size_limits.last(),
    };
    match limit {
        Some(&limit) => streams
            .into_iter()
            .filter(|stream| stream.size_bytes <= limit)
            .collect(),
        None => streams,
    }
}
