//! Stream candidates and their client-facing presentation.

mod candidate;
mod presentation;
mod static_links;
mod title;

pub use candidate::{sort_by_seeders_then_recency, StreamCandidate};
pub use presentation::{
    format_size, to_resolved_stream, BehaviorHints, ResolvedStream, StreamResponse,
    CACHE_MAX_AGE, STALE_ERROR_AGE, STALE_REVALIDATE_AGE,
};
pub use static_links::{is_static_url, StaticVideo};
pub use title::{binge_group, detect_languages, detect_resolution, quality_label, BRREMUX_TAG};
