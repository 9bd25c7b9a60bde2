//! Live torrent search.
//!
//! This module provides the `Indexer` trait for querying an indexer
//! aggregation service (Prowlarr), magnet resolution for its download links,
//! and the merge step that folds fresh results into stored ones.

mod live;
mod magnet;
mod merge;
mod prowlarr;
mod types;

pub use live::LiveSearch;
pub use magnet::{build_magnet_link, extract_info_hash, extract_trackers, HttpMagnetResolver};
pub use merge::merge_by_info_hash;
pub use prowlarr::ProwlarrClient;
pub use types::*;
