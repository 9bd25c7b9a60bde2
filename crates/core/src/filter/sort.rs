use serde::Serialize;

use super::quality::quality_rank;
use crate::stream::ResolvedStream;

/// Result ordering chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Seeders,
    Size,
    QualitySeeders,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [
        SortOrder::QualitySeeders,
        SortOrder::Seeders,
        SortOrder::Size,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SortOrder::Seeders => "seeders",
            SortOrder::Size => "size",
            SortOrder::QualitySeeders => "qualityseeders",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Seeders => "By seeders",
            SortOrder::Size => "By size",
            SortOrder::QualitySeeders => "By quality then seeders",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

/// Reorder streams; `None` keeps the incoming order. The sort is stable.
pub fn apply_sorting(
    mut streams: Vec<ResolvedStream>,
    sort: Option<SortOrder>,
) -> Vec<ResolvedStream> {
    match sort {
        None => {}
        Some(SortOrder::Seeders) => streams.sort_by(|a, b| b.seeders.cmp(&a.seeders)),
        Some(SortOrder::Size) => streams.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
        Some(SortOrder::QualitySeeders) => streams.sort_by(|a, b| {
            quality_rank(b.quality.as_deref())
                .cmp(&quality_rank(a.quality.as_deref()))
                .then_with(|| b.seeders.cmp(&a.seeders))
        }),
    }
    streams
}
