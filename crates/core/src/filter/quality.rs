use serde::Serialize;

use crate::stream::BRREMUX_TAG;

/// Quality classes a user can exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "QualityOption")]
pub enum QualityFilter {
    BrRemux,
    HdrAll,
    DolbyVision,
    DolbyVisionWithHdr,
    ThreeD,
    NonThreeD,
    UltraHd,
    FullHd,
    Hd,
    Sd,
    Other,
    Screener,
    Cam,
    Unknown,
}

/// Wire form of a filter for the options endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct QualityOption {
    pub key: &'static str,
    pub label: &'static str,
}

impl From<QualityFilter> for QualityOption {
    fn from(filter: QualityFilter) -> Self {
        Self {
            key: filter.key(),
            label: filter.label(),
        }
    }
}

const RANKED_BASES: [&str; 8] = [
    "4k", "1080p", "720p", "480p", "SCR", "CAM", "TeleSync", "TeleCine",
];
const CAM_BASES: [&str; 3] = ["CAM", "TeleSync", "TeleCine"];

impl QualityFilter {
    pub const ALL: [QualityFilter; 14] = [
        QualityFilter::BrRemux,
        QualityFilter::HdrAll,
        QualityFilter::DolbyVision,
        QualityFilter::DolbyVisionWithHdr,
        QualityFilter::ThreeD,
        QualityFilter::NonThreeD,
        QualityFilter::UltraHd,
        QualityFilter::FullHd,
        QualityFilter::Hd,
        QualityFilter::Sd,
        QualityFilter::Other,
        QualityFilter::Screener,
        QualityFilter::Cam,
        QualityFilter::Unknown,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            QualityFilter::BrRemux => "brremux",
            QualityFilter::HdrAll => "hdrall",
            QualityFilter::DolbyVision => "dolbyvision",
            QualityFilter::DolbyVisionWithHdr => "dolbyvisionwithhdr",
            QualityFilter::ThreeD => "threed",
            QualityFilter::NonThreeD => "nonthreed",
            QualityFilter::UltraHd => "4k",
            QualityFilter::FullHd => "1080p",
            QualityFilter::Hd => "720p",
            QualityFilter::Sd => "480p",
            QualityFilter::Other => "other",
            QualityFilter::Screener => "scr",
            QualityFilter::Cam => "cam",
            QualityFilter::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityFilter::BrRemux => BRREMUX_TAG,
            QualityFilter::HdrAll => "HDR/HDR10+/Dolby Vision",
            QualityFilter::DolbyVision => "Dolby Vision",
            QualityFilter::DolbyVisionWithHdr => "Dolby Vision + HDR",
            QualityFilter::ThreeD => "3D",
            QualityFilter::NonThreeD => "Non 3D (DO NOT SELECT IF NOT SURE)",
            QualityFilter::UltraHd => "4k",
            QualityFilter::FullHd => "1080p",
            QualityFilter::Hd => "720p",
            QualityFilter::Sd => "480p",
            QualityFilter::Other => "Other (DVDRip/HDRip/BDRip...)",
            QualityFilter::Screener => "Screener",
            QualityFilter::Cam => "Cam",
            QualityFilter::Unknown => "Unknown",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Whether a stream with this quality label and binge group falls in the class.
    ///
    /// Resolution classes match the bare label only, so `"1080p HDR"` is not
    /// caught by `1080p`.
    pub fn matches(&self, quality: Option<&str>, binge_group: Option<&str>) -> bool {
        let base = quality.and_then(|q| q.split(' ').next());
        let tags: Vec<&str> = quality
            .map(|q| q.split(' ').skip(1).collect())
            .unwrap_or_default();
        let has_tag = |tag: &str| tags.iter().any(|t| t.contains(tag));

        match self {
            QualityFilter::BrRemux => binge_group.is_some_and(|g| g.contains(BRREMUX_TAG)),
            QualityFilter::HdrAll => has_tag("HDR") || has_tag("DV"),
            QualityFilter::DolbyVision => tags == ["DV"],
            QualityFilter::DolbyVisionWithHdr => has_tag("DV") && has_tag("HDR"),
            QualityFilter::ThreeD => has_tag("3D"),
            QualityFilter::NonThreeD => !has_tag("3D"),
            QualityFilter::UltraHd => base == Some("4k"),
            QualityFilter::FullHd => quality == Some("1080p"),
            QualityFilter::Hd => quality == Some("720p"),
            QualityFilter::Sd => quality == Some("480p"),
            QualityFilter::Other => base.is_some_and(|b| !RANKED_BASES.contains(&b)),
            QualityFilter::Screener => quality == Some("SCR"),
            QualityFilter::Cam => quality.is_some_and(|q| CAM_BASES.contains(&q)),
            QualityFilter::Unknown => quality.is_none(),
        }
    }
}

/// Ordering weight of a quality label, higher is better.
pub fn quality_rank(quality: Option<&str>) -> i32 {
    let Some(base) = quality.and_then(|q| q.split(' ').next()) else {
        return -2;
    };
    match base {
        "4k" => 7,
        "1440p" => 6,
        "1080p" => 5,
        "720p" => 4,
        "576p" => 3,
        "480p" => 2,
        "360p" => 1,
        "SCR" | "CAM" | "TeleSync" | "TeleCine" => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded_by(filter: QualityFilter, quality: Option<&str>) -> bool {
        filter.matches(quality, None)
    }

    #[test]
    fn test_keys_round_trip() {
        for filter in QualityFilter::ALL {
            assert_eq!(QualityFilter::from_key(filter.key()), Some(filter));
        }
        assert_eq!(QualityFilter::from_key("8k"), None);
    }

    #[test]
    fn test_hdr_label_excluded_by_hdrall_not_cam() {
        assert!(excluded_by(QualityFilter::HdrAll, Some("1080p HDR")));
        assert!(!excluded_by(QualityFilter::Cam, Some("1080p HDR")));
        assert!(!excluded_by(QualityFilter::FullHd, Some("1080p HDR")));
        assert!(excluded_by(QualityFilter::HdrAll, Some("4k HDR10+")));
        assert!(excluded_by(QualityFilter::HdrAll, Some("4k DV")));
    }

    #[test]
    fn test_dolby_vision_variants() {
        assert!(excluded_by(QualityFilter::DolbyVision, Some("4k DV")));
        assert!(!excluded_by(QualityFilter::DolbyVision, Some("4k HDR DV")));
        assert!(excluded_by(QualityFilter::DolbyVisionWithHdr, Some("4k HDR DV")));
        assert!(!excluded_by(QualityFilter::DolbyVisionWithHdr, Some("4k DV")));
    }

    #[test]
    fn test_three_d() {
        assert!(excluded_by(QualityFilter::ThreeD, Some("1080p 3D")));
        assert!(!excluded_by(QualityFilter::NonThreeD, Some("1080p 3D")));
        assert!(excluded_by(QualityFilter::NonThreeD, Some("1080p")));
    }

    #[test]
    fn test_resolution_and_source_classes() {
        assert!(excluded_by(QualityFilter::UltraHd, Some("4k HDR")));
        assert!(excluded_by(QualityFilter::Hd, Some("720p")));
        assert!(excluded_by(QualityFilter::Sd, Some("480p")));
        assert!(excluded_by(QualityFilter::Other, Some("DVDRip")));
        assert!(!excluded_by(QualityFilter::Other, Some("1080p")));
        assert!(!excluded_by(QualityFilter::Other, None));
        assert!(excluded_by(QualityFilter::Screener, Some("SCR")));
        assert!(excluded_by(QualityFilter::Cam, Some("TeleSync")));
        assert!(excluded_by(QualityFilter::Unknown, None));
    }

    #[test]
    fn test_brremux_uses_binge_group() {
        assert!(QualityFilter::BrRemux.matches(Some("1080p"), Some("mirador|1080p|BluRay REMUX")));
        assert!(!QualityFilter::BrRemux.matches(Some("1080p"), Some("mirador|1080p")));
    }

    #[test]
    fn test_quality_rank() {
        assert!(quality_rank(Some("4k HDR")) > quality_rank(Some("1080p")));
        assert!(quality_rank(Some("720p")) > quality_rank(Some("WEBRip")));
        assert!(quality_rank(Some("WEBRip")) > quality_rank(Some("CAM")));
        assert!(quality_rank(Some("CAM")) > quality_rank(None));
    }
}
