/// Placeholder videos served instead of a real stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticVideo {
    Downloading,
    FailedDownload,
    FailedAccess,
    FailedRar,
    FailedTooBig,
    FailedOpening,
    FailedUnexpected,
    FailedInfringement,
    LimitsExceeded,
    BlockedAccess,
}

impl StaticVideo {
    pub const ALL: [StaticVideo; 10] = [
        StaticVideo::Downloading,
        StaticVideo::FailedDownload,
        StaticVideo::FailedAccess,
        StaticVideo::FailedRar,
        StaticVideo::FailedTooBig,
        StaticVideo::FailedOpening,
        StaticVideo::FailedUnexpected,
        StaticVideo::FailedInfringement,
        StaticVideo::LimitsExceeded,
        StaticVideo::BlockedAccess,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            StaticVideo::Downloading => "/static/videos/downloading_v2.mp4",
            StaticVideo::FailedDownload => "/static/videos/download_failed_v2.mp4",
            StaticVideo::FailedAccess => "/static/videos/failed_access_v2.mp4",
            StaticVideo::FailedRar => "/static/videos/failed_rar_v2.mp4",
            StaticVideo::FailedTooBig => "/static/videos/failed_too_big_v1.mp4",
            StaticVideo::FailedOpening => "/static/videos/failed_opening_v2.mp4",
            StaticVideo::FailedUnexpected => "/static/videos/failed_unexpected_v2.mp4",
            StaticVideo::FailedInfringement => "/static/videos/failed_infringement_v2.mp4",
            StaticVideo::LimitsExceeded => "/static/videos/limits_exceeded_v1.mp4",
            StaticVideo::BlockedAccess => "/static/videos/blocked_access_v1.mp4",
        }
    }
}

/// Whether `url` points at one of the placeholder videos.
pub fn is_static_url(url: &str) -> bool {
    StaticVideo::ALL.iter().any(|video| url.ends_with(video.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_static_url() {
        assert!(is_static_url(
            "https://addon.example/static/videos/failed_access_v2.mp4"
        ));
        assert!(is_static_url("/static/videos/blocked_access_v1.mp4"));
        assert!(!is_static_url("magnet:?xt=urn:btih:abc"));
        assert!(!is_static_url("https://cdn.example/movie.mp4"));
    }
}
