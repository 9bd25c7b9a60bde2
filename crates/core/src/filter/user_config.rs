//! Per-request user configuration carried in the URL.
//!
//! The configuration segment looks like
//! `providers=yts,eztv|qualityfilter=cam,scr|sizefilter=2GB,1GB|sort=seeders`.

use thiserror::Error;
use tracing::debug;

use super::quality::QualityFilter;
use super::size::parse_size;
use super::sort::SortOrder;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserConfigError {
    #[error("invalid size filter: {0}")]
    InvalidSize(String),

    #[error("unknown sort option: {0}")]
    UnknownSort(String),
}

/// Parsed user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserConfig {
    /// Allowed provider keys, lowercased. Empty allows every provider.
    pub providers: Vec<String>,
    /// Excluded quality classes.
    pub quality_filters: Vec<QualityFilter>,
    /// Size limits in bytes: the first applies to movies, the last to series.
    pub size_limits: Vec<u64>,
    pub sort: Option<SortOrder>,
    pub api_key: Option<String>,
}

fn split_list(value: &str, uppercase: bool) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            if uppercase {
                v.to_uppercase()
            } else {
                v.to_lowercase()
            }
        })
        .collect()
}

impl UserConfig {
    /// Parse a configuration segment. An empty segment yields the defaults.
    pub fn parse(segment: &str) -> Result<Self, UserConfigError> {
        let mut config = UserConfig::default();

        for pair in segment.split('|').filter(|p| !p.is_empty()) {
            let parts: Vec<&str> = pair.split('=').collect();
            let [key, value] = parts.as_slice() else {
                debug!(pair, "Ignoring malformed configuration pair");
                continue;
            };

            match key.to_lowercase().as_str() {
                "providers" => config.providers = split_list(value, false),
                "qualityfilter" => {
                    config.quality_filters = split_list(value, false)
                        .iter()
                        .filter_map(|key| {
                            let filter = QualityFilter::from_key(key);
                            if filter.is_none() {
                                debug!(key = %key, "Ignoring unknown quality filter");
                            }
                            filter
                        })
                        .collect();
                }
                "sizefilter" => {
                    config.size_limits = split_list(value, true)
                        .iter()
                        .map(|size| {
                            parse_size(size)
                                .ok_or_else(|| UserConfigError::InvalidSize(size.clone()))
                        })
                        .collect::<Result<_, _>>()?;
                }
                "sort" => {
                    let key = value.trim().to_lowercase();
                    config.sort = Some(
                        SortOrder::from_key(&key).ok_or(UserConfigError::UnknownSort(key))?,
                    );
                }
                "apikey" => {
                    config.api_key = Some(value.trim().to_string()).filter(|k| !k.is_empty());
                }
                other => debug!(key = other, "Ignoring unknown configuration key"),
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_parse_empty() {
        assert_eq!(UserConfig::parse("").unwrap(), UserConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let config = UserConfig::parse(
            "providers=YTS,eztv|qualityfilter=CAM,hdrall,8k|sizefilter=2gb,1.5GB|sort=QualitySeeders|apikey=Secret",
        )
        .unwrap();
        assert_eq!(config.providers, vec!["yts", "eztv"]);
        assert_eq!(
            config.quality_filters,
            vec![QualityFilter::Cam, QualityFilter::HdrAll]
        );
        assert_eq!(config.size_limits, vec![2 * GB, GB + GB / 2]);
        assert_eq!(config.sort, Some(SortOrder::QualitySeeders));
        assert_eq!(config.api_key.as_deref(), Some("Secret"));
    }

    #[test]
    fn test_parse_ignores_unknown_and_malformed_pairs() {
        let config = UserConfig::parse("language=french|nonsense|a=b=c|sort=size").unwrap();
        assert_eq!(config.sort, Some(SortOrder::Size));
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_size() {
        assert_eq!(
            UserConfig::parse("sizefilter=huge"),
            Err(UserConfigError::InvalidSize("HUGE".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_sort() {
        assert_eq!(
            UserConfig::parse("sort=random"),
            Err(UserConfigError::UnknownSort("random".to_string()))
        );
    }
}
