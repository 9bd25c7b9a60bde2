use serde::{Deserialize, Serialize};

use crate::searcher::IndexerInfo;

/// A torrent provider offered to users in the configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub key: String,
    pub label: String,
    /// Indexer id in the aggregation service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<i64>,
    #[serde(default)]
    pub anime: bool,
    /// Flag emoji for providers serving a single foreign language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign: Option<String>,
}

impl ProviderDescriptor {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            external_id: None,
            anime: false,
            foreign: None,
        }
    }

    /// Descriptor for an indexer, keeping the flags of a known provider.
    pub fn from_indexer(indexer: &IndexerInfo) -> Self {
        let key = provider_key(&indexer.name);
        let legacy = LEGACY_PROVIDERS.iter().find(|(k, ..)| *k == key);
        Self {
            external_id: Some(indexer.id),
            anime: legacy.is_some_and(|(_, _, anime, _)| *anime),
            foreign: legacy.and_then(|(.., foreign)| foreign.map(str::to_string)),
            label: indexer.name.clone(),
            key,
        }
    }
}

/// Key of a provider name: lowercase ASCII letters and digits only.
pub fn provider_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// (key, label, anime, foreign flag)
const LEGACY_PROVIDERS: [(&str, &str, bool, Option<&str>); 22] = [
    ("yts", "YTS", false, None),
    ("eztv", "EZTV", false, None),
    ("rarbg", "RARBG", false, None),
    ("1337x", "1337x", false, None),
    ("thepiratebay", "ThePirateBay", false, None),
    ("kickasstorrents", "KickassTorrents", false, None),
    ("torrentgalaxy", "TorrentGalaxy", false, None),
    ("magnetdl", "MagnetDL", false, None),
    ("horriblesubs", "HorribleSubs", true, None),
    ("nyaasi", "NyaaSi", true, None),
    ("tokyotosho", "TokyoTosho", true, None),
    ("anidex", "AniDex", true, None),
    ("rutor", "Rutor", false, Some("🇷🇺")),
    ("rutracker", "Rutracker", false, Some("🇷🇺")),
    ("comando", "Comando", false, Some("🇵🇹")),
    ("bludv", "BluDV", false, Some("🇵🇹")),
    ("torrent9", "Torrent9", false, Some("🇫🇷")),
    ("ilcorsaronero", "ilCorSaRoNeRo", false, Some("🇮🇹")),
    ("mejortorrent", "MejorTorrent", false, Some("🇪🇸")),
    ("wolfmax4k", "Wolfmax4k", false, Some("🇪🇸")),
    ("cinecalidad", "Cinecalidad", false, Some("🇲🇽")),
    ("besttorrents", "BestTorrents", false, Some("🇵🇱")),
];

/// Built-in provider list used until the indexer has been queried.
pub fn legacy_providers() -> Vec<ProviderDescriptor> {
    LEGACY_PROVIDERS
        .iter()
        .map(|(key, label, anime, foreign)| ProviderDescriptor {
            key: key.to_string(),
            label: label.to_string(),
            external_id: None,
            anime: *anime,
            foreign: foreign.map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_key() {
        assert_eq!(provider_key("The Pirate Bay"), "thepiratebay");
        assert_eq!(provider_key("Nyaa.si"), "nyaasi");
        assert_eq!(provider_key("1337x"), "1337x");
    }

    #[test]
    fn test_from_indexer_keeps_legacy_flags() {
        let anime = ProviderDescriptor::from_indexer(&IndexerInfo {
            id: 7,
            name: "Nyaa.si".to_string(),
            enabled: true,
        });
        assert_eq!(anime.key, "nyaasi");
        assert_eq!(anime.label, "Nyaa.si");
        assert_eq!(anime.external_id, Some(7));
        assert!(anime.anime);

        let foreign = ProviderDescriptor::from_indexer(&IndexerInfo {
            id: 8,
            name: "Rutor".to_string(),
            enabled: true,
        });
        assert_eq!(foreign.foreign.as_deref(), Some("🇷🇺"));

        let unknown = ProviderDescriptor::from_indexer(&IndexerInfo {
            id: 9,
            name: "Private Tracker".to_string(),
            enabled: true,
        });
        assert!(!unknown.anime);
        assert!(unknown.foreign.is_none());
    }

    #[test]
    fn test_legacy_providers() {
        let providers = legacy_providers();
        assert_eq!(providers.len(), 22);
        assert_eq!(providers.iter().filter(|p| p.anime).count(), 4);
        assert_eq!(providers.iter().filter(|p| p.foreign.is_some()).count(), 10);
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let json = serde_json::to_value(ProviderDescriptor {
            external_id: Some(3),
            ..ProviderDescriptor::new("yts", "YTS")
        })
        .unwrap();
        assert_eq!(json["externalId"], 3);
        assert!(json.get("foreign").is_none());
    }
}
