use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Indexer aggregation service. Absent = store-only mode.
    #[serde(default)]
    pub indexer: Option<IndexerConfig>,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Accepted `apikey` values for stream requests. Empty = open access.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_keys: Vec::new(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    7000
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mirador.db")
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// When false every cache operation is a pass-through.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Redis connection URL. Absent = in-process memory cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    /// Retries for the played/availability tiers.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound on a single backend call; a slower call counts as a failure.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Key limit of the in-process backend.
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,
    /// Minimum pause between Redis connection attempts while it is unreachable.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
            memory_max_entries: default_memory_max_entries(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_operation_timeout_ms() -> u64 {
    500
}

fn default_memory_max_entries() -> u64 {
    100_000
}

fn default_reconnect_interval_secs() -> u64 {
    5
}

/// Prowlarr indexer aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    /// Prowlarr server URL (e.g., "http://localhost:9696")
    #[serde(default = "default_indexer_url")]
    pub url: String,
    /// Prowlarr API key
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum raw results requested per search (default: 100)
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Magnet resolutions run concurrently per batch (default: 10)
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: usize,
}

fn default_indexer_url() -> String {
    "http://localhost:9696".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_search_limit() -> u32 {
    100
}

fn default_parallel_requests() -> usize {
    10
}

/// Title lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    /// IMDb suggestion endpoint base URL.
    #[serde(default = "default_imdb_suggest_url")]
    pub imdb_suggest_url: String,
    /// OMDb API key; the OMDb fallback is skipped without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omdb_api_key: Option<String>,
    /// OMDb base URL.
    #[serde(default = "default_omdb_url")]
    pub omdb_url: String,
    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            imdb_suggest_url: default_imdb_suggest_url(),
            omdb_api_key: None,
            omdb_url: default_omdb_url(),
            timeout_secs: default_metadata_timeout(),
        }
    }
}

fn default_imdb_suggest_url() -> String {
    "https://sg.media-imdb.com/suggests".to_string()
}

fn default_omdb_url() -> String {
    "http://www.omdbapi.com".to_string()
}

fn default_metadata_timeout() -> u32 {
    10
}

/// Stream resolution tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Stored results at or above this count skip the live search.
    #[serde(default = "default_min_store_results")]
    pub min_store_results: usize,
    /// How long a request waits on the live search.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    /// Live searches allowed to run at the same time.
    #[serde(default = "default_max_concurrent_searches")]
    pub max_concurrent_searches: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_store_results: default_min_store_results(),
            search_timeout_secs: default_search_timeout(),
            max_concurrent_searches: default_max_concurrent_searches(),
        }
    }
}

fn default_min_store_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_concurrent_searches() -> usize {
    30
}

/// Provider registry refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Freshness window and background refresh period.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    300
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub database: DatabaseConfig,
    pub cache: SanitizedCacheConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexer: Option<SanitizedIndexerConfig>,
    pub metadata: SanitizedMetadataConfig,
    pub resolver: ResolverConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_keys_configured: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCacheConfig {
    pub enabled: bool,
    pub backend: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub operation_timeout_ms: u64,
}

/// Sanitized Prowlarr config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIndexerConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub search_limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMetadataConfig {
    pub imdb_suggest_url: String,
    pub omdb_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let backend = match (config.cache.enabled, &config.cache.redis_url) {
            (false, _) => "disabled",
            (true, Some(_)) => "redis",
            (true, None) => "memory",
        };
        Self {
            server: SanitizedServerConfig {
                host: config.server.host,
                port: config.server.port,
                api_keys_configured: config.server.api_keys.len(),
            },
            database: config.database.clone(),
            cache: SanitizedCacheConfig {
                enabled: config.cache.enabled,
                backend: backend.to_string(),
                max_retries: config.cache.max_retries,
                retry_delay_ms: config.cache.retry_delay_ms,
                operation_timeout_ms: config.cache.operation_timeout_ms,
            },
            indexer: config.indexer.as_ref().map(|i| SanitizedIndexerConfig {
                url: i.url.clone(),
                api_key_configured: !i.api_key.is_empty(),
                timeout_secs: i.timeout_secs,
                search_limit: i.search_limit,
            }),
            metadata: SanitizedMetadataConfig {
                imdb_suggest_url: config.metadata.imdb_suggest_url.clone(),
                omdb_configured: config
                    .metadata
                    .omdb_api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            resolver: config.resolver.clone(),
            registry: config.registry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.server.api_keys.is_empty());
        assert_eq!(config.database.path.to_str().unwrap(), "mirador.db");
        assert!(config.cache.enabled);
        assert!(config.cache.redis_url.is_none());
        assert_eq!(config.cache.max_retries, 3);
        assert_eq!(config.cache.retry_delay_ms, 1000);
        assert!(config.indexer.is_none());
        assert_eq!(config.resolver.min_store_results, 5);
        assert_eq!(config.resolver.search_timeout_secs, 30);
        assert_eq!(config.resolver.max_concurrent_searches, 30);
        assert_eq!(config.registry.refresh_interval_secs, 300);
    }

    #[test]
    fn test_deserialize_with_indexer_config() {
        let toml = r#"
[indexer]
url = "http://prowlarr:9696"
api_key = "test-api-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let indexer = config.indexer.as_ref().unwrap();
        assert_eq!(indexer.url, "http://prowlarr:9696");
        assert_eq!(indexer.api_key, "test-api-key");
        assert_eq!(indexer.timeout_secs, 30);
        assert_eq!(indexer.search_limit, 100);
        assert_eq!(indexer.parallel_requests, 10);
    }

    #[test]
    fn test_deserialize_indexer_without_api_key_fails() {
        let toml = r#"
[indexer]
url = "http://prowlarr:9696"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_with_redis_cache() {
        let toml = r#"
[cache]
redis_url = "redis://localhost:6379"
max_retries = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.cache.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
        assert_eq!(config.cache.max_retries, 5);
        assert_eq!(config.cache.retry_delay_ms, 1000);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = Config::default();
        config.server.api_keys = vec!["k1".to_string(), "k2".to_string()];
        config.indexer = Some(IndexerConfig {
            url: "http://localhost:9696".to_string(),
            api_key: "secret-key".to_string(),
            timeout_secs: 60,
            search_limit: 50,
            parallel_requests: 10,
        });
        config.metadata.omdb_api_key = Some("omdb-secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.server.api_keys_configured, 2);
        assert_eq!(sanitized.cache.backend, "memory");
        let indexer = sanitized.indexer.as_ref().unwrap();
        assert!(indexer.api_key_configured);
        assert_eq!(indexer.timeout_secs, 60);
        assert!(sanitized.metadata.omdb_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
        assert!(!json.contains("omdb-secret"));
        assert!(!json.contains("k1"));
    }

    #[test]
    fn test_sanitized_cache_backend_names() {
        let mut config = Config::default();
        config.cache.redis_url = Some("redis://cache:6379".to_string());
        assert_eq!(SanitizedConfig::from(&config).cache.backend, "redis");

        config.cache.enabled = false;
        assert_eq!(SanitizedConfig::from(&config).cache.backend, "disabled");
    }
}
