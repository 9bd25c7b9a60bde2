use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Indexer section, when present, has a URL and an API key
/// - Timeouts, concurrency limits and the memory cache size are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Some(indexer) = &config.indexer {
        if indexer.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "indexer.url cannot be empty".to_string(),
            ));
        }
        if indexer.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "indexer.api_key cannot be empty".to_string(),
            ));
        }
        if indexer.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "indexer.timeout_secs cannot be 0".to_string(),
            ));
        }
        if indexer.parallel_requests == 0 {
            return Err(ConfigError::ValidationError(
                "indexer.parallel_requests cannot be 0".to_string(),
            ));
        }
    }

    if config.cache.operation_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "cache.operation_timeout_ms cannot be 0".to_string(),
        ));
    }
    if config.cache.memory_max_entries == 0 {
        return Err(ConfigError::ValidationError(
            "cache.memory_max_entries cannot be 0".to_string(),
        ));
    }

    if config.resolver.search_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "resolver.search_timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.resolver.max_concurrent_searches == 0 {
        return Err(ConfigError::ValidationError(
            "resolver.max_concurrent_searches cannot be 0".to_string(),
        ));
    }
    if config.metadata.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "metadata.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.registry.refresh_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "registry.refresh_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
