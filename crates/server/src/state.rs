use std::sync::Arc;

use mirador_core::{Config, SanitizedConfig, StreamResolver};

/// Shared application state
pub struct AppState {
    config: Config,
    resolver: Arc<StreamResolver>,
}

impl AppState {
    pub fn new(config: Config, resolver: Arc<StreamResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn resolver(&self) -> &StreamResolver {
        &self.resolver
    }

    /// Whether `key` may request streams. Open access when no keys are configured.
    pub fn accepts_api_key(&self, key: Option<&str>) -> bool {
        let keys = &self.config.server.api_keys;
        keys.is_empty() || key.is_some_and(|k| keys.iter().any(|allowed| allowed == k))
    }
}
