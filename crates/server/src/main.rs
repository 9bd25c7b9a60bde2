use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirador_core::{
    load_config, load_config_from_env, validate_config, CacheBackend, Config, ConfigError,
    FallbackTitleResolver, HttpMagnetResolver, Indexer, LiveSearch, MemoryBackend,
    ProviderRegistry, ProwlarrClient, RedisBackend, ResolverSettings, RetryPolicy,
    SqliteStreamStore, StreamResolver, TieredCache,
};
use mirador_server::api::create_router;
use mirador_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = read_config()?;
    validate_config(&config).context("Configuration validation failed")?;
    info!(version = VERSION, "Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    let store = Arc::new(
        SqliteStreamStore::new(&config.database.path).context("Failed to open stream store")?,
    );
    info!("Stream store initialized");

    let cache = build_cache(&config).await?;

    let titles = Arc::new(
        FallbackTitleResolver::from_config(&config.metadata)
            .context("Failed to create title resolvers")?,
    );
    info!(resolvers = titles.len(), "Title lookup initialized");

    // Live search is optional; without an indexer only stored results are served.
    let (indexer, live) = match &config.indexer {
        Some(indexer_config) => {
            info!("Initializing Prowlarr indexer at {}", indexer_config.url);
            let indexer: Arc<dyn Indexer> = Arc::new(
                ProwlarrClient::new(indexer_config.clone())
                    .context("Failed to create Prowlarr client")?,
            );
            let magnets = Arc::new(
                HttpMagnetResolver::new(Duration::from_secs(u64::from(
                    indexer_config.timeout_secs,
                )))
                .context("Failed to create magnet resolver")?,
            );
            let live = LiveSearch::new(indexer.clone(), magnets, store.clone(), indexer_config);
            (Some(indexer), Some(live))
        }
        None => {
            info!("No indexer configured, serving stored results only");
            (None, None)
        }
    };

    let refresh_interval = Duration::from_secs(config.registry.refresh_interval_secs);
    let registry = Arc::new(ProviderRegistry::new(indexer, refresh_interval));

    let resolver = Arc::new(StreamResolver::new(
        cache,
        store,
        titles,
        live,
        Arc::clone(&registry),
        ResolverSettings::from(&config.resolver),
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let refresher = registry.spawn_refresher(refresh_interval, shutdown_rx);
    info!("Provider refresher started");

    let state = Arc::new(AppState::new(config.clone(), resolver));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    let _ = shutdown_tx.send(());
    if let Err(e) = refresher.await {
        warn!("Provider refresher ended abnormally: {}", e);
    }
    info!("Provider refresher stopped");

    Ok(())
}

/// Config from `MIRADOR_CONFIG` (default `config.toml`), or from the
/// environment alone when that file does not exist.
fn read_config() -> Result<Config> {
    let config_path = std::env::var("MIRADOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    match load_config(&config_path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("No config file found, using environment and defaults");
            load_config_from_env().context("Failed to load config from environment")
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config from {:?}", config_path)),
    }
}

/// Redis when a URL is configured, otherwise the in-process backend.
///
/// An unreachable Redis at startup is not fatal: cache calls pass through
/// until a later reconnect attempt succeeds.
async fn build_cache(config: &Config) -> Result<TieredCache> {
    if !config.cache.enabled {
        info!("Cache disabled in config");
        return Ok(TieredCache::disabled());
    }

    let retry = RetryPolicy::from(&config.cache);
    let backend: Arc<dyn CacheBackend> = match &config.cache.redis_url {
        Some(url) => {
            let reconnect = Duration::from_secs(config.cache.reconnect_interval_secs);
            let redis = RedisBackend::new(url, reconnect).context("Invalid cache.redis_url")?;
            if let Err(e) = redis.connect().await {
                error!("Redis unreachable at startup, will keep retrying: {}", e);
            }
            Arc::new(redis)
        }
        None => Arc::new(MemoryBackend::with_capacity(config.cache.memory_max_entries)),
    };
    info!(backend = backend.name(), "Cache initialized");
    Ok(TieredCache::new(backend, retry)
        .with_operation_timeout(Duration::from_millis(config.cache.operation_timeout_ms)))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
