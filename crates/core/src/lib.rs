pub mod cache;
pub mod coalesce;
pub mod config;
pub mod content;
pub mod filter;
pub mod metadata;
pub mod metrics;
pub mod registry;
pub mod resolver;
pub mod searcher;
pub mod store;
pub mod stream;
pub mod testing;

pub use cache::{CacheBackend, CacheError, MemoryBackend, RedisBackend, RetryPolicy, TieredCache};
pub use coalesce::{CoalesceError, RequestCoalescer};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use content::{ContentId, ContentIdError, ContentType};
pub use filter::{
    apply_filters, apply_sorting, QualityFilter, SortOrder, UserConfig, UserConfigError,
};
pub use metadata::{FallbackTitleResolver, MetadataError, TitleResolver};
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use resolver::{ResolveError, ResolverSettings, StreamRequest, StreamResolver};
pub use searcher::{HttpMagnetResolver, Indexer, LiveSearch, MagnetResolver, ProwlarrClient};
pub use store::{SqliteStreamStore, StoreError, StreamStore};
pub use stream::{ResolvedStream, StreamCandidate, StreamResponse};
