use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{CacheBackend, CacheError};

/// Redis-backed cache storage.
///
/// The connection is opened on first use. While Redis is unreachable, calls
/// fail fast and a new attempt is made at most once per reconnect interval.
/// Once connected, the `ConnectionManager` handles reconnects itself.
pub struct RedisBackend {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    last_attempt: Mutex<Option<Instant>>,
    reconnect_interval: Duration,
    connect_timeout: Duration,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connected", &self.is_connected())
            .field("reconnect_interval", &self.reconnect_interval)
            .finish()
    }
}

impl RedisBackend {
    /// Create a backend for `redis_url` without connecting.
    ///
    /// Fails only when the URL is invalid.
    pub fn new(redis_url: &str, reconnect_interval: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            CacheError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        Ok(Self {
            client,
            conn: OnceCell::new(),
            last_attempt: Mutex::new(None),
            reconnect_interval,
            connect_timeout: Duration::from_secs(5),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    /// Try to connect now. Used at startup to report the initial state.
    pub async fn connect(&self) -> Result<(), CacheError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }

        if let Ok(mut last) = self.last_attempt.lock() {
            if let Some(at) = *last {
                if at.elapsed() < self.reconnect_interval {
                    return Err(CacheError::Unavailable(
                        "Redis unreachable, waiting to reconnect".to_string(),
                    ));
                }
            }
            *last = Some(Instant::now());
        }

        let conn = self
            .conn
            .get_or_try_init(|| async {
                info!("Connecting to Redis cache");
                match tokio::time::timeout(
                    self.connect_timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                {
                    Ok(Ok(conn)) => Ok(conn),
                    Ok(Err(e)) => Err(CacheError::Unavailable(format!(
                        "Failed to connect to Redis: {e}"
                    ))),
                    Err(_) => Err(CacheError::Timeout(self.connect_timeout)),
                }
            })
            .await;

        match conn {
            Ok(conn) => {
                info!("Connected to Redis cache");
                Ok(conn.clone())
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in_secs = self.reconnect_interval.as_secs(),
                    "Redis unavailable"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        debug!(key, "Cache GET");
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis GET failed: {e}")))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        debug!(key, ttl_secs = ttl.as_secs(), "Cache SETEX");
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Backend(format!("Redis SETEX failed: {e}")))
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        debug!(key, "Cache DEL");
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis DEL failed: {e}")))
    }
}
