use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, IntoConnectionInfo, RedisError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Default bound for a single Redis round trip.
pub const DEFAULT_REDIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis connection pool backed by a self-reconnecting connection manager.
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    /// Connect to `redis_url`, failing if the first connection is not
    /// established within `connect_timeout`.
    pub async fn connect(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let info = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let client = Client::open(info).context("failed to construct Redis client")?;

        let connection_manager = timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .context("timed out connecting to Redis")?
            .context("failed to initialize Redis connection manager")?;

        info!(timeout_secs = connect_timeout.as_secs(), "Redis connection manager initialized");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}

/// Clone a connection handle out of the shared manager.
///
/// The lock is released before the caller issues any command, so no lock is
/// held across a network round trip.
pub async fn connection(manager: &SharedConnectionManager) -> ConnectionManager {
    manager.lock().await.clone()
}

/// Bound a Redis operation by `duration`, surfacing elapsed time as an I/O error.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, RedisError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(RedisError::from((
            ErrorKind::IoError,
            "redis operation timed out",
        ))),
    }
}
