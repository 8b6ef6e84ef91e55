/// Renewal-id revocation store
///
/// A renewal token is only honoured while its `refresh_token_id` is present
/// here. Entries carry the id of the subject they were issued to and expire
/// on their own after the refresh lifetime.
///
/// ## Backends
///
/// - **memory**: process-local map, for local runs and tests
/// - **redis**: shared across instances, TTL handled by Redis
///
/// Backend selection happens once at startup in [`build_store`]; the rest of
/// the crate only sees `Arc<dyn RevocationStore>`.
use crate::config::{RevocationBackend, Settings};
use crate::error::Result;
use crate::models::RenewalId;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryRevocationStore;
pub use self::redis::RedisRevocationStore;

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `renewal_id` as live for `subject` until `ttl` elapses
    async fn put(&self, renewal_id: &RenewalId, subject: &str, ttl: Duration) -> Result<()>;

    /// Subject the id was issued to, or `None` once revoked or expired
    async fn get(&self, renewal_id: &RenewalId) -> Result<Option<String>>;

    /// Remove the id. Deleting an absent id is not an error.
    async fn delete(&self, renewal_id: &RenewalId) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn RevocationStore>> {
    match settings.revocation.backend {
        RevocationBackend::Memory => {
            tracing::info!("Using in-memory revocation store");
            Ok(Arc::new(MemoryRevocationStore::new()))
        }
        RevocationBackend::Redis => {
            let url = settings
                .redis
                .url
                .as_deref()
                .context("REDIS_URL is required for the redis revocation backend")?;

            let pool = redis_utils::RedisPool::connect(
                url,
                Duration::from_secs(settings.redis.connection_timeout),
            )
            .await?;

            tracing::info!(
                key_prefix = %settings.revocation.key_prefix,
                "Using Redis revocation store"
            );
            Ok(Arc::new(RedisRevocationStore::new(
                pool.manager(),
                settings.revocation.key_prefix.clone(),
                Duration::from_secs(settings.redis.response_timeout),
            )))
        }
    }
}
