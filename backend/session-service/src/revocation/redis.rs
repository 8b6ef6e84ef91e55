//! Redis-backed revocation store
//!
//! One key per renewal id (`{prefix}{renewal_id}`), value is the subject id.
//! TTL is set atomically with the value so a crash between write and expire
//! can never leave an immortal entry.
use super::RevocationStore;
use crate::error::Result;
use crate::models::RenewalId;
use async_trait::async_trait;
use redis_utils::SharedConnectionManager;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisRevocationStore {
    redis: SharedConnectionManager,
    key_prefix: String,
    op_timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(redis: SharedConnectionManager, key_prefix: String, op_timeout: Duration) -> Self {
        Self {
            redis,
            key_prefix,
            op_timeout,
        }
    }

    fn key(&self, renewal_id: &RenewalId) -> String {
        format!("{}{}", self.key_prefix, renewal_id)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(&self, renewal_id: &RenewalId, subject: &str, ttl: Duration) -> Result<()> {
        let key = self.key(renewal_id);
        // PX 0 is rejected by Redis
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = redis_utils::connection(&self.redis).await;
        redis_utils::with_timeout(self.op_timeout, async {
            ::redis::cmd("SET")
                .arg(&key)
                .arg(subject)
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await?;

        tracing::debug!(ttl_ms, "Renewal id stored");
        Ok(())
    }

    async fn get(&self, renewal_id: &RenewalId) -> Result<Option<String>> {
        let key = self.key(renewal_id);

        let mut conn = redis_utils::connection(&self.redis).await;
        let subject = redis_utils::with_timeout(self.op_timeout, async {
            ::redis::cmd("GET")
                .arg(&key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
        })
        .await?;

        Ok(subject)
    }

    async fn delete(&self, renewal_id: &RenewalId) -> Result<()> {
        let key = self.key(renewal_id);

        let mut conn = redis_utils::connection(&self.redis).await;
        let removed = redis_utils::with_timeout(self.op_timeout, async {
            ::redis::cmd("DEL")
                .arg(&key)
                .query_async::<_, i64>(&mut conn)
                .await
        })
        .await?;

        if removed == 0 {
            tracing::debug!("Renewal id already absent");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
