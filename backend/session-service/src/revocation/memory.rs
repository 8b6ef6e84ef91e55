//! Process-local revocation store
use super::RevocationStore;
use crate::error::{Result, SessionError};
use crate::models::RenewalId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Every this many inserts, `put` sweeps expired entries
pub const PURGE_EVERY_INSERTS: usize = 256;

#[derive(Debug, Clone)]
struct Entry {
    subject: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Renewal ids held in a concurrent map with lazy expiry
///
/// Expired entries are dropped when read, and `put` runs
/// [`purge_expired`](Self::purge_expired) every [`PURGE_EVERY_INSERTS`]
/// inserts so ids that are never read again do not pile up.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: DashMap<RenewalId, Entry>,
    inserts: AtomicUsize,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            tracing::debug!(removed, "Purged expired renewal ids");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn put(&self, renewal_id: &RenewalId, subject: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            SessionError::Configuration("renewal id TTL out of range".to_string())
        })?;

        self.entries.insert(
            renewal_id.clone(),
            Entry {
                subject: subject.to_string(),
                expires_at,
            },
        );

        let inserted = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserted % PURGE_EVERY_INSERTS == 0 {
            self.purge_expired();
        }
        Ok(())
    }

    async fn get(&self, renewal_id: &RenewalId) -> Result<Option<String>> {
        let now = Instant::now();
        match self.entries.get(renewal_id) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.subject.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        // Shard guard from `get` is released above; removing under it would deadlock
        self.entries
            .remove_if(renewal_id, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn delete(&self, renewal_id: &RenewalId) -> Result<()> {
        self.entries.remove(renewal_id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
