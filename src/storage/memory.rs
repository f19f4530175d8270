use super::store::KeyValueStore;

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct StoredEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-process `KeyValueStore` backed by a `DashMap`.
///
/// Expired entries are invisible to reads as soon as their deadline passes and are
/// dropped lazily on access, by `purge_expired`, or by the background sweeper.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<Vec<u8>, StoredEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Runs `purge_expired` every `interval` until the returned handle is aborted.
    pub fn spawn_expiry_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                let purged = self.purge_expired();
                if purged > 0 {
                    tracing::trace!("Expiry sweep dropped {} entries", purged);
                }
            }
        })
    }

    fn store(&self, key: &[u8], value: Vec<u8>, expires_at: Option<Instant>) {
        self.entries
            .insert(key.to_vec(), StoredEntry { value, expires_at });
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }

        Ok(None)
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.store(key, value, None);
        Ok(())
    }

    async fn put_with_expiry(&self, key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.store(key, value, Some(Instant::now() + ttl));
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }
}
