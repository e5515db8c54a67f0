use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::types::WatchlistEntry;

/// Key-addressed collection of monitored entries.
///
/// `all()` returns entries in pass order: oldest insertion first. Adding an
/// entry whose key already exists replaces it and moves it to the end, which
/// is exactly what remove-then-add does.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn all(&self) -> Result<Vec<WatchlistEntry>>;

    async fn add(&self, entry: WatchlistEntry) -> Result<()>;

    /// Remove the entry stored under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove-then-add. Two separate operations; a failure between them loses the entry.
    async fn replace(&self, key: &str, entry: WatchlistEntry) -> Result<()> {
        self.remove(key).await?;
        self.add(entry).await
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }
}

// ---------------------------------------------------------------------------
// MemoryWatchlist
// ---------------------------------------------------------------------------

/// In-memory store. Each entry carries an insertion sequence number so reads
/// come back in insertion order.
pub struct MemoryWatchlist {
    /// key → (sequence, entry)
    entries: DashMap<String, (u64, WatchlistEntry)>,
    next_seq: AtomicU64,
}

impl MemoryWatchlist {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
        })
    }

    pub fn with_entries(entries: impl IntoIterator<Item = WatchlistEntry>) -> Arc<Self> {
        let store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    fn insert(&self, entry: WatchlistEntry) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(entry.key().to_string(), (seq, entry));
    }

    pub fn get(&self, key: &str) -> Option<WatchlistEntry> {
        self.entries.get(key).map(|e| e.value().1.clone())
    }
}

#[async_trait]
impl WatchlistStore for MemoryWatchlist {
    async fn all(&self) -> Result<Vec<WatchlistEntry>> {
        let mut rows: Vec<(u64, WatchlistEntry)> = self
            .entries
            .iter()
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn add(&self, entry: WatchlistEntry) -> Result<()> {
        self.insert(entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}
