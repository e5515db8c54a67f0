pub mod link;
pub mod listing;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{AppError, Result};
use crate::fetcher::SourceFetcher;
use crate::state::WatchlistStore;
use crate::types::{Notification, WatchlistEntry};

pub use link::diff_link;
pub use listing::{diff_category, diff_query};

/// Result of diffing one entry against fresh data.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    pub notifications: Vec<Notification>,
    /// Record to write back under the entry's key. `None` leaves the store alone.
    pub replacement: Option<WatchlistEntry>,
    /// Number of compared prices that moved.
    pub changed: usize,
}

/// What happened to one entry during a pass.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Fresh data was fetched and the store updated. The list may be empty.
    Checked {
        notifications: Vec<Notification>,
        fetch_elapsed: Duration,
    },
    /// The source lookup failed. The stored entry was not touched.
    FetchFailed(AppError),
}

/// Runs the fetch → diff → replace cycle for a single entry.
pub struct DiffEngine {
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<dyn WatchlistStore>,
    tld: String,
}

impl DiffEngine {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, store: Arc<dyn WatchlistStore>, tld: String) -> Self {
        Self { fetcher, store, tld }
    }

    pub fn fetcher(&self) -> &Arc<dyn SourceFetcher> {
        &self.fetcher
    }

    /// Fetch fresh data for `entry`, diff it and write the replacement record.
    ///
    /// Fetch errors are reported as [`CheckOutcome::FetchFailed`]; store errors
    /// are returned as `Err` and are meant to stop the pass.
    pub async fn check(&self, entry: &WatchlistEntry) -> Result<CheckOutcome> {
        let started = Instant::now();
        let fetched = match entry {
            WatchlistEntry::Link(e) => self
                .fetcher
                .fetch_item(&e.link)
                .await
                .map(|data| diff_link(e, &data)),
            WatchlistEntry::Category(e) => self
                .fetcher
                .fetch_category(&e.link)
                .await
                .map(|page| diff_category(e, page.list)),
            WatchlistEntry::Query(e) => self
                .fetcher
                .fetch_search(&e.query, &self.tld)
                .await
                .map(|list| diff_query(e, list)),
        };
        let fetch_elapsed = started.elapsed();

        let outcome = match fetched {
            Ok(outcome) => outcome,
            Err(e) => return Ok(CheckOutcome::FetchFailed(e)),
        };

        debug!(
            key = %entry.key(),
            kind = %entry.kind(),
            changed = outcome.changed,
            notifications = outcome.notifications.len(),
            "{} item(s) changed",
            outcome.changed,
        );

        if let Some(replacement) = outcome.replacement {
            self.store.replace(entry.key(), replacement).await?;
        }

        Ok(CheckOutcome::Checked {
            notifications: outcome.notifications,
            fetch_elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryWatchlist;
    use crate::testutil::{category_entry, item, link_entry, listing, query_entry, ScriptedFetcher};

    fn engine(fetcher: Arc<ScriptedFetcher>, store: Arc<MemoryWatchlist>) -> DiffEngine {
        DiffEngine::new(fetcher, store, "com".to_string())
    }

    fn notifications(outcome: CheckOutcome) -> Vec<Notification> {
        match outcome {
            CheckOutcome::Checked { notifications, .. } => notifications,
            CheckOutcome::FetchFailed(e) => panic!("unexpected fetch failure: {e}"),
        }
    }

    #[tokio::test]
    async fn link_check_stores_latest_price_even_without_notification() {
        let entry = link_entry("L1", 100.0, 90.0);
        let store = MemoryWatchlist::with_entries([entry.clone()]);
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_item("L1", item("95"));

        let out = engine(fetcher, Arc::clone(&store)).check(&entry).await.unwrap();

        assert!(notifications(out).is_empty());
        assert_eq!(store.get("L1"), Some(link_entry("L1", 95.0, 90.0)));
    }

    #[tokio::test]
    async fn category_check_always_rewrites_the_entry() {
        let cache = vec![listing("A1", 50.0)];
        let entry = category_entry("C1", cache.clone());
        let store = MemoryWatchlist::with_entries([entry.clone(), link_entry("L1", 1.0, 1.0)]);
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_category("C1", cache.clone());

        let out = engine(fetcher, Arc::clone(&store)).check(&entry).await.unwrap();

        assert!(notifications(out).is_empty());
        // Remove-then-add moves the rewritten entry behind L1.
        let keys: Vec<String> = store.all().await.unwrap().iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, ["L1", "C1"]);
    }

    #[tokio::test]
    async fn query_check_uses_search_and_notifies_on_increase() {
        let entry = query_entry("usb hub", vec![listing("A1", 20.0)]);
        let store = MemoryWatchlist::with_entries([entry.clone()]);
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_search("usb hub", vec![listing("A1", 25.0), listing("A9", 3.0)]);

        let out = engine(Arc::clone(&fetcher), Arc::clone(&store)).check(&entry).await.unwrap();

        let sent = notifications(out);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].new_price, 25.0);
        assert_eq!(fetcher.calls(), ["usb hub"]);
        assert_eq!(
            store.get("usb hub"),
            Some(query_entry("usb hub", vec![listing("A1", 25.0), listing("A9", 3.0)]))
        );
    }

    #[tokio::test]
    async fn query_check_passes_configured_tld_to_search() {
        let entry = query_entry("usb hub", Vec::new());
        let store = MemoryWatchlist::with_entries([entry.clone()]);
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.set_search("usb hub", vec![listing("A1", 25.0)]);
        let engine = DiffEngine::new(Arc::clone(&fetcher) as Arc<dyn SourceFetcher>, store, "de".to_string());

        engine.check(&entry).await.unwrap();

        assert_eq!(fetcher.search_tlds(), ["de"]);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_store_untouched() {
        let entry = link_entry("L1", 100.0, 90.0);
        let store = MemoryWatchlist::with_entries([entry.clone()]);
        let fetcher = Arc::new(ScriptedFetcher::new());

        let out = engine(fetcher, Arc::clone(&store)).check(&entry).await.unwrap();

        assert!(matches!(out, CheckOutcome::FetchFailed(AppError::Fetch(_))));
        assert_eq!(store.get("L1"), Some(entry));
    }
}
