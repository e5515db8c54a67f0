//! Fakes and fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::fetcher::SourceFetcher;
use crate::presence::PresencePublisher;
use crate::types::{
    CachedListing, CategoryEntry, CategoryPage, ItemData, LinkEntry, QueryEntry, WatchlistEntry,
};

pub fn link_entry(link: &str, last_price: f64, price_limit: f64) -> WatchlistEntry {
    WatchlistEntry::Link(LinkEntry {
        link: link.to_string(),
        last_price,
        price_limit,
        price_percentage: None,
        difference: None,
        guild_id: "guild-1".to_string(),
        channel_id: "chan-1".to_string(),
    })
}

pub fn category_entry(link: &str, cache: Vec<CachedListing>) -> WatchlistEntry {
    WatchlistEntry::Category(CategoryEntry {
        link: link.to_string(),
        cache,
        price_limit: 0.0,
        price_percentage: None,
        difference: None,
        guild_id: "guild-1".to_string(),
        channel_id: "chan-2".to_string(),
    })
}

pub fn query_entry(query: &str, cache: Vec<CachedListing>) -> WatchlistEntry {
    WatchlistEntry::Query(QueryEntry {
        query: query.to_string(),
        cache,
        price_limit: 0.0,
        price_percentage: None,
        difference: None,
        guild_id: "guild-2".to_string(),
        channel_id: "chan-3".to_string(),
    })
}

pub fn listing(asin: &str, last_price: f64) -> CachedListing {
    CachedListing {
        asin: asin.to_string(),
        last_price,
        full_title: format!("Item {asin}"),
        full_link: format!("https://shop.example/dp/{asin}"),
        symbol: "$".to_string(),
    }
}

pub fn item(price: &str) -> ItemData {
    ItemData {
        price: price.to_string(),
        full_title: "Widget".to_string(),
        symbol: "$".to_string(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedFetcher
// ---------------------------------------------------------------------------

/// Answers lookups from fixed tables. Keys with no scripted answer fail.
#[derive(Default)]
pub struct ScriptedFetcher {
    items: Mutex<HashMap<String, ItemData>>,
    categories: Mutex<HashMap<String, Vec<CachedListing>>>,
    searches: Mutex<HashMap<String, Vec<CachedListing>>>,
    /// Every lookup key in call order.
    calls: Mutex<Vec<String>>,
    /// Locale passed with each search, in call order.
    search_tlds: Mutex<Vec<String>>,
    alternate_path: AtomicBool,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_item(&self, link: &str, data: ItemData) {
        self.items.lock().unwrap().insert(link.to_string(), data);
    }

    pub fn set_category(&self, link: &str, list: Vec<CachedListing>) {
        self.categories.lock().unwrap().insert(link.to_string(), list);
    }

    pub fn set_search(&self, query: &str, list: Vec<CachedListing>) {
        self.searches.lock().unwrap().insert(query.to_string(), list);
    }

    pub fn set_alternate_path(&self, v: bool) {
        self.alternate_path.store(v, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_tlds(&self) -> Vec<String> {
        self.search_tlds.lock().unwrap().clone()
    }

    fn record(&self, key: &str) {
        self.calls.lock().unwrap().push(key.to_string());
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch_item(&self, link: &str) -> Result<ItemData> {
        self.record(link);
        self.items
            .lock()
            .unwrap()
            .get(link)
            .cloned()
            .ok_or_else(|| AppError::Fetch(format!("no item scripted for {link}")))
    }

    async fn fetch_category(&self, link: &str) -> Result<CategoryPage> {
        self.record(link);
        self.categories
            .lock()
            .unwrap()
            .get(link)
            .cloned()
            .map(|list| CategoryPage { list })
            .ok_or_else(|| AppError::Fetch(format!("no category scripted for {link}")))
    }

    async fn fetch_search(&self, query: &str, tld: &str) -> Result<Vec<CachedListing>> {
        self.record(query);
        self.search_tlds.lock().unwrap().push(tld.to_string());
        self.searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| AppError::Fetch(format!("no search scripted for {query}")))
    }

    fn has_alternate_path(&self) -> bool {
        self.alternate_path.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// RecordingPresence
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPresence {
    pub published: Mutex<Vec<usize>>,
}

impl PresencePublisher for RecordingPresence {
    fn publish_watch_status(&self, count: usize) {
        self.published.lock().unwrap().push(count);
    }
}
