use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Watchlist entries
// ---------------------------------------------------------------------------

/// One monitored target. Serialized with a `type` tag so persisted records
/// keep the `{"type": "link", ...}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatchlistEntry {
    Link(LinkEntry),
    Category(CategoryEntry),
    Query(QueryEntry),
}

/// A single product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntry {
    pub link: String,
    pub last_price: f64,
    pub price_limit: f64,
    #[serde(default)]
    pub price_percentage: Option<f64>,
    #[serde(default)]
    pub difference: Option<f64>,
    pub guild_id: String,
    pub channel_id: String,
}

/// A category listing page together with the last-seen listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub link: String,
    #[serde(default)]
    pub cache: Vec<CachedListing>,
    pub price_limit: f64,
    #[serde(default)]
    pub price_percentage: Option<f64>,
    #[serde(default)]
    pub difference: Option<f64>,
    pub guild_id: String,
    pub channel_id: String,
}

/// A saved search term together with the last-seen results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntry {
    pub query: String,
    #[serde(default)]
    pub cache: Vec<CachedListing>,
    pub price_limit: f64,
    #[serde(default)]
    pub price_percentage: Option<f64>,
    #[serde(default)]
    pub difference: Option<f64>,
    pub guild_id: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Link,
    Category,
    Query,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryKind::Link => "link",
            EntryKind::Category => "category",
            EntryKind::Query => "query",
        };
        write!(f, "{s}")
    }
}

impl WatchlistEntry {
    /// Store key: the link for link/category entries, the search term for queries.
    pub fn key(&self) -> &str {
        match self {
            WatchlistEntry::Link(e) => &e.link,
            WatchlistEntry::Category(e) => &e.link,
            WatchlistEntry::Query(e) => &e.query,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            WatchlistEntry::Link(_) => EntryKind::Link,
            WatchlistEntry::Category(_) => EntryKind::Category,
            WatchlistEntry::Query(_) => EntryKind::Query,
        }
    }
}

// ---------------------------------------------------------------------------
// Fetched data
// ---------------------------------------------------------------------------

/// One listing on a category page or in search results. `asin` is the only
/// field stable across fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedListing {
    pub asin: String,
    pub last_price: f64,
    pub full_title: String,
    pub full_link: String,
    pub symbol: String,
}

/// Current state of a single product page. `price` is the raw display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    pub price: String,
    pub full_title: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPage {
    pub list: Vec<CachedListing>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Destination and thresholds copied from an entry onto each notification.
/// Zero thresholds are treated as unset.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyTarget {
    pub guild_id: String,
    pub channel_id: String,
    pub price_limit: Option<f64>,
    pub price_percentage: Option<f64>,
    pub difference: Option<f64>,
}

impl NotifyTarget {
    pub fn new(
        guild_id: &str,
        channel_id: &str,
        price_limit: f64,
        price_percentage: Option<f64>,
        difference: Option<f64>,
    ) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            price_limit: non_zero(Some(price_limit)),
            price_percentage: non_zero(price_percentage),
            difference: non_zero(difference),
        }
    }

    pub fn notification(
        &self,
        item_name: &str,
        old_price: f64,
        new_price: f64,
        link: &str,
        symbol: &str,
    ) -> Notification {
        Notification {
            item_name: item_name.to_string(),
            old_price,
            new_price,
            link: link.to_string(),
            guild_id: self.guild_id.clone(),
            channel_id: self.channel_id.clone(),
            price_limit: self.price_limit,
            price_percentage: self.price_percentage,
            difference: self.difference,
            symbol: symbol.to_string(),
        }
    }
}

fn non_zero(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x != 0.0 && !x.is_nan())
}

/// Produced by a check, handed to the dispatcher, never written back to the watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub item_name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub link: String,
    pub guild_id: String,
    pub channel_id: String,
    pub price_limit: Option<f64>,
    pub price_percentage: Option<f64>,
    pub difference: Option<f64>,
    pub symbol: String,
}
