use std::collections::HashMap;

use crate::detector::DiffOutcome;
use crate::types::{CachedListing, CategoryEntry, Notification, NotifyTarget, QueryEntry, WatchlistEntry};

/// Compare a fetched listing set against the cached one.
///
/// Only listings present on both sides (matched by `asin`) are compared;
/// listings that appeared or vanished are ignored. A matched listing whose
/// price went UP produces a notification. This is the opposite polarity of
/// the single-product check and is kept as-is.
///
/// Returns the notifications and the number of matched listings whose price moved.
pub fn diff_listings(
    cache: &[CachedListing],
    fresh: &[CachedListing],
    target: &NotifyTarget,
) -> (Vec<Notification>, usize) {
    // First cached listing wins when an asin repeats.
    let mut cached: HashMap<&str, &CachedListing> = HashMap::with_capacity(cache.len());
    for old in cache {
        cached.entry(old.asin.as_str()).or_insert(old);
    }

    let mut notifications = Vec::new();
    let mut changed = 0;

    for new in fresh {
        let Some(old) = cached.get(new.asin.as_str()) else {
            continue;
        };
        if old.last_price == new.last_price {
            continue;
        }
        changed += 1;

        if new.last_price > old.last_price {
            notifications.push(target.notification(
                &new.full_title,
                old.last_price,
                new.last_price,
                &new.full_link,
                &new.symbol,
            ));
        }
    }

    (notifications, changed)
}

/// Category page check. The replacement always carries the full fetched list.
pub fn diff_category(entry: &CategoryEntry, fresh: Vec<CachedListing>) -> DiffOutcome {
    let target = NotifyTarget::new(
        &entry.guild_id,
        &entry.channel_id,
        entry.price_limit,
        entry.price_percentage,
        entry.difference,
    );
    let (notifications, changed) = diff_listings(&entry.cache, &fresh, &target);

    DiffOutcome {
        notifications,
        replacement: Some(WatchlistEntry::Category(CategoryEntry {
            cache: fresh,
            ..entry.clone()
        })),
        changed,
    }
}

/// Saved search check. Same rules as [`diff_category`].
pub fn diff_query(entry: &QueryEntry, fresh: Vec<CachedListing>) -> DiffOutcome {
    let target = NotifyTarget::new(
        &entry.guild_id,
        &entry.channel_id,
        entry.price_limit,
        entry.price_percentage,
        entry.difference,
    );
    let (notifications, changed) = diff_listings(&entry.cache, &fresh, &target);

    DiffOutcome {
        notifications,
        replacement: Some(WatchlistEntry::Query(QueryEntry {
            cache: fresh,
            ..entry.clone()
        })),
        changed,
    }
}
