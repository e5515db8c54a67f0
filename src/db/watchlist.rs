use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::warn;

use crate::db::models::WatchlistRow;
use crate::error::Result;
use crate::state::WatchlistStore;
use crate::types::WatchlistEntry;

/// SQLite-backed watchlist. Rows come back ordered by id; `INSERT OR REPLACE`
/// deletes the old row and allocates a fresh id, so a rewritten entry moves
/// to the end.
pub struct SqliteWatchlist {
    pool: sqlx::SqlitePool,
}

impl SqliteWatchlist {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchlistStore for SqliteWatchlist {
    async fn all(&self) -> Result<Vec<WatchlistEntry>> {
        let rows: Vec<WatchlistRow> =
            sqlx::query_as("SELECT entry_key, kind, payload FROM watchlist ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<WatchlistEntry>(&row.payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    key = %row.entry_key,
                    kind = %row.kind,
                    "[STORE] skipping unreadable watchlist row: {e}"
                ),
            }
        }
        Ok(entries)
    }

    async fn add(&self, entry: WatchlistEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry)?;
        let (guild_id, channel_id) = match &entry {
            WatchlistEntry::Link(e) => (&e.guild_id, &e.channel_id),
            WatchlistEntry::Category(e) => (&e.guild_id, &e.channel_id),
            WatchlistEntry::Query(e) => (&e.guild_id, &e.channel_id),
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO watchlist (entry_key, kind, guild_id, channel_id, payload, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.key())
        .bind(entry.kind().to_string())
        .bind(guild_id)
        .bind(channel_id)
        .bind(payload)
        .bind(now_ns() as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM watchlist WHERE entry_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watchlist")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::testutil::{category_entry, link_entry, listing};

    #[tokio::test]
    async fn entries_round_trip_in_insertion_order() {
        let store = SqliteWatchlist::new(memory_pool().await);
        let cat = category_entry("https://shop/c/1", vec![listing("A1", 9.5)]);
        store.add(link_entry("https://shop/dp/1", 10.0, 8.0)).await.unwrap();
        store.add(cat.clone()).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all, vec![link_entry("https://shop/dp/1", 10.0, 8.0), cat]);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn replace_rewrites_and_moves_to_end() {
        let store = SqliteWatchlist::new(memory_pool().await);
        store.add(link_entry("a", 10.0, 8.0)).await.unwrap();
        store.add(link_entry("b", 10.0, 8.0)).await.unwrap();

        store.replace("a", link_entry("a", 7.0, 8.0)).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all, vec![link_entry("b", 10.0, 8.0), link_entry("a", 7.0, 8.0)]);
    }

    #[tokio::test]
    async fn unreadable_rows_are_skipped() {
        let pool = memory_pool().await;
        sqlx::query(
            "INSERT INTO watchlist (entry_key, kind, guild_id, channel_id, payload, created_at) VALUES ('x', 'link', 'g', 'c', '{not json', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let store = SqliteWatchlist::new(pool);
        store.add(link_entry("ok", 1.0, 1.0)).await.unwrap();

        assert_eq!(store.all().await.unwrap(), vec![link_entry("ok", 1.0, 1.0)]);
    }
}
