use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::error;

use crate::error::Result;
use crate::types::Notification;

/// Receives notifications from the dispatcher and persists them to SQLite.
/// Runs as a dedicated background task so a slow write never stalls a pass.
pub struct DbWriter {
    pool: sqlx::SqlitePool,
    rx: mpsc::Receiver<Notification>,
}

impl DbWriter {
    pub fn new(pool: sqlx::SqlitePool, rx: mpsc::Receiver<Notification>) -> Self {
        Self { pool, rx }
    }

    pub async fn run(mut self) {
        while let Some(notification) = self.rx.recv().await {
            if let Err(e) = write_notification(&self.pool, &notification).await {
                error!("DB write error: {e}");
            }
        }
    }
}

pub async fn write_notification(pool: &sqlx::SqlitePool, n: &Notification) -> Result<()> {
    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64;

    sqlx::query(
        r#"
        INSERT INTO notifications (
            guild_id, channel_id, item_name, link,
            old_price, new_price, symbol,
            price_limit, price_percentage, difference,
            created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&n.guild_id)
    .bind(&n.channel_id)
    .bind(&n.item_name)
    .bind(&n.link)
    .bind(n.old_price)
    .bind(n.new_price)
    .bind(&n.symbol)
    .bind(n.price_limit)
    .bind(n.price_percentage)
    .bind(n.difference)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}
