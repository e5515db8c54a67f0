/// Database row types matching `migrations/0001_init.sql`.
/// Used by sqlx for typed queries.

#[derive(Debug, sqlx::FromRow)]
pub struct WatchlistRow {
    pub entry_key: String,
    pub kind: String,
    pub payload: String,
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct NotificationRow {
    pub id: i64,
    pub guild_id: String,
    pub channel_id: String,
    pub item_name: String,
    pub link: String,
    pub old_price: f64,
    pub new_price: f64,
    pub symbol: String,
    pub price_limit: Option<f64>,
    pub price_percentage: Option<f64>,
    pub difference: Option<f64>,
    pub created_at: i64,
}
