use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::LatencyStats;
use crate::db::models::NotificationRow;
use crate::error::AppError;
use crate::state::WatchlistStore;
use crate::types::WatchlistEntry;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub store: Arc<dyn WatchlistStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route(
            "/watchlist",
            get(get_watchlist).post(add_entry).delete(remove_entry),
        )
        .route("/notifications/recent", get(get_recent_notifications))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RemoveQuery {
    pub key: String,
}

#[derive(Deserialize)]
pub struct RecentNotificationsQuery {
    pub guild_id: Option<String>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}

async fn get_watchlist(
    State(state): State<ApiState>,
) -> Result<Json<Vec<WatchlistEntry>>, AppError> {
    Ok(Json(state.store.all().await?))
}

async fn add_entry(
    State(state): State<ApiState>,
    Json(entry): Json<WatchlistEntry>,
) -> Result<StatusCode, AppError> {
    if entry.key().trim().is_empty() {
        return Err(AppError::BadRequest("entry link/query must not be empty".to_string()));
    }
    info!(key = %entry.key(), kind = %entry.kind(), "[API] watchlist entry added");
    state.store.add(entry).await?;
    Ok(StatusCode::CREATED)
}

async fn remove_entry(
    State(state): State<ApiState>,
    Query(params): Query<RemoveQuery>,
) -> Result<StatusCode, AppError> {
    if params.key.trim().is_empty() {
        return Err(AppError::BadRequest("key must not be empty".to_string()));
    }
    state.store.remove(&params.key).await?;
    info!(key = %params.key, "[API] watchlist entry removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_recent_notifications(
    State(state): State<ApiState>,
    Query(params): Query<RecentNotificationsQuery>,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let rows: Vec<NotificationRow> = match &params.guild_id {
        Some(guild_id) => {
            sqlx::query_as(
                r#"
                SELECT * FROM notifications
                WHERE guild_id = ?
                ORDER BY created_at DESC
                LIMIT ?
                "#,
            )
            .bind(guild_id)
            .bind(limit)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM notifications ORDER BY created_at DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&state.pool)
                .await?
        }
    };

    Ok(Json(rows))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}
