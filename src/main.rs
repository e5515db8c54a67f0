mod api;
mod config;
mod db;
mod detector;
mod error;
mod fetcher;
mod presence;
mod scheduler;
mod state;
mod types;
mod walker;

#[cfg(test)]
mod testutil;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, WatchlistBackend, CHANNEL_CAPACITY};
use crate::db::{DbWriter, SqliteWatchlist};
use crate::detector::DiffEngine;
use crate::error::Result;
use crate::fetcher::{HttpFetcher, SourceFetcher};
use crate::presence::{PresencePublisher, StatusPresence};
use crate::scheduler::Scheduler;
use crate::state::{MemoryWatchlist, WatchlistStore};
use crate::types::Notification;
use crate::walker::{Throttle, Walker};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    let store: Arc<dyn WatchlistStore> = match cfg.watchlist_backend {
        WatchlistBackend::Sqlite => Arc::new(SqliteWatchlist::new(pool.clone())),
        WatchlistBackend::Memory => {
            warn!("WATCHLIST_BACKEND=memory: entries are lost on restart");
            MemoryWatchlist::new()
        }
    };
    let fetcher: Arc<dyn SourceFetcher> = Arc::new(HttpFetcher::new(&cfg)?);
    if fetcher.has_alternate_path() {
        info!("Proxy pool loaded from {}: failed lookups retry without backoff", cfg.proxy_list_path);
    } else {
        info!(
            "No usable proxy list at {}: failed lookups back off {}s",
            cfg.proxy_list_path, cfg.failure_backoff_secs
        );
    }

    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let presence: Arc<dyn PresencePublisher> =
        Arc::new(StatusPresence::new(cfg.prefix.clone(), Arc::clone(&health)));

    // --- Channels ---
    let (notify_tx, notify_rx) = mpsc::channel(CHANNEL_CAPACITY);

    // --- Spawn tasks ---

    // Notification dispatcher: log + DB writer
    let pool_clone = pool.clone();
    tokio::spawn(async move {
        notification_consumer(notify_rx, pool_clone).await;
    });

    // Watchlist scheduler
    let engine = DiffEngine::new(Arc::clone(&fetcher), Arc::clone(&store), cfg.tld.clone());
    let walker = Walker::new(
        engine,
        notify_tx,
        Throttle::from_config(&cfg),
        Arc::clone(&health),
        Arc::clone(&latency),
    );
    let scheduler = Scheduler::new(
        Arc::clone(&store),
        Arc::new(walker),
        presence,
        Arc::clone(&health),
        cfg.check_interval(),
        cfg.single_flight,
    );
    info!(
        "Checking the watchlist every {} minute(s) (tld={}, single_flight={})",
        cfg.minutes_per_check, cfg.tld, cfg.single_flight
    );
    tokio::spawn(async move { scheduler.run().await });

    // HTTP API server
    let api_state = ApiState {
        pool: pool.clone(),
        store,
        health,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Consumes notifications: logs each one and hands it to the DB writer.
async fn notification_consumer(mut rx: mpsc::Receiver<Notification>, pool: sqlx::SqlitePool) {
    let db_writer_tx = {
        let (tx, writer_rx) = mpsc::channel::<Notification>(CHANNEL_CAPACITY);
        let writer = DbWriter::new(pool, writer_rx);
        tokio::spawn(async move { writer.run().await });
        tx
    };

    while let Some(notification) = rx.recv().await {
        log_notification(&notification);
        if let Err(e) = db_writer_tx.try_send(notification) {
            warn!("DB writer channel full: {e}");
        }
    }
}

fn log_notification(n: &Notification) {
    info!(
        event = "PRICE_ALERT",
        guild_id = %n.guild_id,
        channel_id = %n.channel_id,
        link = %n.link,
        old_price = n.old_price,
        new_price = n.new_price,
        "[NOTIFY] {} | {}{:.2} -> {}{:.2}",
        n.item_name, n.symbol, n.old_price, n.symbol, n.new_price,
    );
}
