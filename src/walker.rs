use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{Config, PROXY_BACKOFF_MS};
use crate::detector::{CheckOutcome, DiffEngine};
use crate::error::Result;
use crate::types::{Notification, WatchlistEntry};

/// Delays inserted between entries of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    /// After a failed fetch when no alternate fetch path exists.
    pub failure_backoff: Duration,
    /// After a failed fetch when the fetcher can rotate to another path.
    pub proxy_backoff: Duration,
    /// After a successful check.
    pub success_delay: Duration,
}

impl Throttle {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            failure_backoff: Duration::from_secs(cfg.failure_backoff_secs),
            proxy_backoff: Duration::from_millis(PROXY_BACKOFF_MS),
            success_delay: Duration::from_secs(cfg.success_delay_secs),
        }
    }

    pub fn after_failure(&self, alternate_path: bool) -> Duration {
        if alternate_path {
            self.proxy_backoff
        } else {
            self.failure_backoff
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub entries: usize,
    pub checked: usize,
    pub failed: usize,
    pub notified: usize,
}

/// Walks a watchlist snapshot one entry at a time.
pub struct Walker {
    engine: DiffEngine,
    notify_tx: mpsc::Sender<Notification>,
    throttle: Throttle,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl Walker {
    pub fn new(
        engine: DiffEngine,
        notify_tx: mpsc::Sender<Notification>,
        throttle: Throttle,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            engine,
            notify_tx,
            throttle,
            health,
            latency,
        }
    }

    /// Run one pass over `snapshot`, strictly in order.
    ///
    /// A failed lookup is logged and followed by the failure backoff; the pass
    /// moves on. A store error ends the pass early and is returned. Entries
    /// added or removed while the pass runs are not seen until the next one.
    pub async fn run_pass(&self, snapshot: &[WatchlistEntry]) -> Result<PassSummary> {
        let mut summary = PassSummary {
            entries: snapshot.len(),
            ..PassSummary::default()
        };

        let mut index = 0;
        while index < snapshot.len() {
            let entry = &snapshot[index];
            let delay = match self.engine.check(entry).await? {
                CheckOutcome::Checked {
                    notifications,
                    fetch_elapsed,
                } => {
                    self.latency.record(fetch_elapsed);
                    summary.checked += 1;
                    summary.notified += notifications.len();
                    self.dispatch(notifications).await;
                    self.throttle.success_delay
                }
                CheckOutcome::FetchFailed(e) => {
                    summary.failed += 1;
                    self.health.inc_fetch_failures();
                    warn!(
                        key = %entry.key(),
                        kind = %entry.kind(),
                        index,
                        "[PASS] fetch failed, skipping entry: {e}"
                    );
                    self.throttle
                        .after_failure(self.engine.fetcher().has_alternate_path())
                }
            };

            index += 1;
            if index < snapshot.len() && !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "[PASS] throttling before next entry");
                tokio::time::sleep(delay).await;
            }
        }

        self.health.record_pass(now_ns());
        info!(
            entries = summary.entries,
            checked = summary.checked,
            failed = summary.failed,
            notified = summary.notified,
            "[PASS] complete: {} checked, {} failed, {} notification(s)",
            summary.checked,
            summary.failed,
            summary.notified,
        );
        Ok(summary)
    }

    async fn dispatch(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if let Err(e) = self.notify_tx.send(notification).await {
                warn!("[NOTIFY] dispatcher channel closed, dropping notification: {e}");
                continue;
            }
            self.health.inc_notifications_sent();
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
