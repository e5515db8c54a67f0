use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::error::Result;
use crate::presence::PresencePublisher;
use crate::state::WatchlistStore;
use crate::walker::Walker;

/// What a single tick decided.
#[derive(Debug)]
pub enum TickOutcome {
    /// The watchlist was empty.
    Idle,
    /// A previous pass is still running and single-flight is on.
    Skipped,
    /// A pass over this many entries was spawned.
    Started { entries: usize, handle: JoinHandle<()> },
}

/// Owns the check cadence: one pass per tick, at most one pass in flight
/// unless `single_flight` is off.
pub struct Scheduler {
    store: Arc<dyn WatchlistStore>,
    walker: Arc<Walker>,
    presence: Arc<dyn PresencePublisher>,
    health: Arc<HealthState>,
    period: Duration,
    single_flight: bool,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the pass task ends, panics included.
struct InFlightGuard {
    flag: Option<Arc<AtomicBool>>,
    health: Arc<HealthState>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(flag) = &self.flag {
            flag.store(false, Ordering::Release);
        }
        self.health.pass_finished();
    }
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn WatchlistStore>,
        walker: Arc<Walker>,
        presence: Arc<dyn PresencePublisher>,
        health: Arc<HealthState>,
        period: Duration,
        single_flight: bool,
    ) -> Self {
        Self {
            store,
            walker,
            presence,
            health,
            period,
            single_flight,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(self) {
        if let Err(e) = self.announce().await {
            error!("[SCHEDULER] startup watch count failed: {e}");
        }

        let mut ticker = interval(self.period);
        ticker.tick().await; // skip immediate first tick; first pass runs one period after startup

        info!(
            period_secs = self.period.as_secs(),
            single_flight = self.single_flight,
            "[SCHEDULER] started"
        );

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(TickOutcome::Started { entries, handle }) => {
                    debug!(entries, "[SCHEDULER] pass started");
                    // Detached: the pass reports its own result.
                    drop(handle);
                }
                Ok(TickOutcome::Idle) => debug!("[SCHEDULER] watchlist empty, nothing to check"),
                Ok(TickOutcome::Skipped) => {}
                Err(e) => error!("[SCHEDULER] tick failed: {e}"),
            }
        }
    }

    /// Publish the current watchlist size once.
    pub async fn announce(&self) -> Result<usize> {
        let count = self.store.len().await?;
        self.presence.publish_watch_status(count);
        Ok(count)
    }

    /// Re-read the watchlist and start a pass if there is anything to check.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let snapshot = self.store.all().await?;
        debug!(entries = snapshot.len(), "[SCHEDULER] Checking prices...");

        if snapshot.is_empty() {
            return Ok(TickOutcome::Idle);
        }

        let flag = if self.single_flight {
            if self.in_flight.swap(true, Ordering::AcqRel) {
                warn!("[SCHEDULER] previous pass still running, skipping this tick");
                return Ok(TickOutcome::Skipped);
            }
            Some(Arc::clone(&self.in_flight))
        } else {
            None
        };
        self.health.pass_started();
        let guard = InFlightGuard {
            flag,
            health: Arc::clone(&self.health),
        };

        let entries = snapshot.len();
        let walker = Arc::clone(&self.walker);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = walker.run_pass(&snapshot).await {
                error!("[PASS] aborted: {e}");
            }
        });

        Ok(TickOutcome::Started { entries, handle })
    }
}
