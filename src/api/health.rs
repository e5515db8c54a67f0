//! Shared health state for the /health endpoint.
//! Updated by the presence publisher, the walker and the notification dispatcher.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Shared health metrics. Updated by watcher components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// Entry count last published as the watch status.
    pub watching: AtomicU64,
    /// Number of check passes currently running. More than one only when
    /// single-flight is off.
    pub passes_in_flight: AtomicUsize,
    pub passes_completed: AtomicU64,
    /// Lifetime count of failed source lookups.
    pub fetch_failures: AtomicU64,
    pub notifications_sent: AtomicU64,
    /// Nanosecond timestamp of the last finished pass (0 = none).
    pub last_pass_at_ns: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub watching: u64,
    pub pass_in_progress: bool,
    pub passes_in_flight: usize,
    pub passes_completed: u64,
    pub fetch_failures: u64,
    pub notifications_sent: u64,
    pub last_pass_at_ns: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_watching(&self, count: usize) {
        self.watching.store(count as u64, Ordering::Relaxed);
    }

    pub fn pass_started(&self) {
        self.passes_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pass_finished(&self) {
        let _ = self
            .passes_in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn record_pass(&self, at_ns: u64) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        self.last_pass_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let in_flight = self.passes_in_flight.load(Ordering::Relaxed);
        HealthSnapshot {
            watching: self.watching.load(Ordering::Relaxed),
            pass_in_progress: in_flight > 0,
            passes_in_flight: in_flight,
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            last_pass_at_ns: self.last_pass_at_ns.load(Ordering::Relaxed),
        }
    }
}
