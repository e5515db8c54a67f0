use std::sync::Arc;

use tracing::info;

use crate::api::health::HealthState;

/// Publishes the "watching N items" status. Fire-and-forget.
pub trait PresencePublisher: Send + Sync {
    fn publish_watch_status(&self, count: usize);
}

/// Logs the status line and exposes the count through `/health`.
pub struct StatusPresence {
    prefix: String,
    health: Arc<HealthState>,
}

impl StatusPresence {
    pub fn new(prefix: String, health: Arc<HealthState>) -> Self {
        Self { prefix, health }
    }

    pub fn status_text(&self, count: usize) -> String {
        format!("{count} items! | {}help", self.prefix)
    }
}

impl PresencePublisher for StatusPresence {
    fn publish_watch_status(&self, count: usize) {
        self.health.set_watching(count);
        info!(watching = count, "[PRESENCE] Watching {}", self.status_text(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_includes_prefix() {
        let presence = StatusPresence::new("$".to_string(), Arc::new(HealthState::new()));
        assert_eq!(presence.status_text(3), "3 items! | $help");
    }

    #[test]
    fn publishing_updates_health() {
        let health = Arc::new(HealthState::new());
        let presence = StatusPresence::new("!".to_string(), Arc::clone(&health));
        presence.publish_watch_status(7);
        assert_eq!(health.snapshot().watching, 7);
    }
}
