use std::time::Duration;

use crate::error::{AppError, Result};

pub const SOURCE_API_URL: &str = "http://127.0.0.1:8080";

/// Channel capacity for notification routing.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Per-request timeout for scraper lookups (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Backoff after a failed fetch when a proxy pool is available (milliseconds).
pub const PROXY_BACKOFF_MS: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Minutes between check passes (MINUTES_PER_CHECK, must be > 0)
    pub minutes_per_check: u64,
    /// Locale / top-level domain passed to searches (TLD)
    pub tld: String,
    /// Command prefix, only used in the presence text (PREFIX)
    pub prefix: String,
    pub log_level: String,
    /// `sqlite` (default) or `memory` for a throwaway watchlist (WATCHLIST_BACKEND)
    pub watchlist_backend: WatchlistBackend,
    pub db_path: String,
    pub api_port: u16,
    pub source_api_url: String,
    /// Proxy pool file. Its existence enables the no-wait failure path (PROXY_LIST_PATH)
    pub proxy_list_path: String,
    /// Delay after a failed fetch in seconds (FAILURE_BACKOFF_SECS)
    pub failure_backoff_secs: u64,
    /// Delay after a successful check in seconds (SUCCESS_DELAY_SECS)
    pub success_delay_secs: u64,
    /// Refuse to start a pass while the previous one is still running (SINGLE_FLIGHT)
    pub single_flight: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let minutes_per_check = var("MINUTES_PER_CHECK", "5")
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::Config("MINUTES_PER_CHECK must be a whole number of minutes".to_string()))?;
        if minutes_per_check == 0 {
            return Err(AppError::Config("MINUTES_PER_CHECK must be greater than 0".to_string()));
        }

        Ok(Self {
            minutes_per_check,
            tld: var("TLD", "com"),
            prefix: var("PREFIX", "!"),
            log_level: var("LOG_LEVEL", "info"),
            watchlist_backend: match var("WATCHLIST_BACKEND", "sqlite").trim().to_ascii_lowercase().as_str() {
                "sqlite" => WatchlistBackend::Sqlite,
                "memory" => WatchlistBackend::Memory,
                other => {
                    return Err(AppError::Config(format!(
                        "WATCHLIST_BACKEND must be `sqlite` or `memory`, got `{other}`"
                    )))
                }
            },
            db_path: var("DB_PATH", "watcher.db"),
            api_port: var("API_PORT", "3000")
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            source_api_url: var("SOURCE_API_URL", SOURCE_API_URL),
            proxy_list_path: var("PROXY_LIST_PATH", "proxylist.txt"),
            failure_backoff_secs: var("FAILURE_BACKOFF_SECS", "5").parse::<u64>().unwrap_or(5),
            success_delay_secs: var("SUCCESS_DELAY_SECS", "0").parse::<u64>().unwrap_or(0),
            single_flight: parse_bool(&var("SINGLE_FLIGHT", "true")).unwrap_or(true),
        })
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.minutes_per_check * 60)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.minutes_per_check, 5);
        assert_eq!(cfg.tld, "com");
        assert_eq!(cfg.prefix, "!");
        assert_eq!(cfg.failure_backoff_secs, 5);
        assert_eq!(cfg.success_delay_secs, 0);
        assert!(cfg.single_flight);
        assert_eq!(cfg.watchlist_backend, WatchlistBackend::Sqlite);
        assert_eq!(cfg.check_interval(), Duration::from_secs(300));
    }

    #[test]
    fn zero_minutes_is_rejected() {
        let err = Config::from_lookup(lookup(&[("MINUTES_PER_CHECK", "0")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn garbage_minutes_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("MINUTES_PER_CHECK", "soon")])).is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("WATCHLIST_BACKEND", "redis")])).is_err());
        let cfg = Config::from_lookup(lookup(&[("WATCHLIST_BACKEND", "Memory")])).unwrap();
        assert_eq!(cfg.watchlist_backend, WatchlistBackend::Memory);
    }

    #[test]
    fn single_flight_can_be_disabled() {
        let cfg = Config::from_lookup(lookup(&[("SINGLE_FLIGHT", "off"), ("TLD", "de")])).unwrap();
        assert!(!cfg.single_flight);
        assert_eq!(cfg.tld, "de");
    }
}
