use crate::cache::DEFAULT_STALE_AFTER;
use crate::coalescer::{DEFAULT_QUIET_PERIOD, DEFAULT_UNLOCK_REFRESH_DELAY};
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_base_url: String,
    pub session_path: PathBuf,
    pub debounce: Duration,
    pub unlock_refresh_delay: Duration,
    pub dashboard_stale_after: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_path: PathBuf::from("data/session.json"),
            debounce: DEFAULT_QUIET_PERIOD,
            unlock_refresh_delay: DEFAULT_UNLOCK_REFRESH_DELAY,
            dashboard_stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            port: lookup("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            api_base_url: lookup("API_BASE_URL").unwrap_or(defaults.api_base_url),
            session_path: lookup("SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_path),
            debounce: millis("PROGRESS_DEBOUNCE_MS", defaults.debounce),
            unlock_refresh_delay: millis("UNLOCK_REFRESH_DELAY_MS", defaults.unlock_refresh_delay),
            dashboard_stale_after: defaults.dashboard_stale_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9090"),
            ("API_BASE_URL", "http://api.test/v1"),
            ("PROGRESS_DEBOUNCE_MS", "50"),
            ("UNLOCK_REFRESH_DELAY_MS", "soon"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.port, 9090);
        assert_eq!(config.api_base_url, "http://api.test/v1");
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.unlock_refresh_delay, DEFAULT_UNLOCK_REFRESH_DELAY);
        assert_eq!(config.session_path, PathBuf::from("data/session.json"));
    }
}
