use std::path::PathBuf;
use std::time::Duration;

use crate::history::DEFAULT_HISTORY_CAPACITY;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Fixed pause between a dropped stream and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1500);

/// Points shown per chart on the stats overlay.
pub const CHART_WINDOW: usize = 50;

/// Runtime configuration for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the monitoring server; `/ws`, `/report` and `/chat`
    /// hang off it.
    pub server_url: String,
    pub reconnect_delay: Duration,
    pub history_capacity: usize,
    pub chart_window: usize,
    pub settings_path: PathBuf,
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            reconnect_delay: RECONNECT_DELAY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            chart_window: CHART_WINDOW,
            settings_path: default_settings_path(),
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `RULEVISION_SERVER` and `RULEVISION_DEBUG`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("RULEVISION_SERVER") {
            if !url.trim().is_empty() {
                config.server_url = url.trim().to_string();
            }
        }

        config.debug = std::env::var("RULEVISION_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        config
    }

    /// The telemetry stream URL: the server URL with a WebSocket scheme.
    pub fn stream_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if base.starts_with("ws://") || base.starts_with("wss://") {
            base.to_string()
        } else {
            format!("ws://{base}")
        };
        format!("{base}/ws")
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_settings_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rulevision")
        .join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_server(url: &str) -> ClientConfig {
        ClientConfig {
            server_url: url.into(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn stream_url_swaps_the_scheme() {
        assert_eq!(with_server("http://localhost:8000").stream_url(), "ws://localhost:8000/ws");
        assert_eq!(with_server("https://coach.example/").stream_url(), "wss://coach.example/ws");
        assert_eq!(with_server("10.0.0.5:9000").stream_url(), "ws://10.0.0.5:9000/ws");
        assert_eq!(with_server("ws://box:1").stream_url(), "ws://box:1/ws");
    }

    #[test]
    fn endpoints_join_without_double_slashes() {
        let config = with_server("http://localhost:8000/");
        assert_eq!(config.endpoint("/report"), "http://localhost:8000/report");
        assert_eq!(config.endpoint("chat"), "http://localhost:8000/chat");
    }

    #[test]
    fn defaults_match_the_dashboard() {
        let config = ClientConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_millis(1500));
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.chart_window, 50);
        assert!(config.settings_path.ends_with("rulevision/settings.json"));
    }
}
