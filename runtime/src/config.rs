//! Engine configuration.
//!
//! Loads configuration from environment variables with defaults.

use crate::dispatcher::DispatchMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// Draw configuration
    pub draw: DrawConfig,
    /// Notification hand-off configuration
    pub notifications: NotificationConfig,
    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Draw configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Largest number of entrants a single draw may request
    pub max_draw_size: u32,
    /// Seed for reproducible draws; entropy when unset
    pub seed: Option<u64>,
}

/// Notification hand-off configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether sends are detached or awaited inline
    pub mode: DispatchMode,
    /// Per-send timeout in milliseconds
    pub timeout_ms: u64,
}

impl NotificationConfig {
    /// Per-send timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metrics host (for Prometheus scraping)
    pub host: String,
    /// Metrics port
    pub port: u16,
}

impl MetricsConfig {
    /// Socket address to expose metrics on, if host and port parse
    #[must_use]
    pub fn addr(&self) -> Option<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().ok()
    }
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            draw: DrawConfig {
                max_draw_size: 10_000,
                seed: None,
            },
            notifications: NotificationConfig {
                mode: DispatchMode::Detached,
                timeout_ms: 5_000,
            },
            metrics: MetricsConfig {
                host: "0.0.0.0".to_string(),
                port: 9090,
            },
        }
    }
}

impl LotteryConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LOTTERY_MAX_DRAW_SIZE` | `10000` |
    /// | `LOTTERY_DRAW_SEED` | unset (entropy) |
    /// | `LOTTERY_NOTIFICATION_MODE` | `detached` |
    /// | `LOTTERY_NOTIFICATION_TIMEOUT_MS` | `5000` |
    /// | `METRICS_HOST` | `0.0.0.0` |
    /// | `METRICS_PORT` | `9090` |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            draw: DrawConfig {
                max_draw_size: env::var("LOTTERY_MAX_DRAW_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|size| *size > 0)
                    .unwrap_or(defaults.draw.max_draw_size),
                seed: env::var("LOTTERY_DRAW_SEED")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            notifications: NotificationConfig {
                mode: env::var("LOTTERY_NOTIFICATION_MODE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.notifications.mode),
                timeout_ms: env::var("LOTTERY_NOTIFICATION_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.notifications.timeout_ms),
            },
            metrics: MetricsConfig {
                host: env::var("METRICS_HOST").unwrap_or(defaults.metrics.host),
                port: env::var("METRICS_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.metrics.port),
            },
        }
    }

    /// Configuration for deterministic tests: inline notifications and a fixed seed.
    #[must_use]
    pub fn for_tests(seed: u64) -> Self {
        let mut config = Self::default();
        config.draw.seed = Some(seed);
        config.notifications.mode = DispatchMode::Inline;
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LotteryConfig::default();
        assert_eq!(config.draw.max_draw_size, 10_000);
        assert_eq!(config.draw.seed, None);
        assert_eq!(config.notifications.mode, DispatchMode::Detached);
        assert_eq!(config.notifications.timeout(), Duration::from_secs(5));
        assert_eq!(config.metrics.addr(), Some("0.0.0.0:9090".parse().unwrap()));
    }

    #[test]
    fn test_for_tests_is_deterministic() {
        let config = LotteryConfig::for_tests(7);
        assert_eq!(config.draw.seed, Some(7));
        assert_eq!(config.notifications.mode, DispatchMode::Inline);
    }

    #[test]
    fn test_serde_round_trip_uses_lowercase_mode() {
        let json = serde_json::to_value(LotteryConfig::for_tests(1)).unwrap();
        assert_eq!(json["notifications"]["mode"], "inline");
        let back: LotteryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, LotteryConfig::for_tests(1));
    }
}
