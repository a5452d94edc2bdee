//! Realtime configuration module
//!
//! Provides the tuning knobs of the realtime subsystem. Values are plain
//! integers (milliseconds/seconds) so they can be read from TOML files and
//! environment variables alike; the accessor methods hand out `Duration`s.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Realtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Upper bound on the token verification at connect time
    pub auth_timeout_ms: u64,
    /// Sliding window length for event rate limiting
    pub rate_limit_window_ms: u64,
    /// Events admitted per window on general namespaces
    pub rate_limit_max_events: usize,
    /// Events admitted per window on the privileged system namespace
    pub system_rate_limit_max_events: usize,
    /// Hard block applied once the window limit is crossed
    pub rate_limit_cooldown_ms: u64,
    /// Interval of the idle rate-state sweep
    pub rate_limit_sweep_secs: u64,
    /// Lower clamp for monitoring subscriptions
    pub monitoring_min_interval_ms: u64,
    /// Upper clamp for monitoring subscriptions
    pub monitoring_max_interval_ms: u64,
    /// Delay between streamed backup progress updates
    pub backup_step_ms: u64,
    /// Default page size for `notifications:getRecent`
    pub recent_notifications_default: usize,
    /// Largest page size accepted by `notifications:getRecent`
    pub recent_notifications_max: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            auth_timeout_ms: 5_000,
            rate_limit_window_ms: 60_000,
            rate_limit_max_events: 100,
            system_rate_limit_max_events: 50,
            rate_limit_cooldown_ms: 300_000,
            rate_limit_sweep_secs: 3_600,
            monitoring_min_interval_ms: 5_000,
            monitoring_max_interval_ms: 300_000,
            backup_step_ms: 1_000,
            recent_notifications_default: 20,
            recent_notifications_max: 100,
        }
    }
}

impl RealtimeConfig {
    /// Create a new RealtimeConfigBuilder
    pub fn builder() -> RealtimeConfigBuilder {
        RealtimeConfigBuilder::default()
    }

    /// Parse a configuration from TOML, filling gaps with defaults
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("auth_timeout_ms", "must be positive".into()));
        }
        if self.rate_limit_window_ms == 0 {
            return Err(ConfigError::InvalidValue("rate_limit_window_ms", "must be positive".into()));
        }
        if self.rate_limit_max_events == 0 || self.system_rate_limit_max_events == 0 {
            return Err(ConfigError::InvalidValue("rate_limit_max_events", "must be positive".into()));
        }
        if self.rate_limit_sweep_secs == 0 {
            return Err(ConfigError::InvalidValue("rate_limit_sweep_secs", "must be positive".into()));
        }
        if self.monitoring_min_interval_ms > self.monitoring_max_interval_ms {
            return Err(ConfigError::InvalidValue(
                "monitoring_min_interval_ms",
                "must not exceed monitoring_max_interval_ms".into(),
            ));
        }
        if self.recent_notifications_default == 0
            || self.recent_notifications_default > self.recent_notifications_max
        {
            return Err(ConfigError::InvalidValue(
                "recent_notifications_default",
                "must be within 1..=recent_notifications_max".into(),
            ));
        }
        Ok(())
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }

    pub fn backup_step(&self) -> Duration {
        Duration::from_millis(self.backup_step_ms)
    }

    /// Clamp a requested monitoring interval into the configured bounds
    pub fn clamp_monitoring_interval(&self, requested_ms: u64) -> Duration {
        Duration::from_millis(
            requested_ms.clamp(self.monitoring_min_interval_ms, self.monitoring_max_interval_ms),
        )
    }
}

/// Builder for RealtimeConfig
#[derive(Debug, Default)]
pub struct RealtimeConfigBuilder {
    config: RealtimeConfig,
}

impl RealtimeConfigBuilder {
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.config.auth_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn rate_limit_window(mut self, window: Duration) -> Self {
        self.config.rate_limit_window_ms = window.as_millis() as u64;
        self
    }

    pub fn rate_limit_max_events(mut self, max_events: usize) -> Self {
        self.config.rate_limit_max_events = max_events;
        self
    }

    pub fn system_rate_limit_max_events(mut self, max_events: usize) -> Self {
        self.config.system_rate_limit_max_events = max_events;
        self
    }

    pub fn rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.rate_limit_cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn rate_limit_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.rate_limit_sweep_secs = interval.as_secs();
        self
    }

    pub fn backup_step(mut self, step: Duration) -> Self {
        self.config.backup_step_ms = step.as_millis() as u64;
        self
    }

    pub fn monitoring_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.config.monitoring_min_interval_ms = min.as_millis() as u64;
        self.config.monitoring_max_interval_ms = max.as_millis() as u64;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RealtimeConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
