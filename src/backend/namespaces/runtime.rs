/**
 * System Runtime State
 *
 * Values administrators can change while the server runs, through
 * `system:update-config` and `system:maintenance-mode`. Only the keys of
 * the fixed allow-list below can be changed:
 *
 * | key                          | value                     |
 * |------------------------------|---------------------------|
 * | `rateLimit.maxEvents`        | integer in 1..=10000      |
 * | `rateLimit.windowMs`         | integer in 1000..=3600000 |
 * | `notifications.recentLimit`  | integer in 1..=100        |
 * | `features.typingIndicators`  | boolean                   |
 * | `maintenance.message`        | string, at most 500 chars |
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use crate::backend::error::BackendError;

const MAX_MAINTENANCE_MESSAGE: usize = 500;

/// A validated runtime configuration change
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    RateLimitMaxEvents(usize),
    RateLimitWindowMs(u64),
    RecentLimit(usize),
    TypingIndicators(bool),
    MaintenanceMessage(String),
}

impl ConfigUpdate {
    pub const KEYS: [&'static str; 5] = [
        "rateLimit.maxEvents",
        "rateLimit.windowMs",
        "notifications.recentLimit",
        "features.typingIndicators",
        "maintenance.message",
    ];

    /// Validate a key/value pair against the allow-list
    pub fn parse(key: &str, value: &serde_json::Value) -> Result<Self, BackendError> {
        match key {
            "rateLimit.maxEvents" => int_in_range(value, 1, 10_000)
                .map(|v| ConfigUpdate::RateLimitMaxEvents(v as usize)),
            "rateLimit.windowMs" => {
                int_in_range(value, 1_000, 3_600_000).map(ConfigUpdate::RateLimitWindowMs)
            }
            "notifications.recentLimit" => {
                int_in_range(value, 1, 100).map(|v| ConfigUpdate::RecentLimit(v as usize))
            }
            "features.typingIndicators" => value
                .as_bool()
                .map(ConfigUpdate::TypingIndicators)
                .ok_or_else(|| BackendError::validation("configValue", "expected a boolean")),
            "maintenance.message" => {
                let text = value
                    .as_str()
                    .ok_or_else(|| BackendError::validation("configValue", "expected a string"))?;
                if text.chars().count() > MAX_MAINTENANCE_MESSAGE {
                    return Err(BackendError::validation(
                        "configValue",
                        format!("must be at most {} characters", MAX_MAINTENANCE_MESSAGE),
                    ));
                }
                Ok(ConfigUpdate::MaintenanceMessage(text.to_string()))
            }
            other => Err(BackendError::validation(
                "configKey",
                format!("'{}' is not a configurable key", other),
            )),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ConfigUpdate::RateLimitMaxEvents(_) => "rateLimit.maxEvents",
            ConfigUpdate::RateLimitWindowMs(_) => "rateLimit.windowMs",
            ConfigUpdate::RecentLimit(_) => "notifications.recentLimit",
            ConfigUpdate::TypingIndicators(_) => "features.typingIndicators",
            ConfigUpdate::MaintenanceMessage(_) => "maintenance.message",
        }
    }
}

fn int_in_range(value: &serde_json::Value, min: u64, max: u64) -> Result<u64, BackendError> {
    let n = value
        .as_u64()
        .ok_or_else(|| BackendError::validation("configValue", "expected a non-negative integer"))?;
    if (min..=max).contains(&n) {
        Ok(n)
    } else {
        Err(BackendError::validation(
            "configValue",
            format!("must be between {} and {}", min, max),
        ))
    }
}

/// Current maintenance announcement
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceState {
    pub enabled: bool,
    pub reason: Option<String>,
    pub estimated_duration: Option<u64>,
    pub message: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// A restart announced through `system:restart`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRestart {
    pub reason: String,
    pub scheduled_time: DateTime<Utc>,
}

/// Snapshot of the runtime settings
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub rate_limit_max_events: Option<usize>,
    pub rate_limit_window_ms: Option<u64>,
    pub recent_limit: Option<usize>,
    pub typing_indicators: bool,
    pub maintenance_message: Option<String>,
    pub maintenance: Option<MaintenanceState>,
    pub scheduled_restart: Option<ScheduledRestart>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            rate_limit_max_events: None,
            rate_limit_window_ms: None,
            recent_limit: None,
            typing_indicators: true,
            maintenance_message: None,
            maintenance: None,
            scheduled_restart: None,
        }
    }
}

#[derive(Debug)]
pub struct SystemRuntime {
    started_at: Instant,
    settings: RwLock<RuntimeSettings>,
}

impl Default for SystemRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRuntime {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            settings: RwLock::new(RuntimeSettings::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RuntimeSettings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuntimeSettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.read().clone()
    }

    pub fn apply(&self, update: &ConfigUpdate) {
        let mut settings = self.write();
        match update {
            ConfigUpdate::RateLimitMaxEvents(v) => settings.rate_limit_max_events = Some(*v),
            ConfigUpdate::RateLimitWindowMs(v) => settings.rate_limit_window_ms = Some(*v),
            ConfigUpdate::RecentLimit(v) => settings.recent_limit = Some(*v),
            ConfigUpdate::TypingIndicators(v) => settings.typing_indicators = *v,
            ConfigUpdate::MaintenanceMessage(v) => settings.maintenance_message = Some(v.clone()),
        }
        tracing::info!("[System] Runtime config {} updated", update.key());
    }

    pub fn typing_indicators(&self) -> bool {
        self.read().typing_indicators
    }

    pub fn recent_limit(&self) -> Option<usize> {
        self.read().recent_limit
    }

    /// Record a maintenance change, filling the message from the configured default
    pub fn set_maintenance(
        &self,
        enabled: bool,
        reason: Option<String>,
        estimated_duration: Option<u64>,
    ) -> MaintenanceState {
        let mut settings = self.write();
        let state = MaintenanceState {
            enabled,
            message: settings.maintenance_message.clone(),
            reason,
            estimated_duration,
            changed_at: Utc::now(),
        };
        settings.maintenance = Some(state.clone());
        state
    }

    pub fn maintenance(&self) -> Option<MaintenanceState> {
        self.read().maintenance.clone()
    }

    pub fn schedule_restart(&self, restart: ScheduledRestart) {
        self.write().scheduled_restart = Some(restart);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_allow_list() {
        assert_eq!(
            ConfigUpdate::parse("rateLimit.maxEvents", &json!(250)).unwrap(),
            ConfigUpdate::RateLimitMaxEvents(250)
        );
        assert_eq!(
            ConfigUpdate::parse("features.typingIndicators", &json!(false)).unwrap(),
            ConfigUpdate::TypingIndicators(false)
        );
        for key in ConfigUpdate::KEYS {
            assert!(ConfigUpdate::parse(key, &json!(null)).is_err(), "{key} accepted null");
        }
    }

    #[test]
    fn test_parse_rejects_unknown_key_and_bad_values() {
        assert!(ConfigUpdate::parse("database.url", &json!("postgres://")).is_err());
        assert!(ConfigUpdate::parse("rateLimit.maxEvents", &json!(0)).is_err());
        assert!(ConfigUpdate::parse("rateLimit.windowMs", &json!(999)).is_err());
        assert!(ConfigUpdate::parse("notifications.recentLimit", &json!("20")).is_err());
        assert!(ConfigUpdate::parse("maintenance.message", &json!("x".repeat(501))).is_err());
    }

    #[test]
    fn test_apply_and_maintenance_message() {
        let runtime = SystemRuntime::new();
        assert!(runtime.typing_indicators());
        runtime.apply(&ConfigUpdate::TypingIndicators(false));
        runtime.apply(&ConfigUpdate::MaintenanceMessage("Back soon".into()));
        assert!(!runtime.typing_indicators());

        let state = runtime.set_maintenance(true, Some("upgrade".into()), Some(30));
        assert_eq!(state.message.as_deref(), Some("Back soon"));
        assert_eq!(runtime.maintenance().map(|m| m.enabled), Some(true));
    }
}
