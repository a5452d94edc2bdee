/**
 * Server Configuration
 *
 * Loads the listen port, token secret and realtime tuning knobs from the
 * environment. `.env` is read by the binary before this runs.
 *
 * # Configuration Sources
 *
 * 1. Defaults from `RealtimeConfig::default()`
 * 2. An optional TOML file named by `XFBOARD_CONFIG`
 * 3. Environment variables, which win over the file
 *
 * # Error Handling
 *
 * A malformed variable or file is logged and ignored; the server always
 * starts with a valid configuration.
 */
use std::str::FromStr;

use crate::shared::RealtimeConfig;

/// Fully resolved server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// HS256 secret; `None` falls back to the development secret
    pub jwt_secret: Option<String>,
    /// Seed a demo user, workspace and board into the in-memory store
    pub seed_demo: bool,
    pub realtime: RealtimeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            jwt_secret: None,
            seed_demo: false,
            realtime: RealtimeConfig::default(),
        }
    }
}

/// Load configuration from the process environment
pub fn load_config() -> ServerConfig {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration through `lookup`
///
/// # Arguments
/// * `lookup` - Returns the raw value of a variable, if set
pub fn load_config_from(lookup: impl Fn(&str) -> Option<String>) -> ServerConfig {
    let mut realtime = match lookup("XFBOARD_CONFIG") {
        Some(path) => read_toml(&path),
        None => RealtimeConfig::default(),
    };

    override_with(&lookup, "AUTH_TIMEOUT_MS", &mut realtime.auth_timeout_ms);
    override_with(&lookup, "RATE_LIMIT_WINDOW_MS", &mut realtime.rate_limit_window_ms);
    override_with(&lookup, "RATE_LIMIT_MAX_EVENTS", &mut realtime.rate_limit_max_events);
    override_with(
        &lookup,
        "SYSTEM_RATE_LIMIT_MAX_EVENTS",
        &mut realtime.system_rate_limit_max_events,
    );
    override_with(&lookup, "RATE_LIMIT_COOLDOWN_MS", &mut realtime.rate_limit_cooldown_ms);
    override_with(&lookup, "RATE_LIMIT_SWEEP_SECS", &mut realtime.rate_limit_sweep_secs);

    if let Err(e) = realtime.validate() {
        tracing::warn!("[Config] {}; using the default realtime configuration", e);
        realtime = RealtimeConfig::default();
    }

    let mut port = 3000u16;
    override_with(&lookup, "SERVER_PORT", &mut port);
    let mut seed_demo = false;
    override_with(&lookup, "SEED_DEMO", &mut seed_demo);

    ServerConfig {
        port,
        jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
        seed_demo,
        realtime,
    }
}

fn read_toml(path: &str) -> RealtimeConfig {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| RealtimeConfig::from_toml_str(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => {
            tracing::info!("[Config] Loaded realtime configuration from {}", path);
            config
        }
        Err(e) => {
            tracing::warn!("[Config] Ignoring {}: {}", path, e);
            RealtimeConfig::default()
        }
    }
}

fn override_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!("[Config] Invalid {}={:?}, keeping the default", key, raw),
    }
}
