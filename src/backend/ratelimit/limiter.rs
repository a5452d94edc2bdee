/**
 * Sliding-Window Rate Limiter
 *
 * State machine per key:
 *
 * ```text
 * Unblocked --(window count >= max_events)--> Blocked(until now + cooldown)
 * Blocked   --(cooldown elapsed)------------> Unblocked (window cleared)
 * ```
 *
 * While blocked every call is rejected, even when the sliding window has
 * emptied in the meantime.
 */
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use crate::shared::RealtimeConfig;

/// Limits applied by one limiter instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_events: usize,
    pub cooldown: Duration,
}

impl RateLimitConfig {
    /// Limits for the general namespaces
    pub fn general(config: &RealtimeConfig) -> Self {
        Self {
            window: config.rate_limit_window(),
            max_events: config.rate_limit_max_events,
            cooldown: config.rate_limit_cooldown(),
        }
    }

    /// Limits for the privileged system namespace
    pub fn privileged(config: &RealtimeConfig) -> Self {
        Self {
            max_events: config.system_rate_limit_max_events,
            ..Self::general(config)
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::general(&RealtimeConfig::default())
    }
}

/// Who a rate-limit budget belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateKey {
    Identity(Uuid),
    /// Fallback for traffic that has no identity yet
    Address(IpAddr),
}

impl RateKey {
    /// Key on the identity when there is one, else on the peer address
    pub fn for_connection(identity: Option<Uuid>, remote_addr: Option<SocketAddr>) -> Self {
        match (identity, remote_addr) {
            (Some(id), _) => RateKey::Identity(id),
            (None, Some(addr)) => RateKey::Address(addr.ip()),
            (None, None) => RateKey::Address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        }
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateKey::Identity(id) => write!(f, "user:{}", id),
            RateKey::Address(ip) => write!(f, "addr:{}", ip),
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: usize },
    Blocked { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Default)]
struct RateState {
    timestamps: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl RateState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Snapshot of limiter occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterStats {
    pub tracked_keys: usize,
    pub blocked_keys: usize,
}

/// Per-key sliding-window limiter with a hard cooldown
///
/// State is sharded per key, so admitting one identity never waits on
/// another identity's window.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    config: RwLock<RateLimitConfig>,
    clock: Arc<dyn Clock>,
    states: DashMap<RateKey, RateState>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &'static str, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            config: RwLock::new(config),
            clock,
            states: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> RateLimitConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the limits; existing windows and blocks are kept
    pub fn reconfigure(&self, config: RateLimitConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        tracing::info!(
            "[RateLimiter:{}] Reconfigured to {} events per {}ms",
            self.name,
            config.max_events,
            config.window.as_millis()
        );
    }

    /// Count one event for `key` and decide whether it may proceed
    pub fn admit(&self, key: RateKey) -> Admission {
        let config = self.config();
        let now = self.clock.now();
        let mut state = self.states.entry(key).or_default();

        if let Some(until) = state.blocked_until {
            if now < until {
                return Admission::Blocked {
                    retry_after: until - now,
                };
            }
            state.blocked_until = None;
            state.timestamps.clear();
            tracing::info!("[RateLimiter:{}] Cooldown over for {}", self.name, key);
        }

        state.prune(now, config.window);

        if state.timestamps.len() >= config.max_events {
            let until = now + config.cooldown;
            state.blocked_until = Some(until);
            tracing::warn!(
                "[RateLimiter:{}] {} exceeded {} events per {}ms, blocked for {}ms",
                self.name,
                key,
                config.max_events,
                config.window.as_millis(),
                config.cooldown.as_millis()
            );
            return Admission::Blocked {
                retry_after: config.cooldown,
            };
        }

        state.timestamps.push_back(now);
        Admission::Allowed {
            remaining: config.max_events - state.timestamps.len(),
        }
    }

    /// Whether `key` is inside a cooldown, without counting an event
    pub fn is_blocked(&self, key: RateKey) -> bool {
        let now = self.clock.now();
        self.states
            .get(&key)
            .and_then(|s| s.blocked_until)
            .is_some_and(|until| now < until)
    }

    /// Evict keys that are idle and not blocked
    ///
    /// # Returns
    /// The number of evicted keys
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window = self.config().window;
        let before = self.states.len();
        self.states.retain(|_, state| {
            if state.blocked_until.is_some_and(|until| now < until) {
                return true;
            }
            state.prune(now, window);
            !state.timestamps.is_empty()
        });
        let evicted = before.saturating_sub(self.states.len());
        if evicted > 0 {
            tracing::debug!("[RateLimiter:{}] Swept {} idle keys", self.name, evicted);
        }
        evicted
    }

    pub fn stats(&self) -> RateLimiterStats {
        let now = self.clock.now();
        RateLimiterStats {
            tracked_keys: self.states.len(),
            blocked_keys: self
                .states
                .iter()
                .filter(|s| s.blocked_until.is_some_and(|until| now < until))
                .count(),
        }
    }
}
