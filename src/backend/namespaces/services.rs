/**
 * Service Container
 *
 * Everything a namespace controller needs, wired once at startup and cloned
 * into each controller and session. All members are cheap to clone.
 */
use std::sync::Arc;

use super::runtime::SystemRuntime;
use crate::backend::auth::{AuthGate, TokenService};
use crate::backend::permissions::{PermissionMatrix, RoleResolver};
use crate::backend::ratelimit::{Clock, RateLimitConfig, RateLimiter, SystemClock};
use crate::backend::realtime::{BroadcastRouter, ClusterFanout, LocalOnly, MembershipRegistry};
use crate::backend::store::DataStore;
use crate::shared::RealtimeConfig;

#[derive(Clone)]
pub struct Services {
    pub config: Arc<RealtimeConfig>,
    pub store: Arc<dyn DataStore>,
    pub gate: AuthGate,
    pub matrix: Arc<PermissionMatrix>,
    pub resolver: RoleResolver,
    pub registry: Arc<MembershipRegistry>,
    pub router: Arc<BroadcastRouter>,
    /// Limiter for the general namespaces
    pub limiter: Arc<RateLimiter>,
    /// Limiter for the privileged system namespace
    pub system_limiter: Arc<RateLimiter>,
    pub runtime: Arc<SystemRuntime>,
}

impl Services {
    pub fn builder(store: Arc<dyn DataStore>, tokens: Arc<dyn TokenService>) -> ServicesBuilder {
        ServicesBuilder {
            store,
            tokens,
            config: RealtimeConfig::default(),
            matrix: PermissionMatrix::default_rules(),
            clock: Arc::new(SystemClock),
            fanout: Arc::new(LocalOnly),
        }
    }
}

pub struct ServicesBuilder {
    store: Arc<dyn DataStore>,
    tokens: Arc<dyn TokenService>,
    config: RealtimeConfig,
    matrix: PermissionMatrix,
    clock: Arc<dyn Clock>,
    fanout: Arc<dyn ClusterFanout>,
}

impl ServicesBuilder {
    pub fn config(mut self, config: RealtimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn matrix(mut self, matrix: PermissionMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    /// Clock driving both rate limiters
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn fanout(mut self, fanout: Arc<dyn ClusterFanout>) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn build(self) -> Services {
        let registry = Arc::new(MembershipRegistry::new());
        let router = Arc::new(BroadcastRouter::new(
            registry.clone(),
            self.store.clone(),
            self.fanout,
        ));
        let limiter = Arc::new(RateLimiter::with_clock(
            "general",
            RateLimitConfig::general(&self.config),
            self.clock.clone(),
        ));
        let system_limiter = Arc::new(RateLimiter::with_clock(
            "system",
            RateLimitConfig::privileged(&self.config),
            self.clock,
        ));

        Services {
            gate: AuthGate::new(self.tokens, self.store.clone(), self.config.auth_timeout()),
            resolver: RoleResolver::new(self.store.clone()),
            matrix: Arc::new(self.matrix),
            config: Arc::new(self.config),
            store: self.store,
            registry,
            router,
            limiter,
            system_limiter,
            runtime: Arc::new(SystemRuntime::new()),
        }
    }
}
