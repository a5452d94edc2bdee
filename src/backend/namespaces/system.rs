/**
 * System Namespace
 *
 * Privileged administration: health and metrics, runtime configuration,
 * maintenance mode, backups, restart notices and live monitoring.
 *
 * Only global administrators may connect; every handler checks the
 * permission matrix again. Connections and events here are counted by the
 * stricter system rate limiter.
 *
 * Backup progress and monitoring samples come from tasks spawned per
 * socket. They are aborted when the socket disconnects.
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::dispatch::{authorize, parse_payload, require_text, with_actor, Effect, EventTable};
use super::runtime::{ConfigUpdate, ScheduledRestart};
use super::services::Services;
use super::{Namespace, NamespaceController};
use crate::backend::error::BackendError;
use crate::backend::permissions::{ResourceContext, Verb};
use crate::backend::ratelimit::RateLimitConfig;
use crate::backend::realtime::{ConnectionContext, DisconnectOutcome, SocketId};
use crate::shared::ServerEvent;

const METRICS: [&str; 4] = ["connections", "rooms", "rateLimits", "uptime"];
const BACKUP_STEPS: [u8; 4] = [25, 50, 75, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SystemEvent {
    HealthCheck,
    GetMetrics,
    UpdateConfig,
    MaintenanceMode,
    Backup,
    Restart,
    SubscribeMonitoring,
    UnsubscribeMonitoring,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsPayload {
    #[serde(default)]
    metrics: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateConfigPayload {
    config_key: String,
    config_value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaintenancePayload {
    enabled: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    estimated_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupPayload {
    #[serde(default = "default_backup_type")]
    backup_type: String,
    #[serde(default)]
    include_files: bool,
}

fn default_backup_type() -> String {
    "full".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestartPayload {
    reason: String,
    scheduled_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitoringPayload {
    #[serde(default)]
    interval: Option<u64>,
}

/// Background work owned by one socket
#[derive(Debug, Default)]
struct SocketTasks {
    monitoring: Option<JoinHandle<()>>,
    backups: Vec<JoinHandle<()>>,
}

impl SocketTasks {
    fn abort_all(self) {
        if let Some(task) = self.monitoring {
            task.abort();
        }
        for task in self.backups {
            task.abort();
        }
    }
}

pub struct SystemController {
    services: Services,
    events: EventTable<SystemEvent>,
    tasks: Mutex<HashMap<SocketId, SocketTasks>>,
}

impl SystemController {
    pub fn new(services: Services) -> Self {
        use SystemEvent::*;
        Self {
            services,
            events: EventTable::new(&[
                ("system:health-check", HealthCheck),
                ("system:get-metrics", GetMetrics),
                ("system:update-config", UpdateConfig),
                ("system:maintenance-mode", MaintenanceMode),
                ("system:backup", Backup),
                ("system:restart", Restart),
                ("system:subscribe-monitoring", SubscribeMonitoring),
                ("system:unsubscribe-monitoring", UnsubscribeMonitoring),
            ]),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<SocketId, SocketTasks>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of sockets that currently own background tasks
    pub fn active_task_owners(&self) -> usize {
        self.tasks().len()
    }

    async fn require(&self, ctx: &ConnectionContext, verb: Verb) -> Result<(), BackendError> {
        authorize(&self.services, ctx, ResourceContext::Global, "/system", verb).await?;
        Ok(())
    }

    fn health(&self) -> serde_json::Value {
        let stats = self.services.registry.stats();
        serde_json::json!({
            "status": if self.services.runtime.maintenance().is_some_and(|m| m.enabled) {
                "maintenance"
            } else {
                "healthy"
            },
            "uptimeSecs": self.services.runtime.uptime_secs(),
            "connections": stats.sockets,
            "rooms": stats.rooms,
        })
    }

    fn metrics(&self, names: &[String]) -> Result<serde_json::Value, BackendError> {
        let requested: Vec<&str> = if names.is_empty() {
            METRICS.to_vec()
        } else {
            names.iter().map(String::as_str).collect()
        };

        let mut out = serde_json::Map::new();
        for name in requested {
            let value = match name {
                "connections" => serde_json::json!(self.services.registry.stats()),
                "rooms" => serde_json::json!(self.services.registry.stats().rooms),
                "rateLimits" => serde_json::json!({
                    "general": self.services.limiter.stats(),
                    "system": self.services.system_limiter.stats(),
                }),
                "uptime" => serde_json::json!(self.services.runtime.uptime_secs()),
                other => {
                    return Err(BackendError::validation(
                        "metrics",
                        format!("unknown metric '{}'", other),
                    ))
                }
            };
            out.insert(name.to_string(), value);
        }
        Ok(serde_json::Value::Object(out))
    }

    async fn update_config(
        &self,
        ctx: &ConnectionContext,
        p: UpdateConfigPayload,
    ) -> Result<Vec<Effect>, BackendError> {
        let update = ConfigUpdate::parse(&p.config_key, &p.config_value)?;
        self.require(ctx, Verb::Post).await?;

        self.services.runtime.apply(&update);
        let limiter = &self.services.limiter;
        match update {
            ConfigUpdate::RateLimitMaxEvents(max_events) => limiter.reconfigure(RateLimitConfig {
                max_events,
                ..limiter.config()
            }),
            ConfigUpdate::RateLimitWindowMs(ms) => limiter.reconfigure(RateLimitConfig {
                window: Duration::from_millis(ms),
                ..limiter.config()
            }),
            _ => {}
        }
        tracing::info!(
            "[System] User {} set {} = {}",
            ctx.user_id(),
            p.config_key,
            p.config_value
        );

        Ok(vec![Effect::reply(
            "system:config-updated",
            with_actor(
                ctx,
                serde_json::json!({
                    "configKey": p.config_key,
                    "configValue": p.config_value,
                    "settings": self.services.runtime.settings(),
                }),
            ),
        )])
    }

    async fn maintenance(
        &self,
        ctx: &ConnectionContext,
        p: MaintenancePayload,
    ) -> Result<Vec<Effect>, BackendError> {
        self.require(ctx, Verb::Post).await?;
        let state = self
            .services
            .runtime
            .set_maintenance(p.enabled, p.reason, p.estimated_duration);
        tracing::warn!(
            "[System] Maintenance {} by user {}",
            if state.enabled { "enabled" } else { "disabled" },
            ctx.user_id()
        );

        let data = serde_json::to_value(&state)?;
        Ok(vec![
            Effect::reply("system:maintenance-updated", with_actor(ctx, data.clone())),
            Effect::ToNamespace(Namespace::Root, ServerEvent::new("system:maintenance", data)),
        ])
    }

    async fn backup(&self, ctx: &ConnectionContext, p: BackupPayload) -> Result<Vec<Effect>, BackendError> {
        let backup_type = require_text("backupType", &p.backup_type, 32)?;
        self.require(ctx, Verb::Post).await?;

        let job_id = Uuid::new_v4();
        let socket = ctx.socket_id;
        let router = self.services.router.clone();
        let step = self.services.config.backup_step();
        let started_at = Utc::now();
        let include_files = p.include_files;
        let kind = backup_type.clone();

        let task = tokio::spawn(async move {
            for progress in BACKUP_STEPS {
                tokio::time::sleep(step).await;
                router.emit_to_socket(
                    socket,
                    ServerEvent::new(
                        "system:backup-progress",
                        serde_json::json!({ "jobId": job_id, "progress": progress }),
                    ),
                );
            }
            router.emit_to_socket(
                socket,
                ServerEvent::new(
                    "system:backup-completed",
                    serde_json::json!({
                        "jobId": job_id,
                        "backupType": kind,
                        "includeFiles": include_files,
                        "startedAt": started_at,
                        "completedAt": Utc::now(),
                    }),
                ),
            );
            tracing::info!("[System] Backup {} completed", job_id);
        });

        {
            let mut tasks = self.tasks();
            let owned = tasks.entry(socket).or_default();
            owned.backups.retain(|t| !t.is_finished());
            owned.backups.push(task);
        }
        tracing::info!("[System] Backup {} ({}) started by user {}", job_id, backup_type, ctx.user_id());

        Ok(vec![Effect::reply(
            "system:backup-started",
            with_actor(
                ctx,
                serde_json::json!({
                    "jobId": job_id,
                    "backupType": backup_type,
                    "includeFiles": p.include_files,
                }),
            ),
        )])
    }

    async fn restart(&self, ctx: &ConnectionContext, p: RestartPayload) -> Result<Vec<Effect>, BackendError> {
        let reason = require_text("reason", &p.reason, 500)?;
        let scheduled_time = DateTime::parse_from_rfc3339(&p.scheduled_time)
            .map_err(|e| BackendError::validation("scheduledTime", e.to_string()))?
            .with_timezone(&Utc);
        if scheduled_time <= Utc::now() {
            return Err(BackendError::validation("scheduledTime", "must be in the future"));
        }
        self.require(ctx, Verb::Post).await?;

        let restart = ScheduledRestart {
            reason,
            scheduled_time,
        };
        self.services.runtime.schedule_restart(restart.clone());
        tracing::warn!(
            "[System] Restart scheduled for {} by user {}",
            scheduled_time,
            ctx.user_id()
        );

        let data = serde_json::to_value(&restart)?;
        Ok(vec![
            Effect::reply("system:restart-scheduled", with_actor(ctx, data.clone())),
            Effect::ToNamespace(Namespace::Root, ServerEvent::new("system:restart-notice", data)),
        ])
    }

    async fn subscribe_monitoring(
        &self,
        ctx: &ConnectionContext,
        p: MonitoringPayload,
    ) -> Result<Vec<Effect>, BackendError> {
        self.require(ctx, Verb::Get).await?;
        let config = &self.services.config;
        let interval = config.clamp_monitoring_interval(p.interval.unwrap_or(config.monitoring_min_interval_ms));

        let socket = ctx.socket_id;
        let services = self.services.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let sample = serde_json::json!({
                    "registry": services.registry.stats(),
                    "rateLimits": {
                        "general": services.limiter.stats(),
                        "system": services.system_limiter.stats(),
                    },
                    "uptimeSecs": services.runtime.uptime_secs(),
                    "timestamp": Utc::now(),
                });
                if !services
                    .router
                    .emit_to_socket(socket, ServerEvent::new("system:monitoring-data", sample))
                {
                    break;
                }
            }
        });

        let previous = self.tasks().entry(socket).or_default().monitoring.replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::info!(
            "[System] User {} monitoring every {}ms",
            ctx.user_id(),
            interval.as_millis()
        );

        Ok(vec![Effect::reply(
            "system:monitoring-subscribed",
            serde_json::json!({ "interval": interval.as_millis() as u64 }),
        )])
    }

    async fn unsubscribe_monitoring(&self, ctx: &ConnectionContext) -> Result<Vec<Effect>, BackendError> {
        self.require(ctx, Verb::Get).await?;
        let stopped = self
            .tasks()
            .get_mut(&ctx.socket_id)
            .and_then(|owned| owned.monitoring.take())
            .map(|task| task.abort())
            .is_some();
        Ok(vec![Effect::reply(
            "system:monitoring-unsubscribed",
            serde_json::json!({ "stopped": stopped }),
        )])
    }
}

#[async_trait]
impl NamespaceController for SystemController {
    fn namespace(&self) -> Namespace {
        Namespace::System
    }

    async fn on_connect(&self, ctx: &ConnectionContext) -> Result<Vec<Effect>, BackendError> {
        if !ctx.identity.is_global_admin() {
            return Err(BackendError::forbidden("system namespace requires an administrator"));
        }
        Ok(Vec::new())
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError> {
        match self.events.resolve(event)? {
            SystemEvent::HealthCheck => {
                self.require(ctx, Verb::Get).await?;
                Ok(vec![Effect::reply("system:health-status", with_actor(ctx, self.health()))])
            }
            SystemEvent::GetMetrics => {
                let p: MetricsPayload = parse_payload(payload)?;
                self.require(ctx, Verb::Get).await?;
                Ok(vec![Effect::reply("system:metrics", self.metrics(&p.metrics)?)])
            }
            SystemEvent::UpdateConfig => self.update_config(ctx, parse_payload(payload)?).await,
            SystemEvent::MaintenanceMode => self.maintenance(ctx, parse_payload(payload)?).await,
            SystemEvent::Backup => self.backup(ctx, parse_payload(payload)?).await,
            SystemEvent::Restart => self.restart(ctx, parse_payload(payload)?).await,
            SystemEvent::SubscribeMonitoring => self.subscribe_monitoring(ctx, parse_payload(payload)?).await,
            SystemEvent::UnsubscribeMonitoring => self.unsubscribe_monitoring(ctx).await,
        }
    }

    async fn on_disconnect(&self, ctx: &ConnectionContext, _outcome: &DisconnectOutcome) -> Vec<Effect> {
        let owned = self.tasks().remove(&ctx.socket_id);
        if let Some(owned) = owned {
            owned.abort_all();
            tracing::debug!("[System] Stopped background tasks of socket {}", ctx.socket_id);
        }
        Vec::new()
    }
}
