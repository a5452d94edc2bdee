/**
 * Socket Session
 *
 * Drives one connection through its lifecycle:
 *
 * ```text
 * Connecting → Authenticating → { Authenticated, Rejected }
 * Authenticated → Disconnected   (at any time)
 * ```
 *
 * Inbound events are handled one at a time in receipt order: the transport
 * awaits `handle` before reading the next frame. Each event passes the rate
 * limiter, then the controller; errors and panics become a scoped `error`
 * event for this socket only.
 */
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::dispatch::{with_actor, Effect};
use super::services::Services;
use super::NamespaceController;
use crate::backend::auth::Handshake;
use crate::backend::error::BackendError;
use crate::backend::ratelimit::{Admission, RateKey, RateLimiter};
use crate::backend::realtime::{ConnectionContext, SocketSender};
use crate::shared::{ClientFrame, ServerEvent};

/// Event sent to every socket after it connects
pub const WELCOME_EVENT: &str = "welcome";

pub struct Session {
    ctx: ConnectionContext,
    services: Services,
    controller: Arc<dyn NamespaceController>,
    closed: bool,
}

impl Session {
    /// Authenticate a handshake and register the socket
    ///
    /// # Arguments
    /// * `sender` - Outbound channel of the socket; registered only on success
    ///
    /// # Errors
    /// Any error refuses the connection: auth failures, a connect-time rate
    /// limit on the privileged namespace, or a controller refusal.
    pub async fn establish(
        services: &Services,
        controller: Arc<dyn NamespaceController>,
        handshake: &Handshake,
        sender: SocketSender,
    ) -> Result<Self, BackendError> {
        let namespace = controller.namespace();

        if namespace.is_privileged() {
            // No identity yet, so the budget is keyed on the peer address
            let key = RateKey::for_connection(None, handshake.remote_addr);
            if let Admission::Blocked { retry_after } = services.system_limiter.admit(key) {
                tracing::warn!("[Session] Refused {} connection from {}: rate limited", namespace, key);
                return Err(BackendError::RateLimited {
                    retry_after_ms: retry_after.as_millis() as u64,
                });
            }
        }

        let identity = services.gate.authenticate(handshake).await.map_err(|e| {
            tracing::warn!("[Session] Refused {} connection: {}", namespace, e.code());
            e
        })?;

        let ctx = ConnectionContext::new(namespace, identity, handshake.remote_addr);
        let initial = controller.on_connect(&ctx).await.map_err(|e| {
            tracing::warn!(
                "[Session] {} refused user {}: {}",
                namespace,
                ctx.user_id(),
                e
            );
            e
        })?;

        services.registry.register_socket(&ctx, sender);
        tracing::info!(
            "[Session] Socket {} connected to {} as user {}",
            ctx.socket_id,
            namespace,
            ctx.user_id()
        );

        let welcome = with_actor(
            &ctx,
            serde_json::json!({
                "namespace": namespace.path(),
                "socketId": ctx.socket_id,
            }),
        );
        let session = Self {
            ctx,
            services: services.clone(),
            controller,
            closed: false,
        };
        session
            .apply(vec![Effect::Reply(ServerEvent::new(WELCOME_EVENT, welcome))])
            .await;
        session.apply(initial).await;
        Ok(session)
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.ctx
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn limiter(&self) -> &RateLimiter {
        if self.ctx.namespace.is_privileged() {
            &self.services.system_limiter
        } else {
            &self.services.limiter
        }
    }

    /// Handle a raw text frame
    pub async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => self.handle(&frame.event, frame.data).await,
            Err(e) => {
                tracing::debug!("[Session] Malformed frame on {}: {}", self.ctx.socket_id, e);
                self.report(None, BackendError::validation("frame", e.to_string()));
            }
        }
    }

    /// Handle one inbound event
    pub async fn handle(&mut self, event: &str, payload: serde_json::Value) {
        if self.closed {
            return;
        }

        if let Admission::Blocked { retry_after } = self.limiter().admit(RateKey::Identity(self.ctx.user_id())) {
            self.report(
                Some(event),
                BackendError::RateLimited {
                    retry_after_ms: retry_after.as_millis() as u64,
                },
            );
            return;
        }

        let outcome = AssertUnwindSafe(self.controller.handle(&self.ctx, event, payload))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(effects)) => self.apply(effects).await,
            Ok(Err(e)) => self.report(Some(event), e),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    "[Session] Handler for {} panicked on socket {}: {}",
                    event,
                    self.ctx.socket_id,
                    reason
                );
                self.report(Some(event), BackendError::internal(reason));
            }
        }
    }

    /// Send a scoped error to this socket only
    fn report(&self, event: Option<&str>, error: BackendError) {
        match &error {
            BackendError::Internal { .. } => tracing::error!(
                "[Session] {} failed for user {}: {}",
                event.unwrap_or("frame"),
                self.ctx.user_id(),
                error
            ),
            _ => tracing::warn!(
                "[Session] {} rejected for user {}: {}",
                event.unwrap_or("frame"),
                self.ctx.user_id(),
                error.code()
            ),
        }
        self.services
            .router
            .emit_to_socket(self.ctx.socket_id, ServerEvent::error(error.to_payload(event)));
    }

    async fn apply(&self, effects: Vec<Effect>) {
        let router = &self.services.router;
        let socket = self.ctx.socket_id;
        for effect in effects {
            match effect {
                Effect::Reply(event) => {
                    router.emit_to_socket(socket, event);
                }
                Effect::ToRoom(room, event) => {
                    router.emit_to_room(&room, event);
                }
                Effect::ToRoomExcept(room, event) => {
                    router.emit_to_room_except(&room, socket, event);
                }
                Effect::ToIdentity(namespace, user_id, event) => {
                    router.emit_to_identity(namespace, user_id, event);
                }
                Effect::ToNamespace(namespace, event) => {
                    router.emit_to_namespace(namespace, event);
                }
                Effect::Notify(recipient, draft) => {
                    if let Err(e) = router.send_notification(recipient, draft).await {
                        tracing::warn!("[Session] Notification to {} failed: {}", recipient, e);
                    }
                }
            }
        }
    }

    /// Release the socket; safe to call more than once
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let Some(outcome) = self.services.registry.on_disconnect(self.ctx.socket_id) else {
            return;
        };
        let effects = self.controller.on_disconnect(&self.ctx, &outcome).await;
        self.apply(effects).await;

        let connected_for = chrono::Utc::now() - self.ctx.connected_at;
        tracing::info!(
            "[Session] Socket {} disconnected from {} after {}s ({} rooms released)",
            self.ctx.socket_id,
            self.ctx.namespace,
            connected_for.num_seconds(),
            outcome.rooms.len()
        );
    }
}
