//! Namespace Controllers
//!
//! Each namespace composes the auth gate, permission checks, rate limiting,
//! the membership registry and the broadcast router into its own event
//! table.
//!
//! # Architecture
//!
//! - **`services`** - `Services`, the container every controller receives
//! - **`dispatch`** - `EventTable`, `Effect` and handler helpers
//! - **`session`** - `Session`, the per-connection pipeline
//! - **`runtime`** - runtime-mutable system settings
//! - **`root`**, **`board`**, **`workspace`**, **`system`**,
//!   **`notification`**, **`chat`** - the controllers
//!
//! # Handler Contract
//!
//! 1. Validate the payload; shape errors are rejected before any side effect
//! 2. Resolve the role and check the permission matrix
//! 3. On denial return `Forbidden`; the session reports it to the
//!    initiating socket only
//! 4. Perform the data store mutation
//! 5. Return `Effect`s broadcasting the result with actor profile and
//!    timestamp
//!
//! Errors and panics never escape a handler: the session turns them into a
//! scoped `error` event and the connection stays open.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::error::BackendError;
use crate::backend::realtime::{ConnectionContext, DisconnectOutcome};

pub use crate::backend::realtime::Namespace;

/// Service container
pub mod services;

/// Event tables, effects and handler helpers
pub mod dispatch;

/// Runtime-mutable system settings
pub mod runtime;

/// Per-connection pipeline
pub mod session;

/// Default namespace
pub mod root;

/// Board collaboration events
pub mod board;

/// Workspace membership and settings events
pub mod workspace;

/// Privileged administration events
pub mod system;

/// Notification delivery events
pub mod notification;

/// Board chat events
pub mod chat;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatch::{Effect, EventTable};
pub use runtime::{ConfigUpdate, SystemRuntime};
pub use services::{Services, ServicesBuilder};
pub use session::Session;

/// A namespace's connect hook, event table and disconnect hook
#[async_trait]
pub trait NamespaceController: Send + Sync {
    fn namespace(&self) -> Namespace;

    /// Extra connect-time checks and initial events
    ///
    /// An error here refuses the connection.
    async fn on_connect(&self, _ctx: &ConnectionContext) -> Result<Vec<Effect>, BackendError> {
        Ok(Vec::new())
    }

    /// Handle one inbound event
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError>;

    /// "Left"/offline notices after the registry released the socket
    async fn on_disconnect(&self, _ctx: &ConnectionContext, _outcome: &DisconnectOutcome) -> Vec<Effect> {
        Vec::new()
    }
}

/// One controller per namespace
#[derive(Clone)]
pub struct Controllers {
    by_namespace: HashMap<Namespace, Arc<dyn NamespaceController>>,
}

impl Controllers {
    pub fn new(services: &Services) -> Self {
        let controllers: Vec<Arc<dyn NamespaceController>> = vec![
            Arc::new(root::RootController::new(services.clone())),
            Arc::new(board::BoardController::new(services.clone())),
            Arc::new(workspace::WorkspaceController::new(services.clone())),
            Arc::new(system::SystemController::new(services.clone())),
            Arc::new(notification::NotificationController::new(services.clone())),
            Arc::new(chat::ChatController::new(services.clone())),
        ];
        Self {
            by_namespace: controllers
                .into_iter()
                .map(|controller| (controller.namespace(), controller))
                .collect(),
        }
    }

    pub fn get(&self, namespace: Namespace) -> Option<Arc<dyn NamespaceController>> {
        self.by_namespace.get(&namespace).cloned()
    }
}
