/**
 * Root Namespace
 *
 * The authenticated default namespace. Clients stay connected here to
 * receive server-wide notices (maintenance, scheduled restarts); the only
 * inbound event is the `ping` keepalive.
 */
use async_trait::async_trait;

use super::dispatch::{Effect, EventTable};
use super::services::Services;
use super::{Namespace, NamespaceController};
use crate::backend::error::BackendError;
use crate::backend::realtime::ConnectionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RootEvent {
    Ping,
}

pub struct RootController {
    services: Services,
    events: EventTable<RootEvent>,
}

impl RootController {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            events: EventTable::new(&[("ping", RootEvent::Ping)]),
        }
    }
}

#[async_trait]
impl NamespaceController for RootController {
    fn namespace(&self) -> Namespace {
        Namespace::Root
    }

    async fn on_connect(&self, _ctx: &ConnectionContext) -> Result<Vec<Effect>, BackendError> {
        // Late joiners still learn about an active maintenance window
        Ok(self
            .services
            .runtime
            .maintenance()
            .filter(|m| m.enabled)
            .map(|m| {
                Effect::reply(
                    "system:maintenance",
                    serde_json::to_value(m).unwrap_or_default(),
                )
            })
            .into_iter()
            .collect())
    }

    async fn handle(
        &self,
        _ctx: &ConnectionContext,
        event: &str,
        _payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError> {
        match self.events.resolve(event)? {
            RootEvent::Ping => Ok(vec![Effect::reply(
                "pong",
                serde_json::json!({ "uptimeSecs": self.services.runtime.uptime_secs() }),
            )]),
        }
    }
}
