/**
 * Dispatch Primitives
 *
 * Shared building blocks of every namespace controller:
 *
 * - `EventTable`, the name → typed event map built once per controller
 * - `Effect`, the outbound work a handler asks the session to perform
 * - payload parsing, permission checks and broadcast payload helpers
 */
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::hash::Hash;
use uuid::Uuid;

use super::services::Services;
use crate::backend::error::BackendError;
use crate::backend::permissions::{ResourceContext, RoleName, Verb};
use crate::backend::realtime::{ConnectionContext, Namespace, Room};
use crate::shared::event::get_timestamp;
use crate::shared::{NotificationDraft, ServerEvent};

/// Event name → typed event lookup
#[derive(Debug, Clone)]
pub struct EventTable<E> {
    entries: HashMap<&'static str, E>,
}

impl<E: Copy + Eq + Hash> EventTable<E> {
    pub fn new(entries: &[(&'static str, E)]) -> Self {
        Self {
            entries: entries.iter().copied().collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<E> {
        self.entries.get(name).copied()
    }

    /// Lookup that turns an unknown name into a validation error
    pub fn resolve(&self, name: &str) -> Result<E, BackendError> {
        self.lookup(name)
            .ok_or_else(|| BackendError::validation("event", format!("unknown event '{}'", name)))
    }

    /// All registered event names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Outbound work produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// To the initiating socket only
    Reply(ServerEvent),
    ToRoom(Room, ServerEvent),
    /// To a room, skipping the initiating socket
    ToRoomExcept(Room, ServerEvent),
    ToIdentity(Namespace, Uuid, ServerEvent),
    ToNamespace(Namespace, ServerEvent),
    /// Run the notification pipeline for a recipient
    Notify(Uuid, NotificationDraft),
}

impl Effect {
    pub fn reply(event: &str, data: serde_json::Value) -> Self {
        Effect::Reply(ServerEvent::new(event, data))
    }

    pub fn to_room(room: Room, event: &str, data: serde_json::Value) -> Self {
        Effect::ToRoom(room, ServerEvent::new(event, data))
    }

    pub fn to_room_except(room: Room, event: &str, data: serde_json::Value) -> Self {
        Effect::ToRoomExcept(room, ServerEvent::new(event, data))
    }
}

/// Deserialize an event payload, rejecting shape errors before any side effect
pub fn parse_payload<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, BackendError> {
    let payload = if payload.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        payload
    };
    serde_json::from_value(payload)
        .map_err(|e| BackendError::validation("payload", e.to_string()))
}

/// Trimmed, non-empty text field
pub fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, BackendError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BackendError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(BackendError::validation(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }
    Ok(trimmed.to_string())
}

/// Resolve the actor's role and check it against the permission matrix
///
/// # Errors
/// * `NotFound` - the resource does not exist
/// * `Forbidden` - the role does not satisfy the rule
pub async fn authorize(
    services: &Services,
    ctx: &ConnectionContext,
    resource: ResourceContext,
    template: &str,
    verb: Verb,
) -> Result<RoleName, BackendError> {
    let role = services.resolver.effective_role(&ctx.identity, resource).await?;
    if services.matrix.allows(role, template, verb) {
        Ok(role)
    } else {
        tracing::warn!(
            "[Permissions] Denied {} {} for user {} as {}",
            verb,
            template,
            ctx.user_id(),
            role
        );
        Err(BackendError::forbidden(format!(
            "role '{}' may not {} {}",
            role, verb, template
        )))
    }
}

/// Require the initiating socket to be in `room`
pub fn require_member(
    services: &Services,
    ctx: &ConnectionContext,
    room: &Room,
) -> Result<(), BackendError> {
    if services.registry.is_member(ctx.socket_id, room) {
        Ok(())
    } else {
        Err(BackendError::forbidden(format!("join {} first", room.name())))
    }
}

/// Attach the actor profile and a timestamp to a broadcast payload
pub fn with_actor(ctx: &ConnectionContext, data: serde_json::Value) -> serde_json::Value {
    let mut object = match data {
        serde_json::Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    object.insert(
        "user".to_string(),
        serde_json::to_value(ctx.identity.actor()).unwrap_or_default(),
    );
    object.insert("timestamp".to_string(), serde_json::Value::String(get_timestamp()));
    serde_json::Value::Object(object)
}
