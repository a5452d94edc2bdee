/**
 * Notification Namespace
 *
 * Unread counts, recent history, per-type subscriptions and delivery
 * receipts. Notifications themselves are pushed by the broadcast router;
 * this controller only answers queries about them.
 *
 * Marking notifications as read over the socket is deprecated. Those
 * events answer with a `DEPRECATED` error and change nothing; clients use
 * the REST endpoints instead.
 */
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::dispatch::{parse_payload, require_text, Effect, EventTable};
use super::services::Services;
use super::{Namespace, NamespaceController};
use crate::backend::error::BackendError;
use crate::backend::realtime::{ConnectionContext, Room, UNREAD_COUNT_EVENT};
use crate::shared::DeliveryReceipt;

const MAX_TYPE_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NotificationEvent {
    GetUnreadCount,
    GetRecent,
    Subscribe,
    Unsubscribe,
    Delivered,
    MarkAsRead,
    MarkAllAsRead,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentPayload {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypesPayload {
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveredPayload {
    notification_id: Uuid,
    delivery_method: String,
}

/// Notification types are lowercase words joined by underscores
fn validate_types(types: &[String]) -> Result<Vec<String>, BackendError> {
    if types.is_empty() {
        return Err(BackendError::validation("types", "must not be empty"));
    }
    let mut valid = Vec::with_capacity(types.len());
    for kind in types {
        let well_formed = !kind.is_empty()
            && kind.len() <= MAX_TYPE_LEN
            && kind.chars().all(|c| c.is_ascii_lowercase() || c == '_');
        if !well_formed {
            return Err(BackendError::validation(
                "types",
                format!("'{}' is not a notification type", kind),
            ));
        }
        if !valid.contains(kind) {
            valid.push(kind.clone());
        }
    }
    Ok(valid)
}

pub struct NotificationController {
    services: Services,
    events: EventTable<NotificationEvent>,
}

impl NotificationController {
    pub fn new(services: Services) -> Self {
        use NotificationEvent::*;
        Self {
            services,
            events: EventTable::new(&[
                ("notifications:getUnreadCount", GetUnreadCount),
                ("notifications:getRecent", GetRecent),
                ("notifications:subscribe", Subscribe),
                ("notifications:unsubscribe", Unsubscribe),
                ("notifications:delivered", Delivered),
                ("notifications:markAsRead", MarkAsRead),
                ("notifications:markAllAsRead", MarkAllAsRead),
            ]),
        }
    }

    async fn unread_count(&self, ctx: &ConnectionContext) -> Result<Effect, BackendError> {
        let count = self.services.store.count_unread(ctx.user_id()).await?;
        Ok(Effect::reply(UNREAD_COUNT_EVENT, serde_json::json!({ "count": count })))
    }

    async fn recent(&self, ctx: &ConnectionContext, p: RecentPayload) -> Result<Vec<Effect>, BackendError> {
        let config = &self.services.config;
        let default = self
            .services
            .runtime
            .recent_limit()
            .unwrap_or(config.recent_notifications_default);
        let limit = p
            .limit
            .unwrap_or(default)
            .clamp(1, config.recent_notifications_max);

        let notifications = self
            .services
            .store
            .recent_notifications(ctx.user_id(), limit)
            .await?;
        Ok(vec![Effect::reply(
            "notifications:recent",
            serde_json::json!({ "notifications": notifications, "limit": limit }),
        )])
    }

    fn subscribe(&self, ctx: &ConnectionContext, p: TypesPayload, join: bool) -> Result<Vec<Effect>, BackendError> {
        let types = validate_types(&p.types)?;
        let registry = &self.services.registry;
        for kind in &types {
            let room = Room::notification_type(ctx.user_id(), kind);
            if join {
                registry.join(ctx.user_id(), ctx.socket_id, &room, true);
            } else {
                registry.leave(ctx.user_id(), ctx.socket_id, &room);
            }
        }
        tracing::debug!(
            "[Notifications] User {} {} {:?}",
            ctx.user_id(),
            if join { "subscribed to" } else { "unsubscribed from" },
            types
        );
        let ack = if join {
            "notifications:subscribed"
        } else {
            "notifications:unsubscribed"
        };
        Ok(vec![Effect::reply(ack, serde_json::json!({ "types": types }))])
    }

    async fn delivered(&self, ctx: &ConnectionContext, p: DeliveredPayload) -> Result<Vec<Effect>, BackendError> {
        let delivery_method = require_text("deliveryMethod", &p.delivery_method, 32)?;
        let store = &self.services.store;
        store
            .get_notification(p.notification_id)
            .await?
            .filter(|record| record.recipient_id == ctx.user_id())
            .ok_or_else(|| BackendError::not_found("Notification"))?;

        let receipt = DeliveryReceipt {
            notification_id: p.notification_id,
            user_id: ctx.user_id(),
            delivery_method,
            delivered_at: Utc::now(),
        };
        store.record_delivery(receipt.clone()).await?;
        Ok(vec![Effect::reply(
            "notifications:delivery-confirmed",
            serde_json::to_value(&receipt)?,
        )])
    }
}

#[async_trait]
impl NamespaceController for NotificationController {
    fn namespace(&self) -> Namespace {
        Namespace::Notification
    }

    async fn on_connect(&self, ctx: &ConnectionContext) -> Result<Vec<Effect>, BackendError> {
        Ok(vec![self.unread_count(ctx).await?])
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError> {
        match self.events.resolve(event)? {
            NotificationEvent::GetUnreadCount => Ok(vec![self.unread_count(ctx).await?]),
            NotificationEvent::GetRecent => self.recent(ctx, parse_payload(payload)?).await,
            NotificationEvent::Subscribe => self.subscribe(ctx, parse_payload(payload)?, true),
            NotificationEvent::Unsubscribe => self.subscribe(ctx, parse_payload(payload)?, false),
            NotificationEvent::Delivered => self.delivered(ctx, parse_payload(payload)?).await,
            NotificationEvent::MarkAsRead => Err(BackendError::deprecated(
                "use PATCH /api/notifications/{id}/read",
            )),
            NotificationEvent::MarkAllAsRead => Err(BackendError::deprecated(
                "use PATCH /api/notifications/{id}/read for each notification",
            )),
        }
    }
}
