/**
 * Broadcast Router
 *
 * Routes outbound events to rooms, identities and single sockets using the
 * membership registry, and runs the notification pipeline:
 *
 * 1. reuse the persisted record when the draft carries an id, else persist it
 * 2. apply the disposition (`delete` or `markRead`) if any
 * 3. fan out to the recipient's personal room and the type-scoped subroom,
 *    delivering at most once per socket
 * 4. recompute the unread count from the store and emit it
 *
 * Steps 1-4 run under a per-recipient lock so that concurrent sends to the
 * same user cannot emit counts out of order.
 *
 * # Delivery
 *
 * Events are pushed onto each socket's unbounded outbound channel. A closed
 * channel means the socket is going away and its disconnect cleanup is
 * already queued, so failed sends are only logged.
 */
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::connection::{Namespace, SocketId};
use super::fanout::{ClusterFanout, FanoutTarget};
use super::locks::KeyedLocks;
use super::registry::{MembershipRegistry, SocketSender};
use super::room::Room;
use crate::backend::error::BackendError;
use crate::backend::store::DataStore;
use crate::shared::{
    ErrorPayload, NotificationDisposition, NotificationDraft, NotificationRecord, ServerEvent,
};

/// Event carrying a new or updated notification
pub const NOTIFICATION_EVENT: &str = "notification";
/// Event replacing `notification` when the record was deleted
pub const NOTIFICATION_DELETED_EVENT: &str = "notification:deleted";
/// Event carrying the recipient's unread count
pub const UNREAD_COUNT_EVENT: &str = "notifications:unreadCount";

/// One entry of a bulk send
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotification {
    pub recipient_id: Uuid,
    pub draft: NotificationDraft,
}

/// Per-entry result of a bulk send
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub recipient_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<NotificationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

pub struct BroadcastRouter {
    registry: Arc<MembershipRegistry>,
    store: Arc<dyn DataStore>,
    fanout: Arc<dyn ClusterFanout>,
    recipient_locks: KeyedLocks<Uuid>,
}

impl BroadcastRouter {
    pub fn new(
        registry: Arc<MembershipRegistry>,
        store: Arc<dyn DataStore>,
        fanout: Arc<dyn ClusterFanout>,
    ) -> Self {
        tracing::info!("[Broadcast] Router using {} fanout", fanout.name());
        Self {
            registry,
            store,
            fanout,
            recipient_locks: KeyedLocks::new(),
        }
    }

    pub fn registry(&self) -> &Arc<MembershipRegistry> {
        &self.registry
    }

    fn deliver(&self, targets: Vec<(SocketId, SocketSender)>, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for (socket, sender) in targets {
            match sender.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::debug!("[Broadcast] Socket {} closed, dropping {}", socket, event.event),
            }
        }
        delivered
    }

    /// Emit to every socket in a room
    ///
    /// # Returns
    /// Number of local sockets the event was handed to
    pub fn emit_to_room(&self, room: &Room, event: ServerEvent) -> usize {
        let delivered = self.deliver(self.registry.senders_in_rooms([room], None), &event);
        self.fanout.publish(&FanoutTarget::Room(room.clone()), &event);
        tracing::debug!("[Broadcast] {} to {} ({} sockets)", event.event, room, delivered);
        delivered
    }

    /// Emit to every socket in a room except the initiator
    pub fn emit_to_room_except(&self, room: &Room, except: SocketId, event: ServerEvent) -> usize {
        let delivered = self.deliver(self.registry.senders_in_rooms([room], Some(except)), &event);
        self.fanout
            .publish(&FanoutTarget::RoomExcept(room.clone(), except), &event);
        tracing::debug!("[Broadcast] {} to {} except {} ({} sockets)", event.event, room, except, delivered);
        delivered
    }

    /// Emit to every socket an identity holds on a namespace
    pub fn emit_to_identity(&self, namespace: Namespace, user_id: Uuid, event: ServerEvent) -> usize {
        let room = Room::user(namespace, user_id);
        let delivered = self.deliver(self.registry.senders_in_rooms([&room], None), &event);
        self.fanout
            .publish(&FanoutTarget::Identity(namespace, user_id), &event);
        delivered
    }

    /// Emit to a single socket
    ///
    /// # Returns
    /// `false` if the socket is gone
    pub fn emit_to_socket(&self, socket: SocketId, event: ServerEvent) -> bool {
        match self.registry.sender(socket) {
            Some(sender) => self.deliver(vec![(socket, sender)], &event) == 1,
            None => {
                tracing::debug!("[Broadcast] Socket {} not registered, dropping {}", socket, event.event);
                false
            }
        }
    }

    /// Emit to every socket connected to a namespace
    pub fn emit_to_namespace(&self, namespace: Namespace, event: ServerEvent) -> usize {
        let delivered = self.deliver(self.registry.senders_in_namespace(namespace), &event);
        self.fanout.publish(&FanoutTarget::Namespace(namespace), &event);
        tracing::info!("[Broadcast] {} to namespace {} ({} sockets)", event.event, namespace, delivered);
        delivered
    }

    /// Persist (or reuse), apply the disposition, fan out and refresh the unread count
    ///
    /// # Arguments
    /// * `recipient` - User the notification belongs to
    /// * `draft` - Notification content; `draft.id` refers to an existing record
    ///
    /// # Returns
    /// The record as it was fanned out
    ///
    /// # Errors
    /// * `NotFound` - `draft.id` does not name a record of `recipient`
    /// * Any store failure, converted through `From<StoreError>`
    pub async fn send_notification(
        &self,
        recipient: Uuid,
        draft: NotificationDraft,
    ) -> Result<NotificationRecord, BackendError> {
        let _guard = self.recipient_locks.lock(&recipient).await;

        let mut record = match draft.id {
            Some(id) => self
                .store
                .get_notification(id)
                .await?
                .filter(|r| r.recipient_id == recipient)
                .ok_or_else(|| BackendError::not_found("Notification"))?,
            None => self.store.create_notification(recipient, &draft).await?,
        };

        let targets = [
            Room::user(Namespace::Notification, recipient),
            Room::notification_type(recipient, &record.kind),
        ];

        match draft.disposition {
            Some(NotificationDisposition::Delete) => {
                self.store.delete_notification(record.id).await?;
                let event = ServerEvent::new(
                    NOTIFICATION_DELETED_EVENT,
                    serde_json::json!({ "notificationId": record.id, "type": record.kind }),
                );
                self.emit_notification(&targets, recipient, event);
            }
            Some(NotificationDisposition::MarkRead) => {
                record = self.store.mark_notification_read(record.id).await?;
                self.emit_notification(&targets, recipient, notification_event(&record)?);
            }
            None => {
                self.emit_notification(&targets, recipient, notification_event(&record)?);
            }
        }

        let count = self.store.count_unread(recipient).await?;
        self.emit_to_identity(
            Namespace::Notification,
            recipient,
            ServerEvent::new(UNREAD_COUNT_EVENT, serde_json::json!({ "count": count })),
        );

        tracing::debug!(
            "[Broadcast] Notification {} ({}) sent to {}, unread {}",
            record.id,
            record.kind,
            recipient,
            count
        );
        Ok(record)
    }

    fn emit_notification(&self, targets: &[Room], recipient: Uuid, event: ServerEvent) {
        let delivered = self.deliver(self.registry.senders_in_rooms(targets, None), &event);
        self.fanout
            .publish(&FanoutTarget::Identity(Namespace::Notification, recipient), &event);
        tracing::debug!("[Broadcast] {} to {} ({} sockets)", event.event, recipient, delivered);
    }

    /// Send many notifications; each entry succeeds or fails on its own
    pub async fn send_bulk_notifications(&self, items: Vec<BulkNotification>) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let recipient_id = item.recipient_id;
            let outcome = match self.send_notification(recipient_id, item.draft).await {
                Ok(record) => BulkOutcome {
                    recipient_id,
                    success: true,
                    record: Some(record),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("[Broadcast] Bulk notification to {} failed: {}", recipient_id, e);
                    BulkOutcome {
                        recipient_id,
                        success: false,
                        record: None,
                        error: Some(e.to_payload(None)),
                    }
                }
            };
            outcomes.push(outcome);
        }
        let failed = outcomes.iter().filter(|o| !o.success).count();
        tracing::info!(
            "[Broadcast] Bulk send finished: {} sent, {} failed",
            outcomes.len() - failed,
            failed
        );
        outcomes
    }
}

fn notification_event(record: &NotificationRecord) -> Result<ServerEvent, BackendError> {
    Ok(ServerEvent::new(NOTIFICATION_EVENT, serde_json::to_value(record)?))
}
