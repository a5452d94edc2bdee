/**
 * Domain Records
 *
 * These are the records the data store owns. The realtime layer reads them,
 * hands copies to the broadcast router, and never persists them itself.
 *
 * All records serialize with camelCase field names because that is what the
 * board client consumes inside socket frames.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user record as stored by the data store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Global administrator flag, used outside of any resource scope
    #[serde(default)]
    pub is_admin: bool,
}

/// Public profile of the actor attached to every broadcast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActorProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<&UserProfile> for ActorProfile {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Membership flags a user holds on a board or workspace
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    pub user_id: Uuid,
    pub resource_id: Uuid,
    #[serde(default)]
    pub can_admin: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_view: bool,
}

/// Quota ceilings for a workspace
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLimits {
    pub max_members: u64,
    pub max_boards: u64,
    pub max_storage_mb: u64,
}

impl Default for WorkspaceLimits {
    fn default() -> Self {
        Self {
            max_members: 50,
            max_boards: 100,
            max_storage_mb: 10_240,
        }
    }
}

/// Current consumption of a workspace's quotas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUsage {
    pub members: u64,
    pub boards: u64,
    pub storage_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub limits: WorkspaceLimits,
    #[serde(default)]
    pub usage: WorkspaceUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    /// Column ids in display order
    #[serde(default)]
    pub column_order: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub board_id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub position: u32,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub board_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[serde(default)]
    pub sender_id: Option<Uuid>,
    /// Notification type, e.g. `mention` or `task_assigned`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// What to do with a notification before it is fanned out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationDisposition {
    /// Emit a deletion event instead of a "new" event
    Delete,
    /// Persist and reflect the read state in the emitted payload
    MarkRead,
}

/// A notification about to be sent
///
/// When `id` is set the draft refers to an already persisted record and the
/// router reuses it instead of persisting a new one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub sender_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub disposition: Option<NotificationDisposition>,
}

impl NotificationDraft {
    /// Create a draft for a fresh notification
    pub fn new(kind: impl Into<String>, sender_id: Option<Uuid>, payload: serde_json::Value) -> Self {
        Self {
            id: None,
            sender_id,
            kind: kind.into(),
            payload,
            disposition: None,
        }
    }

    /// Create a draft that refers to an already persisted record
    pub fn existing(record: &NotificationRecord) -> Self {
        Self {
            id: Some(record.id),
            sender_id: record.sender_id,
            kind: record.kind.clone(),
            payload: record.payload.clone(),
            disposition: None,
        }
    }

    pub fn with_disposition(mut self, disposition: NotificationDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }
}

/// Receipt recorded when a client confirms delivery of a notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub delivery_method: String,
    pub delivered_at: DateTime<Utc>,
}
