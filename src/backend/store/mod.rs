//! Data Store Module
//!
//! The realtime layer never owns persistence. Boards, tasks, notifications and
//! membership records live behind the [`DataStore`] trait, which a deployment
//! backs with its database of choice.
//!
//! # Architecture
//!
//! - **`mod.rs`** - The `DataStore` trait, its error type and mutation inputs
//! - **`memory`** - `InMemoryStore`, a lock-protected reference implementation
//!   used by the development server and the test suites
//!
//! # Consistency
//!
//! Multi-record mutations (`reorder_columns`) must be all-or-nothing: either
//! every column receives its new position or none does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::{
    Board, ChatMessage, Column, Comment, DeliveryReceipt, MembershipRecord, NotificationDraft,
    NotificationRecord, Task, UserProfile, Workspace,
};

/// In-memory reference implementation
pub mod memory;

pub use memory::InMemoryStore;

/// Errors raised by a data store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// A domain rule rejected the write
    #[error("{message}")]
    Conflict { message: String },

    /// The backing store could not serve the request
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Column fields supplied by `column:create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Insert position; appended when absent
    #[serde(default)]
    pub position: Option<u32>,
}

/// Partial column update supplied by `column:update`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColumnUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl ColumnUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

/// Task fields supplied by `task:create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub column_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update supplied by `task:update`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.assignee_id.is_none()
            && self.due_date.is_none()
    }
}

/// Persistence and domain queries used by the realtime layer
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserProfile>>;

    async fn get_workspace(&self, id: Uuid) -> StoreResult<Option<Workspace>>;
    async fn get_workspace_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MembershipRecord>>;
    async fn update_workspace_member(&self, member: MembershipRecord) -> StoreResult<MembershipRecord>;
    async fn update_workspace_settings(
        &self,
        workspace_id: Uuid,
        settings: serde_json::Value,
    ) -> StoreResult<Workspace>;

    async fn get_board(&self, id: Uuid) -> StoreResult<Option<Board>>;
    async fn get_board_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MembershipRecord>>;

    async fn list_columns(&self, board_id: Uuid) -> StoreResult<Vec<Column>>;
    async fn get_column(&self, id: Uuid) -> StoreResult<Option<Column>>;
    async fn create_column(&self, board_id: Uuid, input: NewColumn) -> StoreResult<Column>;
    async fn update_column(&self, id: Uuid, update: ColumnUpdate) -> StoreResult<Column>;
    async fn delete_column(&self, id: Uuid) -> StoreResult<()>;
    async fn count_tasks_in_column(&self, id: Uuid) -> StoreResult<usize>;
    /// Apply a full column ordering atomically
    async fn reorder_columns(&self, board_id: Uuid, order: &[Uuid]) -> StoreResult<Vec<Column>>;

    async fn list_tasks(&self, board_id: Uuid) -> StoreResult<Vec<Task>>;
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn create_task(&self, board_id: Uuid, created_by: Uuid, input: NewTask) -> StoreResult<Task>;
    async fn update_task(&self, id: Uuid, update: TaskUpdate) -> StoreResult<Task>;
    async fn move_task(&self, id: Uuid, to_column: Uuid, position: u32) -> StoreResult<Task>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;

    async fn add_comment(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        content: String,
        mentions: Vec<Uuid>,
    ) -> StoreResult<Comment>;
    async fn add_chat_message(
        &self,
        board_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> StoreResult<ChatMessage>;

    async fn create_notification(
        &self,
        recipient_id: Uuid,
        draft: &NotificationDraft,
    ) -> StoreResult<NotificationRecord>;
    async fn get_notification(&self, id: Uuid) -> StoreResult<Option<NotificationRecord>>;
    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<NotificationRecord>;
    async fn delete_notification(&self, id: Uuid) -> StoreResult<()>;
    async fn count_unread(&self, user_id: Uuid) -> StoreResult<u64>;
    /// Most recent notifications first
    async fn recent_notifications(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<NotificationRecord>>;
    async fn record_delivery(&self, receipt: DeliveryReceipt) -> StoreResult<()>;
}
