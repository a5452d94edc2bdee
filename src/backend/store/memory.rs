/**
 * In-Memory Data Store
 *
 * A `DataStore` backed by hash maps behind a single `tokio::sync::RwLock`.
 * Every mutation takes the write lock once, so multi-record writes such as
 * column reordering are atomic with respect to concurrent readers.
 *
 * The `seed_*` helpers populate records that the realtime layer only ever
 * reads (users, workspaces, boards, memberships).
 */
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ColumnUpdate, DataStore, NewColumn, NewTask, StoreError, StoreResult, TaskUpdate,
};
use crate::shared::{
    Board, ChatMessage, Column, Comment, DeliveryReceipt, MembershipRecord, NotificationDraft,
    NotificationRecord, Task, UserProfile, Workspace,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    workspaces: HashMap<Uuid, Workspace>,
    workspace_members: HashMap<(Uuid, Uuid), MembershipRecord>,
    boards: HashMap<Uuid, Board>,
    board_members: HashMap<(Uuid, Uuid), MembershipRecord>,
    columns: HashMap<Uuid, Column>,
    tasks: HashMap<Uuid, Task>,
    comments: HashMap<Uuid, Comment>,
    chat_messages: Vec<ChatMessage>,
    notifications: HashMap<Uuid, NotificationRecord>,
    receipts: Vec<DeliveryReceipt>,
    unavailable_recipients: HashSet<Uuid>,
}

/// Lock-protected in-memory data store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
    mutations: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes performed through the `DataStore` trait
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn seed_user(&self, user: UserProfile) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn seed_workspace(&self, workspace: Workspace) {
        self.inner.write().await.workspaces.insert(workspace.id, workspace);
    }

    pub async fn seed_workspace_member(&self, member: MembershipRecord) {
        self.inner
            .write()
            .await
            .workspace_members
            .insert((member.resource_id, member.user_id), member);
    }

    pub async fn seed_board(&self, board: Board) {
        self.inner.write().await.boards.insert(board.id, board);
    }

    pub async fn seed_board_member(&self, member: MembershipRecord) {
        self.inner
            .write()
            .await
            .board_members
            .insert((member.resource_id, member.user_id), member);
    }

    pub async fn seed_column(&self, column: Column) {
        let mut inner = self.inner.write().await;
        if let Some(board) = inner.boards.get_mut(&column.board_id) {
            if !board.column_order.contains(&column.id) {
                board.column_order.push(column.id);
            }
        }
        inner.columns.insert(column.id, column);
    }

    pub async fn seed_task(&self, task: Task) {
        self.inner.write().await.tasks.insert(task.id, task);
    }

    /// Make notification writes for `recipient` fail as if the store were down
    pub async fn set_recipient_unavailable(&self, recipient: Uuid) {
        self.inner.write().await.unavailable_recipients.insert(recipient);
    }

    /// Delivery receipts recorded so far
    pub async fn receipts(&self) -> Vec<DeliveryReceipt> {
        self.inner.read().await.receipts.clone()
    }

    /// Every notification stored for a recipient, oldest first
    pub async fn notifications_for(&self, recipient: Uuid) -> Vec<NotificationRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<_> = inner
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient)
            .cloned()
            .collect();
        records.sort_by_key(|n| n.created_at);
        records
    }
}

fn sorted_columns(inner: &Inner, board_id: Uuid) -> Vec<Column> {
    let mut columns: Vec<Column> = inner
        .columns
        .values()
        .filter(|c| c.board_id == board_id)
        .cloned()
        .collect();
    columns.sort_by_key(|c| c.position);
    columns
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_workspace(&self, id: Uuid) -> StoreResult<Option<Workspace>> {
        Ok(self.inner.read().await.workspaces.get(&id).cloned())
    }

    async fn get_workspace_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MembershipRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .workspace_members
            .get(&(workspace_id, user_id))
            .copied())
    }

    async fn update_workspace_member(&self, member: MembershipRecord) -> StoreResult<MembershipRecord> {
        let mut inner = self.inner.write().await;
        if !inner.workspaces.contains_key(&member.resource_id) {
            return Err(StoreError::not_found("Workspace", member.resource_id));
        }
        if !inner.users.contains_key(&member.user_id) {
            return Err(StoreError::not_found("User", member.user_id));
        }
        inner
            .workspace_members
            .insert((member.resource_id, member.user_id), member);
        drop(inner);
        self.record_mutation();
        Ok(member)
    }

    async fn update_workspace_settings(
        &self,
        workspace_id: Uuid,
        settings: serde_json::Value,
    ) -> StoreResult<Workspace> {
        let mut inner = self.inner.write().await;
        let workspace = inner
            .workspaces
            .get_mut(&workspace_id)
            .ok_or_else(|| StoreError::not_found("Workspace", workspace_id))?;
        match (&mut workspace.settings, settings) {
            (serde_json::Value::Object(existing), serde_json::Value::Object(incoming)) => {
                for (key, value) in incoming {
                    existing.insert(key, value);
                }
            }
            (slot, incoming) => *slot = incoming,
        }
        let updated = workspace.clone();
        drop(inner);
        self.record_mutation();
        Ok(updated)
    }

    async fn get_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(self.inner.read().await.boards.get(&id).cloned())
    }

    async fn get_board_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MembershipRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .board_members
            .get(&(board_id, user_id))
            .copied())
    }

    async fn list_columns(&self, board_id: Uuid) -> StoreResult<Vec<Column>> {
        Ok(sorted_columns(&*self.inner.read().await, board_id))
    }

    async fn get_column(&self, id: Uuid) -> StoreResult<Option<Column>> {
        Ok(self.inner.read().await.columns.get(&id).cloned())
    }

    async fn create_column(&self, board_id: Uuid, input: NewColumn) -> StoreResult<Column> {
        let mut inner = self.inner.write().await;
        let board = inner
            .boards
            .get_mut(&board_id)
            .ok_or_else(|| StoreError::not_found("Board", board_id))?;

        let len = board.column_order.len() as u32;
        let position = input.position.unwrap_or(len).min(len);
        let column = Column {
            id: Uuid::new_v4(),
            board_id,
            name: input.name,
            color: input.color,
            position,
        };
        board
            .column_order
            .insert(position as usize, column.id);
        let order = board.column_order.clone();
        for (index, id) in order.iter().enumerate() {
            if let Some(c) = inner.columns.get_mut(id) {
                c.position = index as u32;
            }
        }
        inner.columns.insert(column.id, column.clone());
        drop(inner);
        self.record_mutation();
        Ok(column)
    }

    async fn update_column(&self, id: Uuid, update: ColumnUpdate) -> StoreResult<Column> {
        let mut inner = self.inner.write().await;
        let column = inner
            .columns
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Column", id))?;
        if let Some(name) = update.name {
            column.name = name;
        }
        if let Some(color) = update.color {
            column.color = Some(color);
        }
        let updated = column.clone();
        drop(inner);
        self.record_mutation();
        Ok(updated)
    }

    async fn delete_column(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.tasks.values().any(|t| t.column_id == id) {
            return Err(StoreError::conflict("column still contains tasks"));
        }
        let column = inner
            .columns
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("Column", id))?;
        if let Some(board) = inner.boards.get_mut(&column.board_id) {
            board.column_order.retain(|c| *c != id);
        }
        drop(inner);
        self.record_mutation();
        Ok(())
    }

    async fn count_tasks_in_column(&self, id: Uuid) -> StoreResult<usize> {
        Ok(self
            .inner
            .read()
            .await
            .tasks
            .values()
            .filter(|t| t.column_id == id)
            .count())
    }

    async fn reorder_columns(&self, board_id: Uuid, order: &[Uuid]) -> StoreResult<Vec<Column>> {
        let mut inner = self.inner.write().await;
        if !inner.boards.contains_key(&board_id) {
            return Err(StoreError::not_found("Board", board_id));
        }
        let current: HashSet<Uuid> = inner
            .columns
            .values()
            .filter(|c| c.board_id == board_id)
            .map(|c| c.id)
            .collect();
        let requested: HashSet<Uuid> = order.iter().copied().collect();
        if requested.len() != order.len() || requested != current {
            return Err(StoreError::conflict(
                "column order must list every column of the board exactly once",
            ));
        }

        for (index, id) in order.iter().enumerate() {
            if let Some(column) = inner.columns.get_mut(id) {
                column.position = index as u32;
            }
        }
        if let Some(board) = inner.boards.get_mut(&board_id) {
            board.column_order = order.to_vec();
        }
        let columns = sorted_columns(&inner, board_id);
        drop(inner);
        self.record_mutation();
        Ok(columns)
    }

    async fn list_tasks(&self, board_id: Uuid) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.board_id == board_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.column_id, t.position));
        Ok(tasks)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn create_task(&self, board_id: Uuid, created_by: Uuid, input: NewTask) -> StoreResult<Task> {
        let mut inner = self.inner.write().await;
        match inner.columns.get(&input.column_id) {
            Some(column) if column.board_id == board_id => {}
            _ => return Err(StoreError::not_found("Column", input.column_id)),
        }
        let position = inner
            .tasks
            .values()
            .filter(|t| t.column_id == input.column_id)
            .count() as u32;
        let task = Task {
            id: Uuid::new_v4(),
            board_id,
            column_id: input.column_id,
            title: input.title,
            description: input.description,
            position,
            assignee_id: input.assignee_id,
            due_date: input.due_date,
            created_by,
            updated_at: Utc::now(),
        };
        inner.tasks.insert(task.id, task.clone());
        drop(inner);
        self.record_mutation();
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, update: TaskUpdate) -> StoreResult<Task> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Task", id))?;
        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(assignee) = update.assignee_id {
            task.assignee_id = Some(assignee);
        }
        if let Some(due) = update.due_date {
            task.due_date = Some(due);
        }
        task.updated_at = Utc::now();
        let updated = task.clone();
        drop(inner);
        self.record_mutation();
        Ok(updated)
    }

    async fn move_task(&self, id: Uuid, to_column: Uuid, position: u32) -> StoreResult<Task> {
        let mut inner = self.inner.write().await;
        let board_id = inner
            .tasks
            .get(&id)
            .map(|t| t.board_id)
            .ok_or_else(|| StoreError::not_found("Task", id))?;
        match inner.columns.get(&to_column) {
            Some(column) if column.board_id == board_id => {}
            _ => return Err(StoreError::not_found("Column", to_column)),
        }
        let task = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Task", id))?;
        task.column_id = to_column;
        task.position = position;
        task.updated_at = Utc::now();
        let moved = task.clone();
        drop(inner);
        self.record_mutation();
        Ok(moved)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .tasks
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("Task", id))?;
        inner.comments.retain(|_, c| c.task_id != id);
        drop(inner);
        self.record_mutation();
        Ok(())
    }

    async fn add_comment(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        content: String,
        mentions: Vec<Uuid>,
    ) -> StoreResult<Comment> {
        let mut inner = self.inner.write().await;
        if !inner.tasks.contains_key(&task_id) {
            return Err(StoreError::not_found("Task", task_id));
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id,
            author_id,
            content,
            mentions,
            created_at: Utc::now(),
        };
        inner.comments.insert(comment.id, comment.clone());
        drop(inner);
        self.record_mutation();
        Ok(comment)
    }

    async fn add_chat_message(
        &self,
        board_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> StoreResult<ChatMessage> {
        let mut inner = self.inner.write().await;
        if !inner.boards.contains_key(&board_id) {
            return Err(StoreError::not_found("Board", board_id));
        }
        let message = ChatMessage {
            id: Uuid::new_v4(),
            board_id,
            author_id,
            content,
            created_at: Utc::now(),
        };
        inner.chat_messages.push(message.clone());
        drop(inner);
        self.record_mutation();
        Ok(message)
    }

    async fn create_notification(
        &self,
        recipient_id: Uuid,
        draft: &NotificationDraft,
    ) -> StoreResult<NotificationRecord> {
        let mut inner = self.inner.write().await;
        if inner.unavailable_recipients.contains(&recipient_id) {
            return Err(StoreError::Unavailable {
                message: format!("notification shard for {} is offline", recipient_id),
            });
        }
        let record = NotificationRecord {
            id: Uuid::new_v4(),
            recipient_id,
            sender_id: draft.sender_id,
            kind: draft.kind.clone(),
            payload: draft.payload.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        inner.notifications.insert(record.id, record.clone());
        drop(inner);
        self.record_mutation();
        Ok(record)
    }

    async fn get_notification(&self, id: Uuid) -> StoreResult<Option<NotificationRecord>> {
        Ok(self.inner.read().await.notifications.get(&id).cloned())
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<NotificationRecord> {
        let mut inner = self.inner.write().await;
        let record = inner
            .notifications
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Notification", id))?;
        record.is_read = true;
        let updated = record.clone();
        drop(inner);
        self.record_mutation();
        Ok(updated)
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .notifications
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("Notification", id))?;
        drop(inner);
        self.record_mutation();
        Ok(())
    }

    async fn count_unread(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(self
            .inner
            .read()
            .await
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn recent_notifications(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<NotificationRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<NotificationRecord> = inner
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn record_delivery(&self, receipt: DeliveryReceipt) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.notifications.contains_key(&receipt.notification_id) {
            return Err(StoreError::not_found("Notification", receipt.notification_id));
        }
        inner.receipts.push(receipt);
        drop(inner);
        self.record_mutation();
        Ok(())
    }
}
