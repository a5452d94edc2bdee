/**
 * Board Namespace
 *
 * Live collaboration on a single board: joining and leaving the board room,
 * column and task mutations, comments with mention notifications, typing
 * indicators and presence.
 *
 * Every mutation resolves the actor's board role and checks the permission
 * matrix before touching the store. Results are broadcast to `board:<id>`
 * with the actor profile and a timestamp.
 *
 * Column deletion, column reordering and task creation/moves take the
 * board's lock, so a task cannot land in a column between the emptiness
 * check and the delete.
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

use super::dispatch::{authorize, parse_payload, require_member, require_text, with_actor, Effect, EventTable};
use super::services::Services;
use super::{Namespace, NamespaceController};
use crate::backend::error::BackendError;
use crate::backend::permissions::{ResourceContext, Verb};
use crate::backend::realtime::{ConnectionContext, DisconnectOutcome, JoinOutcome, KeyedLocks, LeaveOutcome, Room};
use crate::backend::store::{ColumnUpdate, NewColumn, NewTask, TaskUpdate};
use crate::shared::{ActorProfile, Column, NotificationDraft, Task};

const MAX_TITLE: usize = 200;
const MAX_COMMENT: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BoardEvent {
    Join,
    Leave,
    ColumnCreate,
    ColumnUpdate,
    ColumnDelete,
    ColumnsReorder,
    TaskCreate,
    TaskUpdate,
    TaskMove,
    TaskDelete,
    CommentAdd,
    TypingStart,
    TypingStop,
    PresenceUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardRef {
    board_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnCreatePayload {
    board_id: Uuid,
    column_data: NewColumn,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnUpdatePayload {
    column_id: Uuid,
    updates: ColumnUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnRef {
    column_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderPayload {
    board_id: Uuid,
    column_order: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreatePayload {
    board_id: Uuid,
    task_data: NewTask,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskUpdatePayload {
    task_id: Uuid,
    updates: TaskUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskMovePayload {
    task_id: Uuid,
    to_column_id: Uuid,
    #[serde(default)]
    position: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRef {
    task_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentPayload {
    task_id: Uuid,
    content: String,
    #[serde(default)]
    mentions: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    board_id: Uuid,
    #[serde(default)]
    task_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresencePayload {
    board_id: Uuid,
    status: String,
    #[serde(default)]
    cursor: Option<serde_json::Value>,
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
}

pub struct BoardController {
    services: Services,
    events: EventTable<BoardEvent>,
    board_locks: KeyedLocks<Uuid>,
}

impl BoardController {
    pub fn new(services: Services) -> Self {
        use BoardEvent::*;
        Self {
            services,
            events: EventTable::new(&[
                ("board:join", Join),
                ("board:leave", Leave),
                ("column:create", ColumnCreate),
                ("column:update", ColumnUpdate),
                ("column:delete", ColumnDelete),
                ("columns:reorder", ColumnsReorder),
                ("task:create", TaskCreate),
                ("task:update", TaskUpdate),
                ("task:move", TaskMove),
                ("task:delete", TaskDelete),
                ("comment:add", CommentAdd),
                ("typing:start", TypingStart),
                ("typing:stop", TypingStop),
                ("presence:update", PresenceUpdate),
            ]),
            board_locks: KeyedLocks::new(),
        }
    }

    async fn column(&self, column_id: Uuid) -> Result<Column, BackendError> {
        self.services
            .store
            .get_column(column_id)
            .await?
            .ok_or_else(|| BackendError::not_found("Column"))
    }

    async fn task(&self, task_id: Uuid) -> Result<Task, BackendError> {
        self.services
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| BackendError::not_found("Task"))
    }

    async fn online_users(&self, room: &Room) -> Result<Vec<ActorProfile>, BackendError> {
        let mut users = Vec::new();
        for user_id in self.services.registry.identities_in_room(room) {
            if let Some(user) = self.services.store.get_user(user_id).await? {
                users.push(ActorProfile::from(&user));
            }
        }
        Ok(users)
    }

    async fn join(&self, ctx: &ConnectionContext, p: BoardRef) -> Result<Vec<Effect>, BackendError> {
        authorize(&self.services, ctx, ResourceContext::Board(p.board_id), "/board/:id", Verb::Get).await?;

        let store = &self.services.store;
        let board = store
            .get_board(p.board_id)
            .await?
            .ok_or_else(|| BackendError::not_found("Board"))?;
        let columns = store.list_columns(p.board_id).await?;
        let tasks = store.list_tasks(p.board_id).await?;

        let room = Room::board(p.board_id);
        let outcome = self.services.registry.join(ctx.user_id(), ctx.socket_id, &room, true);
        tracing::info!("[Board] User {} joined board {} ({:?})", ctx.user_id(), p.board_id, outcome);

        let online_users = self.online_users(&room).await?;
        let mut effects = vec![Effect::reply(
            "board:state",
            serde_json::json!({
                "board": board,
                "columns": columns,
                "tasks": tasks,
                "onlineUsers": online_users,
            }),
        )];
        if outcome == JoinOutcome::Joined {
            effects.push(Effect::to_room_except(
                room,
                "board:user-joined",
                with_actor(ctx, serde_json::json!({ "boardId": p.board_id })),
            ));
        }
        Ok(effects)
    }

    fn leave(&self, ctx: &ConnectionContext, p: BoardRef) -> Result<Vec<Effect>, BackendError> {
        let room = Room::board(p.board_id);
        let outcome = self.services.registry.leave(ctx.user_id(), ctx.socket_id, &room);
        if !outcome.left() {
            return Ok(Vec::new());
        }
        tracing::info!("[Board] User {} left board {}", ctx.user_id(), p.board_id);
        let mut effects = vec![Effect::reply("board:left", serde_json::json!({ "boardId": p.board_id }))];
        if outcome == LeaveOutcome::Vacated {
            effects.push(Effect::to_room(
                room,
                "board:user-left",
                with_actor(ctx, serde_json::json!({ "boardId": p.board_id })),
            ));
        }
        Ok(effects)
    }

    async fn column_create(
        &self,
        ctx: &ConnectionContext,
        p: ColumnCreatePayload,
    ) -> Result<Vec<Effect>, BackendError> {
        let mut input = p.column_data;
        input.name = require_text("columnData.name", &input.name, MAX_TITLE)?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(p.board_id),
            "/board/:id/columns",
            Verb::Post,
        )
        .await?;

        let column = self.services.store.create_column(p.board_id, input).await?;
        tracing::info!("[Board] Column {} created on board {}", column.id, p.board_id);
        Ok(vec![Effect::to_room(
            Room::board(p.board_id),
            "column:created",
            with_actor(ctx, serde_json::json!({ "boardId": p.board_id, "column": column })),
        )])
    }

    async fn column_update(
        &self,
        ctx: &ConnectionContext,
        p: ColumnUpdatePayload,
    ) -> Result<Vec<Effect>, BackendError> {
        let mut updates = p.updates;
        if updates.is_empty() {
            return Err(BackendError::validation("updates", "nothing to update"));
        }
        if let Some(name) = &updates.name {
            updates.name = Some(require_text("updates.name", name, MAX_TITLE)?);
        }
        let column = self.column(p.column_id).await?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(column.board_id),
            "/board/:id/columns/:columnId",
            Verb::Put,
        )
        .await?;

        let column = self.services.store.update_column(p.column_id, updates).await?;
        Ok(vec![Effect::to_room(
            Room::board(column.board_id),
            "column:updated",
            with_actor(ctx, serde_json::json!({ "boardId": column.board_id, "column": column })),
        )])
    }

    async fn column_delete(&self, ctx: &ConnectionContext, p: ColumnRef) -> Result<Vec<Effect>, BackendError> {
        let column = self.column(p.column_id).await?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(column.board_id),
            "/board/:id/columns/:columnId",
            Verb::Delete,
        )
        .await?;

        let _guard = self.board_locks.lock(&column.board_id).await;
        let task_count = self.services.store.count_tasks_in_column(column.id).await?;
        if task_count > 0 {
            tracing::warn!(
                "[Board] Refused to delete column {} holding {} tasks",
                column.id,
                task_count
            );
            return Err(BackendError::conflict(format!(
                "cannot delete a column that still holds {} task(s)",
                task_count
            )));
        }
        self.services.store.delete_column(column.id).await?;
        tracing::info!("[Board] Column {} deleted from board {}", column.id, column.board_id);

        Ok(vec![Effect::to_room(
            Room::board(column.board_id),
            "column:deleted",
            with_actor(
                ctx,
                serde_json::json!({ "boardId": column.board_id, "columnId": column.id }),
            ),
        )])
    }

    async fn columns_reorder(
        &self,
        ctx: &ConnectionContext,
        p: ReorderPayload,
    ) -> Result<Vec<Effect>, BackendError> {
        let unique: HashSet<Uuid> = p.column_order.iter().copied().collect();
        if p.column_order.is_empty() || unique.len() != p.column_order.len() {
            return Err(BackendError::validation(
                "columnOrder",
                "must list each column exactly once",
            ));
        }
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(p.board_id),
            "/board/:id/columns/reorder",
            Verb::Put,
        )
        .await?;

        let _guard = self.board_locks.lock(&p.board_id).await;
        let current: HashSet<Uuid> = self
            .services
            .store
            .list_columns(p.board_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if current != unique {
            return Err(BackendError::validation(
                "columnOrder",
                "must contain every column of the board",
            ));
        }
        let columns = self.services.store.reorder_columns(p.board_id, &p.column_order).await?;

        Ok(vec![Effect::to_room(
            Room::board(p.board_id),
            "columns:reordered",
            with_actor(
                ctx,
                serde_json::json!({
                    "boardId": p.board_id,
                    "columnOrder": p.column_order,
                    "columns": columns,
                }),
            ),
        )])
    }

    async fn task_create(
        &self,
        ctx: &ConnectionContext,
        p: TaskCreatePayload,
    ) -> Result<Vec<Effect>, BackendError> {
        let mut input = p.task_data;
        input.title = require_text("taskData.title", &input.title, MAX_TITLE)?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(p.board_id),
            "/board/:id/tasks",
            Verb::Post,
        )
        .await?;

        let task = {
            let _guard = self.board_locks.lock(&p.board_id).await;
            self.services.store.create_task(p.board_id, ctx.user_id(), input).await?
        };
        tracing::info!("[Board] Task {} created on board {}", task.id, p.board_id);

        let mut effects = vec![Effect::to_room(
            Room::board(p.board_id),
            "task:created",
            with_actor(ctx, serde_json::json!({ "boardId": p.board_id, "task": task })),
        )];
        effects.extend(assignment_notice(ctx, &task, None));
        Ok(effects)
    }

    async fn task_update(
        &self,
        ctx: &ConnectionContext,
        p: TaskUpdatePayload,
    ) -> Result<Vec<Effect>, BackendError> {
        let mut updates = p.updates;
        if updates.is_empty() {
            return Err(BackendError::validation("updates", "nothing to update"));
        }
        if let Some(title) = &updates.title {
            updates.title = Some(require_text("updates.title", title, MAX_TITLE)?);
        }
        let before = self.task(p.task_id).await?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(before.board_id),
            "/board/:id/tasks/:taskId",
            Verb::Put,
        )
        .await?;

        let task = self.services.store.update_task(p.task_id, updates).await?;
        let mut effects = vec![Effect::to_room(
            Room::board(task.board_id),
            "task:updated",
            with_actor(ctx, serde_json::json!({ "boardId": task.board_id, "task": task })),
        )];
        effects.extend(assignment_notice(ctx, &task, before.assignee_id));
        Ok(effects)
    }

    async fn task_move(&self, ctx: &ConnectionContext, p: TaskMovePayload) -> Result<Vec<Effect>, BackendError> {
        let before = self.task(p.task_id).await?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(before.board_id),
            "/board/:id/tasks/:taskId/move",
            Verb::Put,
        )
        .await?;

        let task = {
            let _guard = self.board_locks.lock(&before.board_id).await;
            self.services
                .store
                .move_task(p.task_id, p.to_column_id, p.position)
                .await?
        };
        Ok(vec![Effect::to_room(
            Room::board(task.board_id),
            "task:moved",
            with_actor(
                ctx,
                serde_json::json!({
                    "boardId": task.board_id,
                    "task": task,
                    "fromColumnId": before.column_id,
                    "toColumnId": p.to_column_id,
                    "position": p.position,
                }),
            ),
        )])
    }

    async fn task_delete(&self, ctx: &ConnectionContext, p: TaskRef) -> Result<Vec<Effect>, BackendError> {
        let task = self.task(p.task_id).await?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(task.board_id),
            "/board/:id/tasks/:taskId",
            Verb::Delete,
        )
        .await?;

        self.services.store.delete_task(task.id).await?;
        tracing::info!("[Board] Task {} deleted from board {}", task.id, task.board_id);
        Ok(vec![Effect::to_room(
            Room::board(task.board_id),
            "task:deleted",
            with_actor(
                ctx,
                serde_json::json!({ "boardId": task.board_id, "taskId": task.id }),
            ),
        )])
    }

    async fn comment_add(&self, ctx: &ConnectionContext, p: CommentPayload) -> Result<Vec<Effect>, BackendError> {
        let content = require_text("content", &p.content, MAX_COMMENT)?;
        let task = self.task(p.task_id).await?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(task.board_id),
            "/board/:id/tasks/:taskId/comments",
            Verb::Post,
        )
        .await?;

        let mut seen = HashSet::new();
        let mentions: Vec<Uuid> = p.mentions.into_iter().filter(|id| seen.insert(*id)).collect();
        let comment = self
            .services
            .store
            .add_comment(task.id, ctx.user_id(), content, mentions.clone())
            .await?;

        let mut effects = vec![Effect::to_room(
            Room::board(task.board_id),
            "comment:added",
            with_actor(
                ctx,
                serde_json::json!({ "boardId": task.board_id, "taskId": task.id, "comment": comment }),
            ),
        )];
        for mentioned in mentions.into_iter().filter(|id| *id != ctx.user_id()) {
            effects.push(Effect::Notify(
                mentioned,
                NotificationDraft::new(
                    "mention",
                    Some(ctx.user_id()),
                    serde_json::json!({
                        "boardId": task.board_id,
                        "taskId": task.id,
                        "taskTitle": task.title,
                        "commentId": comment.id,
                        "mentionedBy": ctx.identity.actor(),
                    }),
                ),
            ));
        }
        Ok(effects)
    }

    fn typing(&self, ctx: &ConnectionContext, p: TypingPayload, started: bool) -> Result<Vec<Effect>, BackendError> {
        let room = Room::board(p.board_id);
        require_member(&self.services, ctx, &room)?;
        if !self.services.runtime.typing_indicators() {
            return Ok(Vec::new());
        }
        let event = if started { "typing:start" } else { "typing:stop" };
        Ok(vec![Effect::to_room_except(
            room,
            event,
            with_actor(ctx, serde_json::json!({ "boardId": p.board_id, "taskId": p.task_id })),
        )])
    }

    async fn presence(&self, ctx: &ConnectionContext, p: PresencePayload) -> Result<Vec<Effect>, BackendError> {
        let status = require_text("status", &p.status, 32)?;
        let room = Room::board(p.board_id);
        require_member(&self.services, ctx, &room)?;
        authorize(
            &self.services,
            ctx,
            ResourceContext::Board(p.board_id),
            "/board/:id/presence",
            Verb::Post,
        )
        .await?;

        Ok(vec![Effect::to_room_except(
            room,
            "presence:updated",
            with_actor(
                ctx,
                serde_json::json!({
                    "boardId": p.board_id,
                    "status": status,
                    "cursor": p.cursor,
                    "lastSeen": p.last_seen,
                }),
            ),
        )])
    }
}

/// Notify a new assignee who is not the actor
fn assignment_notice(ctx: &ConnectionContext, task: &Task, previous: Option<Uuid>) -> Option<Effect> {
    let assignee = task.assignee_id?;
    if assignee == ctx.user_id() || previous == Some(assignee) {
        return None;
    }
    Some(Effect::Notify(
        assignee,
        NotificationDraft::new(
            "task_assigned",
            Some(ctx.user_id()),
            serde_json::json!({
                "boardId": task.board_id,
                "taskId": task.id,
                "taskTitle": task.title,
                "assignedBy": ctx.identity.actor(),
            }),
        ),
    ))
}

#[async_trait]
impl NamespaceController for BoardController {
    fn namespace(&self) -> Namespace {
        Namespace::Board
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError> {
        match self.events.resolve(event)? {
            BoardEvent::Join => self.join(ctx, parse_payload(payload)?).await,
            BoardEvent::Leave => self.leave(ctx, parse_payload(payload)?),
            BoardEvent::ColumnCreate => self.column_create(ctx, parse_payload(payload)?).await,
            BoardEvent::ColumnUpdate => self.column_update(ctx, parse_payload(payload)?).await,
            BoardEvent::ColumnDelete => self.column_delete(ctx, parse_payload(payload)?).await,
            BoardEvent::ColumnsReorder => self.columns_reorder(ctx, parse_payload(payload)?).await,
            BoardEvent::TaskCreate => self.task_create(ctx, parse_payload(payload)?).await,
            BoardEvent::TaskUpdate => self.task_update(ctx, parse_payload(payload)?).await,
            BoardEvent::TaskMove => self.task_move(ctx, parse_payload(payload)?).await,
            BoardEvent::TaskDelete => self.task_delete(ctx, parse_payload(payload)?).await,
            BoardEvent::CommentAdd => self.comment_add(ctx, parse_payload(payload)?).await,
            BoardEvent::TypingStart => self.typing(ctx, parse_payload(payload)?, true),
            BoardEvent::TypingStop => self.typing(ctx, parse_payload(payload)?, false),
            BoardEvent::PresenceUpdate => self.presence(ctx, parse_payload(payload)?).await,
        }
    }

    async fn on_disconnect(&self, ctx: &ConnectionContext, outcome: &DisconnectOutcome) -> Vec<Effect> {
        outcome
            .rooms_vacated
            .iter()
            .filter_map(|room| room.resource_id("board").map(|board_id| (room, board_id)))
            .map(|(room, board_id)| {
                Effect::to_room(
                    room.clone(),
                    "board:user-left",
                    with_actor(ctx, serde_json::json!({ "boardId": board_id, "reason": "disconnect" })),
                )
            })
            .collect()
    }
}
