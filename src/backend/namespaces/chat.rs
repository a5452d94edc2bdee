/**
 * Chat Namespace
 *
 * Board-scoped chat rooms. Reading a board's chat needs the viewer role on
 * the board, posting needs member. Messages are persisted before they are
 * broadcast.
 */
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::dispatch::{authorize, parse_payload, require_member, require_text, with_actor, Effect, EventTable};
use super::services::Services;
use super::{Namespace, NamespaceController};
use crate::backend::error::BackendError;
use crate::backend::permissions::{ResourceContext, Verb};
use crate::backend::realtime::{ConnectionContext, DisconnectOutcome, JoinOutcome, LeaveOutcome, Room};

const MAX_MESSAGE: usize = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ChatEvent {
    Join,
    Leave,
    Message,
    Typing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardRef {
    board_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    board_id: Uuid,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    board_id: Uuid,
    is_typing: bool,
}

pub struct ChatController {
    services: Services,
    events: EventTable<ChatEvent>,
}

impl ChatController {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            events: EventTable::new(&[
                ("chat:join", ChatEvent::Join),
                ("chat:leave", ChatEvent::Leave),
                ("chat:message", ChatEvent::Message),
                ("chat:typing", ChatEvent::Typing),
            ]),
        }
    }

    async fn join(&self, ctx: &ConnectionContext, p: BoardRef) -> Result<Vec<Effect>, BackendError> {
        authorize(&self.services, ctx, ResourceContext::Board(p.board_id), "/board/:id/chat", Verb::Get).await?;
        let room = Room::chat(p.board_id);
        let outcome = self.services.registry.join(ctx.user_id(), ctx.socket_id, &room, true);

        let mut effects = vec![Effect::reply("chat:joined", serde_json::json!({ "boardId": p.board_id }))];
        if outcome == JoinOutcome::Joined {
            effects.push(Effect::to_room_except(
                room,
                "chat:user-joined",
                with_actor(ctx, serde_json::json!({ "boardId": p.board_id })),
            ));
        }
        Ok(effects)
    }

    fn leave(&self, ctx: &ConnectionContext, p: BoardRef) -> Result<Vec<Effect>, BackendError> {
        let room = Room::chat(p.board_id);
        if self.services.registry.leave(ctx.user_id(), ctx.socket_id, &room) != LeaveOutcome::Vacated {
            return Ok(Vec::new());
        }
        Ok(vec![Effect::to_room(
            room,
            "chat:user-left",
            with_actor(ctx, serde_json::json!({ "boardId": p.board_id })),
        )])
    }

    async fn message(&self, ctx: &ConnectionContext, p: MessagePayload) -> Result<Vec<Effect>, BackendError> {
        let content = require_text("content", &p.content, MAX_MESSAGE)?;
        let room = Room::chat(p.board_id);
        require_member(&self.services, ctx, &room)?;
        authorize(&self.services, ctx, ResourceContext::Board(p.board_id), "/board/:id/chat", Verb::Post).await?;

        let message = self
            .services
            .store
            .add_chat_message(p.board_id, ctx.user_id(), content)
            .await?;
        tracing::debug!("[Chat] Message {} on board {}", message.id, p.board_id);
        Ok(vec![Effect::to_room(
            room,
            "chat:message",
            with_actor(ctx, serde_json::json!({ "boardId": p.board_id, "message": message })),
        )])
    }

    fn typing(&self, ctx: &ConnectionContext, p: TypingPayload) -> Result<Vec<Effect>, BackendError> {
        let room = Room::chat(p.board_id);
        require_member(&self.services, ctx, &room)?;
        if !self.services.runtime.typing_indicators() {
            return Ok(Vec::new());
        }
        Ok(vec![Effect::to_room_except(
            room,
            "chat:typing",
            with_actor(
                ctx,
                serde_json::json!({ "boardId": p.board_id, "isTyping": p.is_typing }),
            ),
        )])
    }
}

#[async_trait]
impl NamespaceController for ChatController {
    fn namespace(&self) -> Namespace {
        Namespace::Chat
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError> {
        match self.events.resolve(event)? {
            ChatEvent::Join => self.join(ctx, parse_payload(payload)?).await,
            ChatEvent::Leave => self.leave(ctx, parse_payload(payload)?),
            ChatEvent::Message => self.message(ctx, parse_payload(payload)?).await,
            ChatEvent::Typing => self.typing(ctx, parse_payload(payload)?),
        }
    }

    async fn on_disconnect(&self, ctx: &ConnectionContext, outcome: &DisconnectOutcome) -> Vec<Effect> {
        outcome
            .rooms_vacated
            .iter()
            .filter_map(|room| room.resource_id("chat").map(|id| (room, id)))
            .map(|(room, board_id)| {
                Effect::to_room(
                    room.clone(),
                    "chat:user-left",
                    with_actor(ctx, serde_json::json!({ "boardId": board_id })),
                )
            })
            .collect()
    }
}
