/**
 * Controller Test Fixtures
 *
 * A seeded in-memory store, a `Services` container around it and helpers
 * to register sockets without going through the auth gate.
 */
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

use super::dispatch::Effect;
use super::services::Services;
use crate::backend::auth::{Claims, Identity, TokenError, TokenService, VerifiedToken};
use crate::backend::realtime::{ConnectionContext, Namespace, Room};
use crate::backend::store::InMemoryStore;
use crate::shared::{Board, Column, MembershipRecord, ServerEvent, UserProfile, Workspace};

struct RejectAll;

#[async_trait]
impl TokenService for RejectAll {
    async fn verify(&self, _token: &str) -> Result<VerifiedToken, TokenError> {
        Err(TokenError::Invalid("fixture".into()))
    }
}

pub fn user(name: &str) -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        username: name.to_lowercase(),
        display_name: name.to_string(),
        avatar_url: None,
        is_admin: false,
    }
}

pub fn identity(user: &UserProfile) -> Identity {
    Identity {
        user: user.clone(),
        claims: Claims {
            sub: user.id.to_string(),
            email: None,
            username: Some(user.username.clone()),
            exp: 0,
            iat: 0,
        },
    }
}

pub fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn event_names(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .map(|effect| match effect {
            Effect::Reply(e)
            | Effect::ToRoom(_, e)
            | Effect::ToRoomExcept(_, e)
            | Effect::ToIdentity(_, _, e)
            | Effect::ToNamespace(_, e) => e.event.as_str(),
            Effect::Notify(_, draft) => draft.kind.as_str(),
        })
        .collect()
}

pub struct Fixture {
    pub store: InMemoryStore,
    pub services: Services,
    pub owner: UserProfile,
    pub editor: UserProfile,
    pub member: UserProfile,
    pub outsider: UserProfile,
    pub workspace: Workspace,
    pub board: Board,
    pub column: Column,
}

impl Fixture {
    /// One workspace with one board and one empty column
    ///
    /// The owner owns both. The editor holds edit rights (admin role) and
    /// the member view rights (member role) on both; the outsider has no
    /// membership record and resolves to viewer.
    pub async fn new() -> Self {
        let store = InMemoryStore::new();
        let owner = user("Olive");
        let editor = user("Eddie");
        let member = user("Milo");
        let outsider = user("Otto");
        for u in [&owner, &editor, &member, &outsider] {
            store.seed_user(u.clone()).await;
        }

        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: "Studio".into(),
            owner_id: owner.id,
            settings: serde_json::json!({}),
            limits: Default::default(),
            usage: Default::default(),
        };
        store.seed_workspace(workspace.clone()).await;

        let board = Board {
            id: Uuid::new_v4(),
            workspace_id: workspace.id,
            name: "Roadmap".into(),
            owner_id: owner.id,
            column_order: Vec::new(),
        };
        store.seed_board(board.clone()).await;

        for (u, edit) in [(&editor, true), (&member, false)] {
            let record = |resource_id| MembershipRecord {
                user_id: u.id,
                resource_id,
                can_admin: false,
                can_edit: edit,
                can_view: true,
            };
            store.seed_board_member(record(board.id)).await;
            store.seed_workspace_member(record(workspace.id)).await;
        }

        let column = Column {
            id: Uuid::new_v4(),
            board_id: board.id,
            name: "Todo".into(),
            color: None,
            position: 0,
        };
        store.seed_column(column.clone()).await;

        let services = Services::builder(Arc::new(store.clone()), Arc::new(RejectAll)).build();
        Self {
            store,
            services,
            owner,
            editor,
            member,
            outsider,
            workspace,
            board,
            column,
        }
    }

    /// Register a socket for `user` in `namespace`
    pub fn connect(
        &self,
        namespace: Namespace,
        user: &UserProfile,
    ) -> (ConnectionContext, UnboundedReceiver<ServerEvent>) {
        let ctx = ConnectionContext::new(namespace, identity(user), None);
        let (tx, rx) = mpsc::unbounded_channel();
        self.services.registry.register_socket(&ctx, tx);
        (ctx, rx)
    }

    pub fn join(&self, ctx: &ConnectionContext, room: &Room) {
        self.services.registry.join(ctx.user_id(), ctx.socket_id, room, true);
    }
}
