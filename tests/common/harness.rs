//! Harness driving real sessions against an in-memory store

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

use xfboard::backend::auth::{Claims, Handshake, TokenError, TokenService, VerifiedToken};
use xfboard::backend::error::BackendError;
use xfboard::backend::namespaces::{Controllers, Namespace, Services, Session};
use xfboard::backend::ratelimit::ManualClock;
use xfboard::backend::store::InMemoryStore;
use xfboard::shared::{Board, Column, MembershipRecord, RealtimeConfig, ServerEvent, UserProfile, Workspace};

/// Accepts any token that parses as a UUID and uses it as the subject
pub struct StaticTokens;

#[async_trait]
impl TokenService for StaticTokens {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        Uuid::parse_str(token).map_err(|_| TokenError::Invalid("not a test token".into()))?;
        Ok(VerifiedToken {
            user_id: token.to_string(),
            claims: Claims {
                sub: token.to_string(),
                email: None,
                username: None,
                exp: u64::MAX,
                iat: 0,
            },
        })
    }
}

pub fn user(name: &str, is_admin: bool) -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        username: name.to_lowercase(),
        display_name: name.to_string(),
        avatar_url: None,
        is_admin,
    }
}

/// One connected socket
pub struct Client {
    pub session: Session,
    pub rx: UnboundedReceiver<ServerEvent>,
}

impl Client {
    pub async fn send(&mut self, event: &str, data: serde_json::Value) {
        self.session.handle(event, data).await;
    }

    /// Everything received since the last drain
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn disconnect(&mut self) {
        self.session.close().await;
    }
}

pub struct Harness {
    pub store: InMemoryStore,
    pub services: Services,
    pub controllers: Controllers,
    pub clock: ManualClock,
    pub owner: UserProfile,
    pub member: UserProfile,
    pub outsider: UserProfile,
    pub admin: UserProfile,
    pub workspace: Workspace,
    pub board: Board,
    pub column: Column,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(RealtimeConfig::default()).await
    }

    /// Owner owns the workspace and board; member has view rights on both;
    /// outsider has no membership; admin is a global admin with no membership
    pub async fn with_config(config: RealtimeConfig) -> Self {
        let store = InMemoryStore::new();
        let owner = user("Olive", false);
        let member = user("Milo", false);
        let outsider = user("Otto", false);
        let admin = user("Ada", true);
        for u in [&owner, &member, &outsider, &admin] {
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

        let record = |resource_id| MembershipRecord {
            user_id: member.id,
            resource_id,
            can_admin: false,
            can_edit: false,
            can_view: true,
        };
        store.seed_board_member(record(board.id)).await;
        store.seed_workspace_member(record(workspace.id)).await;

        let column = Column {
            id: Uuid::new_v4(),
            board_id: board.id,
            name: "Todo".into(),
            color: None,
            position: 0,
        };
        store.seed_column(column.clone()).await;

        let clock = ManualClock::new(Instant::now());
        let services = Services::builder(Arc::new(store.clone()), Arc::new(StaticTokens))
            .config(config)
            .clock(Arc::new(clock.clone()))
            .build();
        let controllers = Controllers::new(&services);

        Self {
            store,
            services,
            controllers,
            clock,
            owner,
            member,
            outsider,
            admin,
            workspace,
            board,
            column,
        }
    }

    pub async fn try_connect(&self, namespace: Namespace, handshake: Handshake) -> Result<Client, BackendError> {
        let controller = self
            .controllers
            .get(namespace)
            .ok_or_else(|| BackendError::not_found("Namespace"))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::establish(&self.services, controller, &handshake, tx).await?;
        Ok(Client { session, rx })
    }

    /// Connect `user` and discard the connect-time events
    pub async fn connect(&self, namespace: Namespace, user: &UserProfile) -> Client {
        let mut client = self
            .try_connect(namespace, Handshake::with_token(user.id.to_string()))
            .await
            .unwrap_or_else(|e| panic!("{} refused {}: {}", namespace, user.username, e));
        client.drain();
        client
    }

    /// Connect to the board namespace and join the fixture board
    pub async fn board_client(&self, user: &UserProfile) -> Client {
        let mut client = self.connect(Namespace::Board, user).await;
        client.send("board:join", serde_json::json!({ "boardId": self.board.id })).await;
        client.drain();
        client
    }
}
