/**
 * Connection Context
 *
 * Built once when a socket passes the auth gate and handed by reference to
 * every handler call on that socket. Nothing is attached to the transport
 * connection itself.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use uuid::Uuid;

use crate::backend::auth::Identity;

/// Logically separate event channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Default namespace, `/`
    Root,
    Board,
    Workspace,
    System,
    Notification,
    Chat,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Root,
        Namespace::Board,
        Namespace::Workspace,
        Namespace::System,
        Namespace::Notification,
        Namespace::Chat,
    ];

    /// Mount path of the namespace
    pub fn path(self) -> &'static str {
        match self {
            Namespace::Root => "/",
            Namespace::Board => "/board",
            Namespace::Workspace => "/workspace",
            Namespace::System => "/system",
            Namespace::Notification => "/notifications",
            Namespace::Chat => "/chat",
        }
    }

    /// Whether connections to this namespace need the privileged limiter
    pub fn is_privileged(self) -> bool {
        matches!(self, Namespace::System)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Namespace {
    type Err = String;

    /// Accepts the mount path with or without the leading slash
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim_start_matches('/') {
            "" => Ok(Namespace::Root),
            "board" => Ok(Namespace::Board),
            "workspace" => Ok(Namespace::Workspace),
            "system" => Ok(Namespace::System),
            "notifications" | "notification" => Ok(Namespace::Notification),
            "chat" => Ok(Namespace::Chat),
            other => Err(format!("unknown namespace: {}", other)),
        }
    }
}

/// Server-assigned socket identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(Uuid);

impl SocketId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SocketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-connection state handed to every handler
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub socket_id: SocketId,
    pub namespace: Namespace,
    pub identity: Identity,
    pub remote_addr: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionContext {
    pub fn new(namespace: Namespace, identity: Identity, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            socket_id: SocketId::new(),
            namespace,
            identity,
            remote_addr,
            connected_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.identity.id()
    }
}
