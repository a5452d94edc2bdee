/**
 * Rooms
 *
 * A room is a named multicast group inside one namespace. Names are opaque
 * to the registry; the constructors below fix the conventions:
 *
 * - `user:<id>` personal room, joined on connect in every namespace
 * - `board:<id>`, `workspace:<id>`, `chat:<boardId>` resource rooms
 * - `notifications:<id>:<type>` type-scoped notification subrooms
 */
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::connection::Namespace;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Room {
    namespace: Namespace,
    name: String,
}

impl Room {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    pub fn user(namespace: Namespace, user_id: Uuid) -> Self {
        Self::new(namespace, format!("user:{}", user_id))
    }

    pub fn board(board_id: Uuid) -> Self {
        Self::new(Namespace::Board, format!("board:{}", board_id))
    }

    pub fn workspace(workspace_id: Uuid) -> Self {
        Self::new(Namespace::Workspace, format!("workspace:{}", workspace_id))
    }

    pub fn chat(board_id: Uuid) -> Self {
        Self::new(Namespace::Chat, format!("chat:{}", board_id))
    }

    pub fn notification_type(user_id: Uuid, kind: &str) -> Self {
        Self::new(Namespace::Notification, format!("notifications:{}:{}", user_id, kind))
    }

    /// Room receiving monitoring samples on the system namespace
    pub fn monitoring() -> Self {
        Self::new(Namespace::System, "system:monitoring")
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_personal(&self) -> bool {
        self.name.starts_with("user:")
    }

    /// Id of the resource a `<kind>:<id>` room belongs to
    pub fn resource_id(&self, kind: &str) -> Option<Uuid> {
        self.name
            .strip_prefix(kind)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)
    }
}
