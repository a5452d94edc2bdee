/**
 * Permission Matrix
 *
 * Maps `(path template, verb)` to the ordered set of roles allowed to
 * perform it. Lookups are exact-key hash lookups; a missing rule denies.
 */
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role hierarchy, ordered by rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Guest = 0,
    Viewer = 1,
    Member = 2,
    Admin = 3,
    Owner = 4,
}

impl RoleName {
    pub const ALL: [RoleName; 5] = [
        RoleName::Guest,
        RoleName::Viewer,
        RoleName::Member,
        RoleName::Admin,
        RoleName::Owner,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleName::Guest => "guest",
            RoleName::Viewer => "viewer",
            RoleName::Member => "member",
            RoleName::Admin => "admin",
            RoleName::Owner => "owner",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation verb of a permission rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Decide whether `role` satisfies an allowed-role list
///
/// Exact membership passes. Otherwise the role passes when its rank is at
/// least the lowest rank in the list. An empty list admits nobody.
pub fn role_satisfies(role: RoleName, allowed: &[RoleName]) -> bool {
    if allowed.contains(&role) {
        return true;
    }
    allowed
        .iter()
        .map(|r| r.rank())
        .min()
        .is_some_and(|required| role.rank() >= required)
}

/// Static `(template, verb) -> roles` table
#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
    rules: HashMap<(String, Verb), Vec<RoleName>>,
}

impl PermissionMatrix {
    /// An empty matrix that denies everything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a rule
    pub fn with_rule(mut self, template: impl Into<String>, verb: Verb, roles: &[RoleName]) -> Self {
        self.rules.insert((template.into(), verb), roles.to_vec());
        self
    }

    /// Allowed roles for a rule, in the order they were declared
    pub fn allowed_roles(&self, template: &str, verb: Verb) -> Option<&[RoleName]> {
        self.rules
            .get(&(template.to_string(), verb))
            .map(Vec::as_slice)
    }

    /// Evaluate a permission
    ///
    /// # Arguments
    /// * `role` - The actor's effective role
    /// * `template` - Canonical path template, e.g. `/board/:id/columns`
    /// * `verb` - Operation verb
    ///
    /// # Returns
    /// `false` when no rule exists for the pair
    pub fn allows(&self, role: RoleName, template: &str, verb: Verb) -> bool {
        match self.allowed_roles(template, verb) {
            Some(allowed) => role_satisfies(role, allowed),
            None => {
                tracing::debug!("[Permissions] No rule for {} {}, denying", verb, template);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule table used by the board, workspace and system namespaces
    pub fn default_rules() -> Self {
        use RoleName::*;
        use Verb::*;

        Self::empty()
            .with_rule("/board/:id", Get, &[Viewer])
            .with_rule("/board/:id/columns", Post, &[Owner, Admin, Member])
            .with_rule("/board/:id/columns/:columnId", Put, &[Member])
            .with_rule("/board/:id/columns/:columnId", Delete, &[Owner, Admin])
            .with_rule("/board/:id/columns/reorder", Put, &[Member])
            .with_rule("/board/:id/tasks", Post, &[Member])
            .with_rule("/board/:id/tasks/:taskId", Put, &[Member])
            .with_rule("/board/:id/tasks/:taskId", Delete, &[Admin])
            .with_rule("/board/:id/tasks/:taskId/move", Put, &[Member])
            .with_rule("/board/:id/tasks/:taskId/comments", Post, &[Member])
            .with_rule("/board/:id/presence", Post, &[Viewer])
            .with_rule("/board/:id/chat", Get, &[Viewer])
            .with_rule("/board/:id/chat", Post, &[Member])
            .with_rule("/workspace/:id", Get, &[Viewer])
            .with_rule("/workspace/:id/members", Put, &[Admin])
            .with_rule("/workspace/:id/settings", Put, &[Admin])
            .with_rule("/workspace/:id/limits", Get, &[Member])
            .with_rule("/system", Get, &[Admin])
            .with_rule("/system", Post, &[Admin])
    }
}
