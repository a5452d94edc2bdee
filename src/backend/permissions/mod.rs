//! Permissions Module
//!
//! Role-based authorization applied to live socket events.
//!
//! # Architecture
//!
//! - **`matrix`** - `RoleName`, `Verb` and the `PermissionMatrix`, a static
//!   `(path template, verb) -> allowed roles` table with a rank fallback
//! - **`resolver`** - `RoleResolver`, which derives a user's effective role
//!   for a board, a workspace or the global scope from data store records
//!
//! # Evaluation
//!
//! Handlers resolve the role first and then ask the matrix. Path templates
//! are canonical strings such as `/board/:id/columns`; ids are never
//! substituted and no pattern matching happens at lookup time.
//!
//! A rule that lists only low ranks implicitly admits every higher rank:
//! `[viewer]` also admits `member`, `admin` and `owner`. Roles outside the
//! list are compared against the lowest listed rank.

/// Permission rule table
pub mod matrix;

/// Effective role resolution
pub mod resolver;

pub use matrix::{role_satisfies, PermissionMatrix, RoleName, Verb};
pub use resolver::{ResourceContext, RoleResolver};
