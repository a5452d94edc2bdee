/**
 * Role Resolver
 *
 * Derives the effective role a user holds on a resource:
 *
 * - resource owner → `owner`
 * - membership with the admin or edit flag → `admin`
 * - membership with the view flag → `member`
 * - anything else on a resource → `viewer`
 * - outside any resource → `admin` for global admins, `member` otherwise
 *
 * A missing board or workspace is reported as `NotFound` so callers can tell
 * it apart from a denial.
 */
use std::sync::Arc;
use uuid::Uuid;

use super::matrix::RoleName;
use crate::backend::auth::Identity;
use crate::backend::error::BackendError;
use crate::backend::store::DataStore;
use crate::shared::MembershipRecord;

/// The scope a role is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceContext {
    Board(Uuid),
    Workspace(Uuid),
    Global,
}

#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn DataStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Resolve the effective role of `identity` within `context`
    pub async fn effective_role(
        &self,
        identity: &Identity,
        context: ResourceContext,
    ) -> Result<RoleName, BackendError> {
        let user_id = identity.id();
        let role = match context {
            ResourceContext::Board(board_id) => {
                let board = self
                    .store
                    .get_board(board_id)
                    .await?
                    .ok_or_else(|| BackendError::not_found("Board"))?;
                if board.owner_id == user_id {
                    RoleName::Owner
                } else {
                    let membership = self.store.get_board_membership(board_id, user_id).await?;
                    role_from_membership(membership.as_ref())
                }
            }
            ResourceContext::Workspace(workspace_id) => {
                let workspace = self
                    .store
                    .get_workspace(workspace_id)
                    .await?
                    .ok_or_else(|| BackendError::not_found("Workspace"))?;
                if workspace.owner_id == user_id {
                    RoleName::Owner
                } else {
                    let membership = self
                        .store
                        .get_workspace_membership(workspace_id, user_id)
                        .await?;
                    role_from_membership(membership.as_ref())
                }
            }
            ResourceContext::Global => {
                if identity.is_global_admin() {
                    RoleName::Admin
                } else {
                    RoleName::Member
                }
            }
        };

        tracing::debug!("[Permissions] User {} resolved as {} in {:?}", user_id, role, context);
        Ok(role)
    }
}

fn role_from_membership(membership: Option<&MembershipRecord>) -> RoleName {
    match membership {
        Some(m) if m.can_admin || m.can_edit => RoleName::Admin,
        Some(m) if m.can_view => RoleName::Member,
        _ => RoleName::Viewer,
    }
}
