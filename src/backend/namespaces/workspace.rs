/**
 * Workspace Namespace
 *
 * Presence of members in a workspace, member permission changes, settings
 * changes and quota warnings. Member and settings changes need the admin
 * role on the workspace; the quota check needs member.
 */
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dispatch::{authorize, parse_payload, with_actor, Effect, EventTable};
use super::services::Services;
use super::{Namespace, NamespaceController};
use crate::backend::error::BackendError;
use crate::backend::permissions::{ResourceContext, Verb};
use crate::backend::realtime::{ConnectionContext, DisconnectOutcome, JoinOutcome, LeaveOutcome, Room};
use crate::shared::{ActorProfile, NotificationDraft, Workspace};

/// Usage share at which a quota is reported
const LIMIT_WARNING_PERCENT: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WorkspaceEvent {
    Join,
    Leave,
    MemberUpdate,
    SettingsUpdate,
    CheckLimits,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceRef {
    workspace_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberPermissions {
    #[serde(default)]
    can_admin: bool,
    #[serde(default)]
    can_edit: bool,
    #[serde(default)]
    can_view: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberUpdatePayload {
    workspace_id: Uuid,
    member_id: Uuid,
    permissions: MemberPermissions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsPayload {
    workspace_id: Uuid,
    settings: serde_json::Value,
}

/// A quota at or above the warning threshold
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LimitWarning {
    pub resource: &'static str,
    pub current: u64,
    pub limit: u64,
    pub percentage: u64,
}

/// Quotas of `workspace` whose usage reached the warning threshold
pub fn limit_warnings(workspace: &Workspace) -> Vec<LimitWarning> {
    let quotas = [
        ("members", workspace.usage.members, workspace.limits.max_members),
        ("boards", workspace.usage.boards, workspace.limits.max_boards),
        ("storage", workspace.usage.storage_mb, workspace.limits.max_storage_mb),
    ];
    quotas
        .into_iter()
        .filter(|(_, _, limit)| *limit > 0)
        .map(|(resource, current, limit)| LimitWarning {
            resource,
            current,
            limit,
            percentage: current.saturating_mul(100) / limit,
        })
        .filter(|w| w.percentage >= LIMIT_WARNING_PERCENT)
        .collect()
}

pub struct WorkspaceController {
    services: Services,
    events: EventTable<WorkspaceEvent>,
}

impl WorkspaceController {
    pub fn new(services: Services) -> Self {
        use WorkspaceEvent::*;
        Self {
            services,
            events: EventTable::new(&[
                ("workspace:join", Join),
                ("workspace:leave", Leave),
                ("workspace:member-update", MemberUpdate),
                ("workspace:settings-update", SettingsUpdate),
                ("workspace:check-limits", CheckLimits),
            ]),
        }
    }

    async fn workspace(&self, id: Uuid) -> Result<Workspace, BackendError> {
        self.services
            .store
            .get_workspace(id)
            .await?
            .ok_or_else(|| BackendError::not_found("Workspace"))
    }

    async fn join(&self, ctx: &ConnectionContext, p: WorkspaceRef) -> Result<Vec<Effect>, BackendError> {
        let role = authorize(
            &self.services,
            ctx,
            ResourceContext::Workspace(p.workspace_id),
            "/workspace/:id",
            Verb::Get,
        )
        .await?;
        let workspace = self.workspace(p.workspace_id).await?;

        let room = Room::workspace(p.workspace_id);
        let outcome = self.services.registry.join(ctx.user_id(), ctx.socket_id, &room, true);

        let mut online = Vec::new();
        for user_id in self.services.registry.identities_in_room(&room) {
            if let Some(user) = self.services.store.get_user(user_id).await? {
                online.push(ActorProfile::from(&user));
            }
        }
        tracing::info!(
            "[Workspace] User {} joined workspace {} as {}",
            ctx.user_id(),
            p.workspace_id,
            role
        );

        let mut effects = vec![Effect::reply(
            "workspace:joined",
            serde_json::json!({
                "workspace": workspace,
                "role": role,
                "onlineMembers": online,
            }),
        )];
        if outcome == JoinOutcome::Joined {
            effects.push(Effect::to_room_except(
                room,
                "workspace:member-online",
                with_actor(ctx, serde_json::json!({ "workspaceId": p.workspace_id })),
            ));
        }
        Ok(effects)
    }

    fn leave(&self, ctx: &ConnectionContext, p: WorkspaceRef) -> Result<Vec<Effect>, BackendError> {
        let room = Room::workspace(p.workspace_id);
        if self.services.registry.leave(ctx.user_id(), ctx.socket_id, &room) != LeaveOutcome::Vacated {
            return Ok(Vec::new());
        }
        Ok(vec![Effect::to_room(
            room,
            "workspace:member-offline",
            with_actor(ctx, serde_json::json!({ "workspaceId": p.workspace_id })),
        )])
    }

    async fn member_update(
        &self,
        ctx: &ConnectionContext,
        p: MemberUpdatePayload,
    ) -> Result<Vec<Effect>, BackendError> {
        authorize(
            &self.services,
            ctx,
            ResourceContext::Workspace(p.workspace_id),
            "/workspace/:id/members",
            Verb::Put,
        )
        .await?;

        let store = &self.services.store;
        let mut member = store
            .get_workspace_membership(p.workspace_id, p.member_id)
            .await?
            .ok_or_else(|| BackendError::not_found("Workspace member"))?;
        member.can_admin = p.permissions.can_admin;
        member.can_edit = p.permissions.can_edit;
        member.can_view = p.permissions.can_view;
        let member = store.update_workspace_member(member).await?;
        tracing::info!(
            "[Workspace] User {} changed permissions of {} in {}",
            ctx.user_id(),
            p.member_id,
            p.workspace_id
        );

        let mut effects = vec![Effect::to_room(
            Room::workspace(p.workspace_id),
            "workspace:member-updated",
            with_actor(
                ctx,
                serde_json::json!({ "workspaceId": p.workspace_id, "member": member }),
            ),
        )];
        if p.member_id != ctx.user_id() {
            effects.push(Effect::Notify(
                p.member_id,
                NotificationDraft::new(
                    "role_changed",
                    Some(ctx.user_id()),
                    serde_json::json!({
                        "workspaceId": p.workspace_id,
                        "permissions": member,
                        "changedBy": ctx.identity.actor(),
                    }),
                ),
            ));
        }
        Ok(effects)
    }

    async fn settings_update(
        &self,
        ctx: &ConnectionContext,
        p: SettingsPayload,
    ) -> Result<Vec<Effect>, BackendError> {
        if !p.settings.is_object() {
            return Err(BackendError::validation("settings", "expected an object"));
        }
        authorize(
            &self.services,
            ctx,
            ResourceContext::Workspace(p.workspace_id),
            "/workspace/:id/settings",
            Verb::Put,
        )
        .await?;

        let workspace = self
            .services
            .store
            .update_workspace_settings(p.workspace_id, p.settings.clone())
            .await?;
        Ok(vec![Effect::to_room(
            Room::workspace(p.workspace_id),
            "workspace:settings-updated",
            with_actor(
                ctx,
                serde_json::json!({
                    "workspaceId": p.workspace_id,
                    "changes": p.settings,
                    "settings": workspace.settings,
                }),
            ),
        )])
    }

    async fn check_limits(&self, ctx: &ConnectionContext, p: WorkspaceRef) -> Result<Vec<Effect>, BackendError> {
        authorize(
            &self.services,
            ctx,
            ResourceContext::Workspace(p.workspace_id),
            "/workspace/:id/limits",
            Verb::Get,
        )
        .await?;
        let workspace = self.workspace(p.workspace_id).await?;
        let warnings = limit_warnings(&workspace);
        if !warnings.is_empty() {
            tracing::info!(
                "[Workspace] {} is near {} quota(s)",
                p.workspace_id,
                warnings.len()
            );
        }
        Ok(vec![Effect::reply(
            "workspace:limit-warnings",
            serde_json::json!({
                "workspaceId": p.workspace_id,
                "warnings": warnings,
                "usage": workspace.usage,
                "limits": workspace.limits,
            }),
        )])
    }
}

#[async_trait]
impl NamespaceController for WorkspaceController {
    fn namespace(&self) -> Namespace {
        Namespace::Workspace
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Effect>, BackendError> {
        match self.events.resolve(event)? {
            WorkspaceEvent::Join => self.join(ctx, parse_payload(payload)?).await,
            WorkspaceEvent::Leave => self.leave(ctx, parse_payload(payload)?),
            WorkspaceEvent::MemberUpdate => self.member_update(ctx, parse_payload(payload)?).await,
            WorkspaceEvent::SettingsUpdate => self.settings_update(ctx, parse_payload(payload)?).await,
            WorkspaceEvent::CheckLimits => self.check_limits(ctx, parse_payload(payload)?).await,
        }
    }

    async fn on_disconnect(&self, ctx: &ConnectionContext, outcome: &DisconnectOutcome) -> Vec<Effect> {
        outcome
            .rooms_vacated
            .iter()
            .filter_map(|room| room.resource_id("workspace").map(|id| (room, id)))
            .map(|(room, workspace_id)| {
                Effect::to_room(
                    room.clone(),
                    "workspace:member-offline",
                    with_actor(ctx, serde_json::json!({ "workspaceId": workspace_id })),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::namespaces::test_support::{event_names, Fixture};
    use crate::backend::store::DataStore;
    use crate::shared::{WorkspaceLimits, WorkspaceUsage};
    use serde_json::json;

    #[test]
    fn test_limit_warnings_threshold() {
        let mut workspace = Workspace {
            id: Uuid::nil(),
            name: "w".into(),
            owner_id: Uuid::nil(),
            settings: json!({}),
            limits: WorkspaceLimits {
                max_members: 10,
                max_boards: 100,
                max_storage_mb: 0,
            },
            usage: WorkspaceUsage {
                members: 9,
                boards: 89,
                storage_mb: 500,
            },
        };
        let warnings = limit_warnings(&workspace);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].resource, "members");
        assert_eq!(warnings[0].percentage, 90);

        workspace.usage.boards = 120;
        let over = limit_warnings(&workspace);
        assert_eq!(over[1].resource, "boards");
        assert_eq!(over[1].percentage, 120);
    }

    #[tokio::test]
    async fn test_join_reports_online_members() {
        let fx = Fixture::new().await;
        let controller = WorkspaceController::new(fx.services.clone());
        let (first, _rx) = fx.connect(Namespace::Workspace, &fx.owner);
        let (second, _rx) = fx.connect(Namespace::Workspace, &fx.member);
        let payload = json!({ "workspaceId": fx.workspace.id });

        controller.handle(&first, "workspace:join", payload.clone()).await.unwrap();
        let effects = controller.handle(&second, "workspace:join", payload).await.unwrap();

        assert_eq!(event_names(&effects), vec!["workspace:joined", "workspace:member-online"]);
        match &effects[0] {
            Effect::Reply(event) => {
                assert_eq!(event.data["onlineMembers"].as_array().unwrap().len(), 2);
                assert_eq!(event.data["role"], "member");
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_member_update_requires_admin() {
        let fx = Fixture::new().await;
        let controller = WorkspaceController::new(fx.services.clone());
        let (member, _rx) = fx.connect(Namespace::Workspace, &fx.member);
        let payload = json!({
            "workspaceId": fx.workspace.id,
            "memberId": fx.editor.id,
            "permissions": { "canView": true }
        });

        let err = controller.handle(&member, "workspace:member-update", payload.clone()).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let (owner, _rx) = fx.connect(Namespace::Workspace, &fx.owner);
        let effects = controller.handle(&owner, "workspace:member-update", payload).await.unwrap();
        assert_eq!(event_names(&effects), vec!["workspace:member-updated", "role_changed"]);

        let stored = fx
            .store
            .get_workspace_membership(fx.workspace.id, fx.editor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.can_edit);
    }

    #[tokio::test]
    async fn test_member_update_unknown_member() {
        let fx = Fixture::new().await;
        let controller = WorkspaceController::new(fx.services.clone());
        let (owner, _rx) = fx.connect(Namespace::Workspace, &fx.owner);

        let err = controller
            .handle(
                &owner,
                "workspace:member-update",
                json!({
                    "workspaceId": fx.workspace.id,
                    "memberId": fx.outsider.id,
                    "permissions": { "canView": true }
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_settings_update_rejects_non_object() {
        let fx = Fixture::new().await;
        let controller = WorkspaceController::new(fx.services.clone());
        let (owner, _rx) = fx.connect(Namespace::Workspace, &fx.owner);

        let err = controller
            .handle(
                &owner,
                "workspace:settings-update",
                json!({ "workspaceId": fx.workspace.id, "settings": [1, 2] }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let effects = controller
            .handle(
                &owner,
                "workspace:settings-update",
                json!({ "workspaceId": fx.workspace.id, "settings": { "theme": "dark" } }),
            )
            .await
            .unwrap();
        assert_eq!(event_names(&effects), vec!["workspace:settings-updated"]);
    }

    #[tokio::test]
    async fn test_disconnect_marks_member_offline() {
        let fx = Fixture::new().await;
        let controller = WorkspaceController::new(fx.services.clone());
        let (ctx, _rx) = fx.connect(Namespace::Workspace, &fx.member);
        fx.join(&ctx, &Room::workspace(fx.workspace.id));

        let outcome = fx.services.registry.on_disconnect(ctx.socket_id).unwrap();
        let effects = controller.on_disconnect(&ctx, &outcome).await;
        assert_eq!(event_names(&effects), vec!["workspace:member-offline"]);
    }
}
