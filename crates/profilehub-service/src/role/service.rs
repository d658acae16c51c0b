//! Role changes, additional roles and permission queries.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use profilehub_auth::rbac::{Permission, RbacEnforcer};
use profilehub_core::error::AppError;
use profilehub_core::result::AppResult;
use profilehub_core::types::UserId;
use profilehub_database::store::{AuditSink, UserRoleStore};
use profilehub_entity::audit::{AuditAction, AuditEvent, AuditTarget};
use profilehub_entity::user::UserRole;

use crate::context::RequestContext;

/// Manages which roles each user holds.
#[derive(Debug, Clone)]
pub struct RoleService {
    role_store: Arc<dyn UserRoleStore>,
    audit: Arc<dyn AuditSink>,
    rbac: Arc<RbacEnforcer>,
}

impl RoleService {
    /// Creates a new role service.
    pub fn new(
        role_store: Arc<dyn UserRoleStore>,
        audit: Arc<dyn AuditSink>,
        rbac: Arc<RbacEnforcer>,
    ) -> Self {
        Self {
            role_store,
            audit,
            rbac,
        }
    }

    /// The enforcer used for every check.
    pub fn rbac(&self) -> &RbacEnforcer {
        &self.rbac
    }

    /// Roles held by a user. Unknown users hold none.
    pub async fn roles_of(&self, user: UserId) -> AppResult<BTreeSet<UserRole>> {
        Ok(self.role_store.load_user_roles(user).await?.unwrap_or_default())
    }

    /// Fail with `Unauthorized` unless the acting user holds `permission`.
    pub async fn require_permission(
        &self,
        ctx: &RequestContext,
        permission: Permission,
    ) -> AppResult<()> {
        let roles = self.roles_of(ctx.user_id).await?;
        self.rbac.require_permission(&roles, permission)
    }

    /// Replace the target's roles with exactly `new_role`.
    ///
    /// A user with no roles yet receives `new_role` as their first role.
    pub async fn change_user_role(
        &self,
        ctx: &RequestContext,
        target: UserId,
        new_role: UserRole,
    ) -> AppResult<()> {
        let actor_roles = self.roles_of(ctx.user_id).await?;
        self.rbac.require_role_change(&actor_roles, new_role)?;

        let previous = self.roles_of(target).await?;
        let roles = BTreeSet::from([new_role]);
        self.role_store.save_user_roles(target, &roles).await?;

        info!(
            actor_id = %ctx.user_id,
            target_id = %target,
            new_role = %new_role,
            "User role changed"
        );
        self.record_role_change(ctx, target, &previous, &roles).await;
        Ok(())
    }

    /// Grant one more role to a user who already holds at least one.
    pub async fn add_additional_role(
        &self,
        ctx: &RequestContext,
        target: UserId,
        role: UserRole,
    ) -> AppResult<()> {
        let actor_roles = self.roles_of(ctx.user_id).await?;
        self.rbac.require_role_change(&actor_roles, role)?;

        let previous = self.existing_roles(target).await?;
        if previous.contains(&role) {
            return Err(AppError::already_exists(format!(
                "User {target} already has role {role}"
            )));
        }

        let mut roles = previous.clone();
        roles.insert(role);
        self.role_store.save_user_roles(target, &roles).await?;

        info!(actor_id = %ctx.user_id, target_id = %target, role = %role, "Role added");
        self.record_role_change(ctx, target, &previous, &roles).await;
        Ok(())
    }

    /// Take one role away. A user always keeps at least one role.
    pub async fn remove_additional_role(
        &self,
        ctx: &RequestContext,
        target: UserId,
        role: UserRole,
    ) -> AppResult<()> {
        let actor_roles = self.roles_of(ctx.user_id).await?;
        self.rbac.require_role_change(&actor_roles, role)?;

        let previous = self.existing_roles(target).await?;
        if !previous.contains(&role) {
            return Err(AppError::not_found(format!(
                "User {target} does not have role {role}"
            )));
        }
        if previous.len() == 1 {
            return Err(AppError::invalid_operation(format!(
                "Cannot remove the only role of user {target}"
            )));
        }

        let mut roles = previous.clone();
        roles.remove(&role);
        self.role_store.save_user_roles(target, &roles).await?;

        info!(actor_id = %ctx.user_id, target_id = %target, role = %role, "Role removed");
        self.record_role_change(ctx, target, &previous, &roles).await;
        Ok(())
    }

    /// Roles the acting user may hand out.
    pub async fn available_roles(&self, ctx: &RequestContext) -> AppResult<BTreeSet<UserRole>> {
        let roles = self.roles_of(ctx.user_id).await?;
        Ok(self.rbac.resolver().available_roles_for(&roles))
    }

    /// Effective permissions of a user.
    pub async fn user_permissions(&self, user: UserId) -> AppResult<BTreeSet<Permission>> {
        let roles = self.roles_of(user).await?;
        Ok(self.rbac.resolver().union_permissions(&roles))
    }

    /// Whether a user holds a permission.
    pub async fn has_permission(&self, user: UserId, permission: Permission) -> AppResult<bool> {
        let roles = self.roles_of(user).await?;
        Ok(self.rbac.has_permission(&roles, permission))
    }

    /// Give a user their first role without an acting user.
    ///
    /// Operator-only: used to seed the first super admin. Fails if the user
    /// already holds roles.
    pub async fn seed_role(&self, target: UserId, role: UserRole) -> AppResult<()> {
        if self.role_store.load_user_roles(target).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "User {target} already has roles"
            )));
        }
        let roles = BTreeSet::from([role]);
        self.role_store.save_user_roles(target, &roles).await?;
        info!(target_id = %target, role = %role, "Initial role seeded");

        let event = AuditEvent::new(AuditTarget::User, target, AuditAction::RoleChange)
            .with_details(serde_json::json!({ "from": [], "to": roles }));
        self.record_audit(event).await;
        Ok(())
    }

    async fn existing_roles(&self, target: UserId) -> AppResult<BTreeSet<UserRole>> {
        self.role_store
            .load_user_roles(target)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {target} not found")))
    }

    async fn record_role_change(
        &self,
        ctx: &RequestContext,
        target: UserId,
        from: &BTreeSet<UserRole>,
        to: &BTreeSet<UserRole>,
    ) {
        let event = AuditEvent::new(AuditTarget::User, target, AuditAction::RoleChange)
            .with_actor(ctx.user_id)
            .with_details(serde_json::json!({ "from": from, "to": to }));
        self.record_audit(event).await;
    }

    async fn record_audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(event).await {
            tracing::error!(error = %e, "Failed to record role audit event");
        }
    }
}
