//! Pool administration gated by role permissions.

use std::sync::Arc;

use tracing::info;

use profilehub_auth::rbac::Permission;
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_database::store::UserRoleStore;
use profilehub_entity::audit::{AuditAction, AuditEvent, AuditTarget};
use profilehub_entity::profile::ProfileStatus;
use profilehub_pool::{GroupDirectory, NewCustomPool, PoolStats, PoolUpdate};

use crate::context::RequestContext;
use crate::role::RoleService;

/// Administrative operations on pools and pool assignments.
#[derive(Debug, Clone)]
pub struct GroupService {
    directory: Arc<GroupDirectory>,
    role_store: Arc<dyn UserRoleStore>,
    roles: Arc<RoleService>,
}

impl GroupService {
    /// Creates a new group service.
    pub fn new(
        directory: Arc<GroupDirectory>,
        role_store: Arc<dyn UserRoleStore>,
        roles: Arc<RoleService>,
    ) -> Self {
        Self {
            directory,
            role_store,
            roles,
        }
    }

    /// Create a custom pool.
    pub async fn create_custom_pool(
        &self,
        ctx: &RequestContext,
        input: NewCustomPool,
    ) -> AppResult<PoolId> {
        self.roles
            .require_permission(ctx, Permission::CreateCustomGroups)
            .await?;
        self.directory
            .create_custom_pool(input, Some(ctx.user_id))
            .await
    }

    /// Add profiles to a custom pool.
    pub async fn add_members(
        &self,
        ctx: &RequestContext,
        pool_id: PoolId,
        profile_ids: &[ProfileId],
    ) -> AppResult<usize> {
        self.roles.require_permission(ctx, Permission::EditGroups).await?;
        self.directory
            .add_members(pool_id, profile_ids, Some(ctx.user_id))
            .await
    }

    /// Remove profiles from a custom pool.
    pub async fn remove_members(
        &self,
        ctx: &RequestContext,
        pool_id: PoolId,
        profile_ids: &[ProfileId],
    ) -> AppResult<usize> {
        self.roles.require_permission(ctx, Permission::EditGroups).await?;
        self.directory
            .remove_members(pool_id, profile_ids, Some(ctx.user_id))
            .await
    }

    /// Change capacity, selection mode or status.
    pub async fn update_pool(
        &self,
        ctx: &RequestContext,
        pool_id: PoolId,
        update: PoolUpdate,
    ) -> AppResult<PoolStats> {
        self.roles.require_permission(ctx, Permission::EditGroups).await?;
        self.directory
            .update_pool(pool_id, update, Some(ctx.user_id))
            .await
    }

    /// Delete a custom pool. Default pools are refused.
    pub async fn delete_pool(&self, ctx: &RequestContext, pool_id: PoolId) -> AppResult<()> {
        self.roles.require_permission(ctx, Permission::DeleteGroups).await?;
        self.directory.delete(pool_id, false, Some(ctx.user_id)).await
    }

    /// Let a user draw from the given pools.
    pub async fn assign_pools_to_user(
        &self,
        ctx: &RequestContext,
        user: UserId,
        pool_ids: &[PoolId],
    ) -> AppResult<()> {
        self.roles
            .require_permission(ctx, Permission::AssignGroupsToUsers)
            .await?;
        for pool_id in pool_ids {
            self.directory.get(*pool_id).await?;
        }

        self.role_store.assign_pools(user, pool_ids).await?;
        info!(actor_id = %ctx.user_id, user_id = %user, pools = pool_ids.len(), "Pools assigned");
        self.directory
            .record_audit(
                AuditEvent::new(AuditTarget::User, user, AuditAction::Update)
                    .with_actor(ctx.user_id)
                    .with_details(serde_json::json!({ "assigned_pools": pool_ids })),
            )
            .await;
        Ok(())
    }

    /// Revoke a user's access to the given pools. Returns the number revoked.
    pub async fn unassign_pools_from_user(
        &self,
        ctx: &RequestContext,
        user: UserId,
        pool_ids: &[PoolId],
    ) -> AppResult<u64> {
        self.roles
            .require_permission(ctx, Permission::AssignGroupsToUsers)
            .await?;
        let removed = self.role_store.unassign_pools(user, pool_ids).await?;
        info!(actor_id = %ctx.user_id, user_id = %user, removed, "Pools unassigned");
        self.directory
            .record_audit(
                AuditEvent::new(AuditTarget::User, user, AuditAction::Update)
                    .with_actor(ctx.user_id)
                    .with_details(serde_json::json!({ "unassigned_pools": pool_ids })),
            )
            .await;
        Ok(removed)
    }

    /// Usage statistics for any pool.
    pub async fn pool_stats(&self, ctx: &RequestContext, pool_id: PoolId) -> AppResult<PoolStats> {
        self.roles
            .require_permission(ctx, Permission::ViewAllStats)
            .await?;
        self.directory.stats(pool_id).await
    }

    /// Pools with a free session slot.
    pub async fn pools_with_available_capacity(
        &self,
        ctx: &RequestContext,
    ) -> AppResult<Vec<PoolId>> {
        self.roles
            .require_permission(ctx, Permission::ViewAllStats)
            .await?;
        self.directory.pools_with_available_capacity().await
    }

    /// Create the default pool of a newly created profile.
    pub async fn create_default_pool(
        &self,
        ctx: &RequestContext,
        profile_id: ProfileId,
    ) -> AppResult<PoolId> {
        self.roles
            .require_permission(ctx, Permission::CreateProfiles)
            .await?;
        self.directory.create_default_pool(profile_id).await
    }

    /// Detach a profile that is being deleted from every pool.
    pub async fn remove_profile(&self, ctx: &RequestContext, profile_id: ProfileId) -> AppResult<()> {
        self.roles
            .require_permission(ctx, Permission::DeleteProfiles)
            .await?;
        self.directory.remove_profile(profile_id, Some(ctx.user_id)).await
    }

    /// Propagate a profile (de)activation to cached pools.
    pub async fn set_profile_status(
        &self,
        ctx: &RequestContext,
        profile_id: ProfileId,
        status: ProfileStatus,
    ) -> AppResult<usize> {
        self.roles
            .require_permission(ctx, Permission::EditProfiles)
            .await?;
        let updated = self.directory.set_profile_status(profile_id, status).await?;

        let action = if status.is_active() {
            AuditAction::Activate
        } else {
            AuditAction::Deactivate
        };
        self.directory
            .record_audit(
                AuditEvent::new(AuditTarget::Profile, profile_id, action).with_actor(ctx.user_id),
            )
            .await;
        Ok(updated)
    }
}
