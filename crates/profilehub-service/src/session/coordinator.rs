//! Profile checkout: authorization, admission, selection and persistence.
//!
//! Every checkout follows the same order. The caller must be assigned to the
//! pool, the pool must be active, a session slot is taken before any profile
//! is picked, and the resulting state is persisted. When a later step fails
//! the slot is given back and the selection cursor is rewound, so a failed
//! checkout leaves the pool as it found it.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use profilehub_core::error::AppError;
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_database::store::UserRoleStore;
use profilehub_entity::audit::{AuditAction, AuditEvent, AuditTarget};
use profilehub_entity::profile::Profile;
use profilehub_entity::user::UserRole;
use profilehub_pool::{CheckoutMark, GroupDirectory, ProfilePool};

use crate::context::RequestContext;
use crate::role::RoleService;

/// Which profile a checkout should hand out.
#[derive(Debug, Clone, Copy)]
enum Pick {
    Next,
    Specific(ProfileId),
}

/// Coordinates profile checkout and session release across pools.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    directory: Arc<GroupDirectory>,
    role_store: Arc<dyn UserRoleStore>,
    roles: Arc<RoleService>,
}

impl SessionCoordinator {
    /// Creates a new session coordinator.
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

    /// Check out the pool's next profile according to its selection mode.
    pub async fn request_next_profile(
        &self,
        pool_id: PoolId,
        caller: &RequestContext,
    ) -> AppResult<Profile> {
        self.checkout(pool_id, Pick::Next, caller).await
    }

    /// Check out a named member of the pool.
    pub async fn request_specific_profile(
        &self,
        pool_id: PoolId,
        profile_id: ProfileId,
        caller: &RequestContext,
    ) -> AppResult<Profile> {
        self.checkout(pool_id, Pick::Specific(profile_id), caller)
            .await
    }

    /// Open a session on a pool without selecting a profile.
    ///
    /// When `profile_id` is given it must be an active member; that profile
    /// is returned.
    pub async fn start_session(
        &self,
        pool_id: PoolId,
        profile_id: Option<ProfileId>,
        caller: &RequestContext,
    ) -> AppResult<Option<Profile>> {
        let pool = self.admissible_pool(pool_id, caller).await?;
        pool.try_admit_session().await?;

        let profile = match profile_id {
            Some(id) => match pool.select_specific(id).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    pool.release_session().await;
                    debug!(pool_id = %pool_id, profile_id = %id, "Session start refused");
                    return Err(e);
                }
            },
            None => None,
        };

        self.persist_or_unwind(&pool, None).await?;
        info!(
            pool_id = %pool_id,
            user_id = %caller.user_id,
            profile_id = ?profile.map(|p| p.id),
            "Session started"
        );
        self.audit_session(pool_id, AuditAction::SessionStart, profile_id, caller.user_id)
            .await;
        Ok(profile)
    }

    /// Release one session slot.
    ///
    /// Releasing a pool with no active sessions is logged and otherwise
    /// ignored. Returns whether a slot was actually released. A release that
    /// cannot be saved still stands in memory and is reported as released.
    pub async fn end_session(
        &self,
        pool_id: PoolId,
        profile_id: Option<ProfileId>,
        caller: &RequestContext,
    ) -> AppResult<bool> {
        let pool = self.directory.get(pool_id).await?;

        let released = pool.release_session().await;
        if released {
            if let Err(e) = self.directory.persist(&pool).await {
                error!(pool_id = %pool_id, error = %e, "Session released but not persisted");
            }
            info!(
                pool_id = %pool_id,
                user_id = %caller.user_id,
                profile_id = ?profile_id,
                "Session ended"
            );
        } else {
            warn!(pool_id = %pool_id, profile_id = ?profile_id, "Session end with no active session");
        }

        self.audit_session(pool_id, AuditAction::SessionEnd, profile_id, caller.user_id)
            .await;
        Ok(released)
    }

    /// Replace a user's roles. See [`RoleService::change_user_role`].
    pub async fn change_user_role(
        &self,
        actor: &RequestContext,
        target: UserId,
        new_role: UserRole,
    ) -> AppResult<()> {
        self.roles.change_user_role(actor, target, new_role).await
    }

    /// Roles the acting user may hand out.
    pub async fn available_roles(&self, actor: &RequestContext) -> AppResult<BTreeSet<UserRole>> {
        self.roles.available_roles(actor).await
    }

    /// Sessions currently checked out from a pool.
    pub async fn active_sessions(&self, pool_id: PoolId) -> AppResult<u32> {
        Ok(self.directory.get(pool_id).await?.active_sessions().await)
    }

    /// Members the caller could currently be handed, in order.
    pub async fn available_profiles(
        &self,
        pool_id: PoolId,
        caller: &RequestContext,
    ) -> AppResult<Vec<Profile>> {
        let pool = self.admissible_pool(pool_id, caller).await?;
        Ok(pool.eligible_members().await)
    }

    async fn checkout(
        &self,
        pool_id: PoolId,
        pick: Pick,
        caller: &RequestContext,
    ) -> AppResult<Profile> {
        let pool = self.admissible_pool(pool_id, caller).await?;

        pool.try_admit_session().await.inspect_err(|e| {
            debug!(pool_id = %pool_id, reason = %e, "Admission refused");
        })?;

        let mark = pool.checkout_mark().await;
        let picked = match pick {
            Pick::Next => pool.select_next().await.ok_or_else(|| {
                AppError::no_eligible_profile(format!("Pool {pool_id} has no active profiles"))
            }),
            Pick::Specific(id) => pool.select_specific(id).await,
        };
        let profile = match picked {
            Ok(profile) => profile,
            Err(e) => {
                pool.release_session().await;
                debug!(pool_id = %pool_id, reason = %e, "Selection failed, admission released");
                return Err(e);
            }
        };

        pool.touch_last_used().await;
        self.persist_or_unwind(&pool, Some(mark)).await?;

        info!(
            pool_id = %pool_id,
            profile_id = %profile.id,
            user_id = %caller.user_id,
            "Profile checked out"
        );
        self.directory
            .record_audit(
                AuditEvent::new(AuditTarget::Pool, pool_id, AuditAction::Use)
                    .with_actor(caller.user_id)
                    .with_details(serde_json::json!({ "profile_id": profile.id })),
            )
            .await;
        Ok(profile)
    }

    /// Resolve a pool the caller may use right now.
    async fn admissible_pool(
        &self,
        pool_id: PoolId,
        caller: &RequestContext,
    ) -> AppResult<Arc<ProfilePool>> {
        if !self
            .role_store
            .is_user_assigned_to_pool(caller.user_id, pool_id)
            .await?
        {
            return Err(AppError::unauthorized(format!(
                "User {} is not assigned to pool {pool_id}",
                caller.user_id
            )));
        }

        let pool = self.directory.get(pool_id).await?;
        if !pool.is_active().await {
            return Err(AppError::not_found(format!("Pool {pool_id} is not active")));
        }
        Ok(pool)
    }

    async fn persist_or_unwind(
        &self,
        pool: &ProfilePool,
        mark: Option<CheckoutMark>,
    ) -> AppResult<()> {
        if let Err(e) = self.directory.persist(pool).await {
            pool.release_session().await;
            if let Some(mark) = mark {
                pool.rewind_checkout(mark).await;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn audit_session(
        &self,
        pool_id: PoolId,
        action: AuditAction,
        profile_id: Option<ProfileId>,
        actor: UserId,
    ) {
        self.directory
            .record_audit(
                AuditEvent::new(AuditTarget::Pool, pool_id, action)
                    .with_actor(actor)
                    .with_details(serde_json::json!({ "profile_id": profile_id })),
            )
            .await;
    }
}
