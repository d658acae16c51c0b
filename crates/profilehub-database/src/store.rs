//! Store traits implemented by every persistence backend.
//!
//! Implementations must be thread-safe. None of these calls are made while a
//! pool lock is held.

use std::collections::BTreeSet;

use async_trait::async_trait;

use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_entity::audit::AuditEvent;
use profilehub_entity::pool::PoolRecord;
use profilehub_entity::profile::Profile;
use profilehub_entity::user::UserRole;

/// Read access to profile references.
#[async_trait]
pub trait ProfileStore: Send + Sync + std::fmt::Debug {
    /// Load a profile by ID.
    async fn load_profile(&self, id: ProfileId) -> AppResult<Option<Profile>>;

    /// Check whether a profile exists.
    async fn exists(&self, id: ProfileId) -> AppResult<bool> {
        Ok(self.load_profile(id).await?.is_some())
    }
}

/// Durable pool state.
#[async_trait]
pub trait PoolStore: Send + Sync + std::fmt::Debug {
    /// Load a pool with its members in insertion order.
    async fn load_pool(&self, id: PoolId) -> AppResult<Option<PoolRecord>>;

    /// Insert a newly created pool. Fails if the id is taken.
    async fn insert_pool(&self, record: &PoolRecord) -> AppResult<()>;

    /// Update an existing pool.
    ///
    /// Never inserts. A missing row, or a stored row with a version greater
    /// than or equal to `record.version`, is left untouched. Returns whether
    /// the write was applied.
    async fn save_pool(&self, record: &PoolRecord) -> AppResult<bool>;

    /// Delete a pool and its memberships. Returns whether it existed.
    async fn delete_pool(&self, id: PoolId) -> AppResult<bool>;

    /// All pools that list the profile as a member.
    async fn find_pools_containing_profile(&self, id: ProfileId) -> AppResult<Vec<PoolId>>;

    /// Case-insensitive name lookup among custom pools.
    async fn exists_pool_name_case_insensitive(&self, name: &str) -> AppResult<bool>;

    /// The default pool owned by a profile.
    async fn find_default_pool_for_profile(&self, id: ProfileId) -> AppResult<Option<PoolId>>;

    /// Zero every pool's active session counter. Returns the number of pools changed.
    async fn reset_active_sessions(&self) -> AppResult<u64>;

    /// Active pools with at least one free session slot.
    async fn find_pools_with_available_capacity(&self) -> AppResult<Vec<PoolId>>;
}

/// User role and pool assignment storage.
#[async_trait]
pub trait UserRoleStore: Send + Sync + std::fmt::Debug {
    /// Load a user's roles. `None` if the user is unknown.
    async fn load_user_roles(&self, user: UserId) -> AppResult<Option<BTreeSet<UserRole>>>;

    /// Replace a user's role set.
    async fn save_user_roles(&self, user: UserId, roles: &BTreeSet<UserRole>) -> AppResult<()>;

    /// Whether the user may draw from the pool.
    async fn is_user_assigned_to_pool(&self, user: UserId, pool: PoolId) -> AppResult<bool>;

    /// Grant the user access to each pool. Existing assignments are kept.
    async fn assign_pools(&self, user: UserId, pools: &[PoolId]) -> AppResult<()>;

    /// Revoke the user's access to each pool. Returns the number removed.
    async fn unassign_pools(&self, user: UserId, pools: &[PoolId]) -> AppResult<u64>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Record one event.
    async fn record(&self, event: AuditEvent) -> AppResult<()>;
}
