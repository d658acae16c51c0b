//! In-memory implementation of every store trait.
//!
//! Suitable for single-node deployments where durability is not required,
//! and for tests. Pool saves honour the same version guard as PostgreSQL.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::debug;

use profilehub_core::error::AppError;
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_entity::audit::AuditEvent;
use profilehub_entity::pool::{GroupKind, PoolRecord};
use profilehub_entity::profile::{Profile, ProfileStatus};
use profilehub_entity::user::UserRole;

use crate::store::{AuditSink, PoolStore, ProfileStore, UserRoleStore};

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<ProfileId, Profile>,
    pools: DashMap<PoolId, PoolRecord>,
    roles: DashMap<UserId, BTreeSet<UserRole>>,
    assignments: DashMap<UserId, HashSet<PoolId>>,
    audit: Mutex<Vec<AuditEvent>>,
    fail_pool_saves: AtomicBool,
    fail_audit: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub fn insert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    /// Change a stored profile's status. Returns whether it exists.
    pub fn set_profile_status(&self, id: ProfileId, status: ProfileStatus) -> bool {
        match self.profiles.get_mut(&id) {
            Some(mut profile) => {
                profile.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove a profile reference.
    pub fn remove_profile(&self, id: ProfileId) -> bool {
        self.profiles.remove(&id).is_some()
    }

    /// Snapshot of every recorded audit event, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit.lock().await.clone()
    }

    /// Make every subsequent pool insert or save fail with a database error.
    pub fn set_fail_pool_saves(&self, fail: bool) {
        self.fail_pool_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent audit `record` fail.
    pub fn set_fail_audit(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Stored copy of a pool without member refresh.
    pub fn stored_pool(&self, id: PoolId) -> Option<PoolRecord> {
        self.pools.get(&id).map(|r| r.clone())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load_profile(&self, id: ProfileId) -> AppResult<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| *p))
    }
}

#[async_trait]
impl PoolStore for MemoryStore {
    async fn load_pool(&self, id: PoolId) -> AppResult<Option<PoolRecord>> {
        let Some(mut record) = self.stored_pool(id) else {
            return Ok(None);
        };
        for member in &mut record.members {
            if let Some(profile) = self.profiles.get(&member.id) {
                member.status = profile.status;
            }
        }
        Ok(Some(record))
    }

    async fn insert_pool(&self, record: &PoolRecord) -> AppResult<()> {
        if self.fail_pool_saves.load(Ordering::SeqCst) {
            return Err(AppError::database("Injected pool save failure"));
        }

        match self.pools.entry(record.id) {
            Entry::Occupied(_) => Err(AppError::database(format!(
                "Pool {} already stored",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn save_pool(&self, record: &PoolRecord) -> AppResult<bool> {
        if self.fail_pool_saves.load(Ordering::SeqCst) {
            return Err(AppError::database("Injected pool save failure"));
        }

        let Some(mut stored) = self.pools.get_mut(&record.id) else {
            debug!(pool_id = %record.id, "Pool no longer stored, snapshot dropped");
            return Ok(false);
        };
        if stored.version >= record.version {
            debug!(
                pool_id = %record.id,
                stored = stored.version,
                incoming = record.version,
                "Skipping stale pool snapshot"
            );
            return Ok(false);
        }
        *stored = record.clone();
        Ok(true)
    }

    async fn delete_pool(&self, id: PoolId) -> AppResult<bool> {
        let removed = self.pools.remove(&id).is_some();
        if removed {
            for mut assigned in self.assignments.iter_mut() {
                assigned.remove(&id);
            }
        }
        Ok(removed)
    }

    async fn find_pools_containing_profile(&self, id: ProfileId) -> AppResult<Vec<PoolId>> {
        let mut ids: Vec<PoolId> = self
            .pools
            .iter()
            .filter(|r| r.contains(id))
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn exists_pool_name_case_insensitive(&self, name: &str) -> AppResult<bool> {
        let wanted = name.to_lowercase();
        Ok(self
            .pools
            .iter()
            .any(|r| r.kind == GroupKind::Custom && r.name.to_lowercase() == wanted))
    }

    async fn find_default_pool_for_profile(&self, id: ProfileId) -> AppResult<Option<PoolId>> {
        Ok(self
            .pools
            .iter()
            .find(|r| r.kind == GroupKind::Default && r.owner_profile_id == Some(id))
            .map(|r| r.id))
    }

    async fn reset_active_sessions(&self) -> AppResult<u64> {
        let mut changed = 0;
        for mut record in self.pools.iter_mut() {
            if record.active_sessions > 0 {
                record.active_sessions = 0;
                record.version += 1;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn find_pools_with_available_capacity(&self) -> AppResult<Vec<PoolId>> {
        let mut ids: Vec<PoolId> = self
            .pools
            .iter()
            .filter(|r| r.has_capacity())
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl UserRoleStore for MemoryStore {
    async fn load_user_roles(&self, user: UserId) -> AppResult<Option<BTreeSet<UserRole>>> {
        Ok(self
            .roles
            .get(&user)
            .map(|r| r.clone())
            .filter(|r| !r.is_empty()))
    }

    async fn save_user_roles(&self, user: UserId, roles: &BTreeSet<UserRole>) -> AppResult<()> {
        self.roles.insert(user, roles.clone());
        Ok(())
    }

    async fn is_user_assigned_to_pool(&self, user: UserId, pool: PoolId) -> AppResult<bool> {
        Ok(self
            .assignments
            .get(&user)
            .is_some_and(|pools| pools.contains(&pool)))
    }

    async fn assign_pools(&self, user: UserId, pools: &[PoolId]) -> AppResult<()> {
        self.assignments
            .entry(user)
            .or_default()
            .extend(pools.iter().copied());
        Ok(())
    }

    async fn unassign_pools(&self, user: UserId, pools: &[PoolId]) -> AppResult<u64> {
        let Some(mut assigned) = self.assignments.get_mut(&user) else {
            return Ok(0);
        };
        let removed = pools.iter().filter(|p| assigned.remove(*p)).count();
        Ok(removed as u64)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(AppError::internal("Injected audit failure"));
        }
        self.audit.lock().await.push(event);
        Ok(())
    }
}
