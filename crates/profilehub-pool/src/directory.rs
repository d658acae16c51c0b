//! The group directory: every pool known to the process.
//!
//! Pools are loaded lazily from the [`PoolStore`] and cached for the life of
//! the process so that all callers share one lock per pool. The directory is
//! the only component that writes pool state to the store.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use validator::Validate;

use profilehub_core::config::pool::PoolConfig;
use profilehub_core::error::AppError;
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_database::store::{AuditSink, PoolStore, ProfileStore};
use profilehub_entity::audit::{AuditAction, AuditEvent, AuditTarget};
use profilehub_entity::pool::{PoolRecord, PoolStatus, SelectionMode};
use profilehub_entity::profile::{Profile, ProfileStatus};

use crate::pool::{PoolSettings, PoolStats, ProfilePool};

/// Input for creating a custom pool.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomPool {
    /// Display name, unique among custom pools regardless of case.
    #[validate(length(min = 1, max = 255, message = "Pool name must be 1-255 characters"))]
    pub name: String,
    /// Initial members in selection order.
    #[serde(default)]
    pub member_ids: Vec<ProfileId>,
    /// Capacity.
    #[validate(range(min = 1, message = "max_concurrent_sessions must be at least 1"))]
    pub max_concurrent_sessions: u32,
    /// Selection mode.
    #[serde(default)]
    pub selection_mode: SelectionMode,
}

/// Partial update of a pool's settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PoolUpdate {
    /// New capacity.
    #[validate(range(min = 1, message = "max_concurrent_sessions must be at least 1"))]
    pub max_concurrent_sessions: Option<u32>,
    /// New selection mode.
    pub selection_mode: Option<SelectionMode>,
    /// New status.
    pub status: Option<PoolStatus>,
}

impl PoolUpdate {
    fn is_empty(&self) -> bool {
        self.max_concurrent_sessions.is_none()
            && self.selection_mode.is_none()
            && self.status.is_none()
    }
}

/// Settings applied to newly created default pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolDefaults {
    /// Capacity of a default pool.
    pub capacity: u32,
    /// Selection mode of a default pool.
    pub selection_mode: SelectionMode,
}

impl Default for PoolDefaults {
    fn default() -> Self {
        Self {
            capacity: 1,
            selection_mode: SelectionMode::Random,
        }
    }
}

impl TryFrom<&PoolConfig> for PoolDefaults {
    type Error = AppError;

    fn try_from(config: &PoolConfig) -> Result<Self, Self::Error> {
        if config.default_capacity < 1 {
            return Err(AppError::configuration(
                "pools.default_capacity must be at least 1",
            ));
        }
        Ok(Self {
            capacity: config.default_capacity,
            selection_mode: config.default_selection_mode.parse()?,
        })
    }
}

/// Registry of pools backed by the store traits.
pub struct GroupDirectory {
    pools: DashMap<PoolId, Arc<ProfilePool>>,
    pool_store: Arc<dyn PoolStore>,
    profile_store: Arc<dyn ProfileStore>,
    audit: Arc<dyn AuditSink>,
    defaults: PoolDefaults,
    /// Serializes creation so name and owner uniqueness checks cannot race.
    create_lock: Mutex<()>,
}

impl std::fmt::Debug for GroupDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupDirectory")
            .field("cached_pools", &self.pools.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl GroupDirectory {
    /// Creates a new directory.
    pub fn new(
        pool_store: Arc<dyn PoolStore>,
        profile_store: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditSink>,
        defaults: PoolDefaults,
    ) -> Self {
        Self {
            pools: DashMap::new(),
            pool_store,
            profile_store,
            audit,
            defaults,
            create_lock: Mutex::new(()),
        }
    }

    /// Look up a pool, loading it from the store on first use.
    pub async fn get(&self, pool_id: PoolId) -> AppResult<Arc<ProfilePool>> {
        if let Some(pool) = self.pools.get(&pool_id) {
            return Ok(Arc::clone(pool.value()));
        }

        let record = self
            .pool_store
            .load_pool(pool_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Pool {pool_id} not found")))?;

        // Another caller may have loaded it meanwhile; keep whichever landed first.
        let pool = self
            .pools
            .entry(pool_id)
            .or_insert_with(|| Arc::new(ProfilePool::from_record(record)))
            .clone();
        debug!(pool_id = %pool_id, "Pool loaded into directory");
        Ok(pool)
    }

    /// Create an administrator-managed pool.
    pub async fn create_custom_pool(
        &self,
        input: NewCustomPool,
        actor: Option<UserId>,
    ) -> AppResult<PoolId> {
        input.validate()?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Pool name must not be blank"));
        }

        let _guard = self.create_lock.lock().await;

        if self.pool_store.exists_pool_name_case_insensitive(&name).await? {
            return Err(AppError::already_exists(format!(
                "A pool named '{name}' already exists"
            )));
        }

        let members = self.resolve_members(&input.member_ids).await?;
        let record = PoolRecord::new_custom(
            name,
            members,
            input.max_concurrent_sessions,
            input.selection_mode,
        );
        let pool_id = record.id;
        let details = serde_json::json!({
            "name": record.name,
            "members": record.members.len(),
            "max_concurrent_sessions": record.max_concurrent_sessions,
            "selection_mode": record.selection_mode,
        });

        self.pool_store.insert_pool(&record).await?;
        self.pools
            .insert(pool_id, Arc::new(ProfilePool::from_record(record)));

        info!(pool_id = %pool_id, actor = ?actor, "Custom pool created");
        self.record_audit(pool_event(pool_id, AuditAction::Create, actor).with_details(details))
            .await;
        Ok(pool_id)
    }

    /// Create the default pool for a newly created profile.
    pub async fn create_default_pool(&self, owner: ProfileId) -> AppResult<PoolId> {
        let _guard = self.create_lock.lock().await;

        if let Some(existing) = self.pool_store.find_default_pool_for_profile(owner).await? {
            return Err(AppError::already_exists(format!(
                "Profile {owner} already has default pool {existing}"
            )));
        }

        let profile = self
            .profile_store
            .load_profile(owner)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Profile {owner} not found")))?;

        let record = PoolRecord::new_default(
            profile,
            self.defaults.capacity,
            self.defaults.selection_mode,
        );
        let pool_id = record.id;

        self.pool_store.insert_pool(&record).await?;
        self.pools
            .insert(pool_id, Arc::new(ProfilePool::from_record(record)));

        info!(pool_id = %pool_id, profile_id = %owner, "Default pool created");
        self.record_audit(pool_event(pool_id, AuditAction::Create, None).with_details(
            serde_json::json!({ "default_for": owner }),
        ))
        .await;
        Ok(pool_id)
    }

    /// Delete a pool.
    ///
    /// Default pools are only removed when `allow_default_deletion` is set,
    /// which is reserved for the owning profile's deletion.
    pub async fn delete(
        &self,
        pool_id: PoolId,
        allow_default_deletion: bool,
        actor: Option<UserId>,
    ) -> AppResult<()> {
        let pool = self.get(pool_id).await?;

        if pool.is_default() {
            if !allow_default_deletion {
                return Err(AppError::invalid_operation(format!(
                    "Pool {pool_id} is a default pool and is deleted with its profile"
                )));
            }
            warn!(
                pool_id = %pool_id,
                owner = ?pool.owner_profile_id(),
                "Deleting default pool"
            );
        }

        self.pool_store.delete_pool(pool_id).await?;
        pool.mark_deleted().await;
        if let Some((_, cached)) = self.pools.remove(&pool_id) {
            cached.mark_deleted().await;
        }

        info!(pool_id = %pool_id, actor = ?actor, "Pool deleted");
        self.record_audit(pool_event(pool_id, AuditAction::Delete, actor).with_details(
            serde_json::json!({ "kind": pool.kind() }),
        ))
        .await;
        Ok(())
    }

    /// Add existing, active profiles to a custom pool.
    pub async fn add_members(
        &self,
        pool_id: PoolId,
        profile_ids: &[ProfileId],
        actor: Option<UserId>,
    ) -> AppResult<usize> {
        let pool = self.get(pool_id).await?;
        if pool.is_default() {
            return Err(AppError::invalid_operation(format!(
                "Cannot change membership of default pool {pool_id}"
            )));
        }

        let profiles = self.resolve_members(profile_ids).await?;
        let previous = pool.settings().await;
        let added = pool.add_members(&profiles).await?;
        self.persist_or_restore(&pool, previous).await?;

        self.record_audit(pool_event(pool_id, AuditAction::Update, actor).with_details(
            serde_json::json!({ "added_members": profile_ids }),
        ))
        .await;
        Ok(added)
    }

    /// Remove profiles from a custom pool.
    pub async fn remove_members(
        &self,
        pool_id: PoolId,
        profile_ids: &[ProfileId],
        actor: Option<UserId>,
    ) -> AppResult<usize> {
        let pool = self.get(pool_id).await?;
        if pool.is_default() {
            return Err(AppError::invalid_operation(format!(
                "Cannot change membership of default pool {pool_id}"
            )));
        }

        let previous = pool.settings().await;
        let removed = pool.remove_members(profile_ids).await?;
        if removed == 0 {
            warn!(pool_id = %pool_id, "None of the given profiles are members");
        }
        self.persist_or_restore(&pool, previous).await?;

        self.record_audit(pool_event(pool_id, AuditAction::Update, actor).with_details(
            serde_json::json!({ "removed_members": profile_ids }),
        ))
        .await;
        Ok(removed)
    }

    /// Apply a settings update and return the resulting statistics.
    pub async fn update_pool(
        &self,
        pool_id: PoolId,
        update: PoolUpdate,
        actor: Option<UserId>,
    ) -> AppResult<PoolStats> {
        update.validate()?;
        let pool = self.get(pool_id).await?;
        if update.is_empty() {
            return Ok(pool.stats().await);
        }

        let previous = pool.settings().await;
        if let Err(e) = apply_update(&pool, &update).await {
            pool.restore_settings(previous).await;
            return Err(e);
        }
        self.persist_or_restore(&pool, previous).await?;

        let action = match update.status {
            Some(PoolStatus::Active) => AuditAction::Activate,
            Some(PoolStatus::Inactive | PoolStatus::Suspended) => AuditAction::Deactivate,
            None => AuditAction::Update,
        };
        info!(pool_id = %pool_id, action = %action, "Pool updated");
        let details = serde_json::to_value(&update)
            .inspect_err(|e| {
                warn!(pool_id = %pool_id, error = %e, "Pool update not serializable, audit details dropped");
            })
            .unwrap_or_default();
        self.record_audit(pool_event(pool_id, action, actor).with_details(details))
            .await;
        Ok(pool.stats().await)
    }

    /// Pools that list the profile as a member.
    pub async fn pools_for_profile(&self, profile_id: ProfileId) -> AppResult<Vec<PoolId>> {
        self.pool_store
            .find_pools_containing_profile(profile_id)
            .await
    }

    /// The profile's default pool, if it has one.
    pub async fn default_pool_for(&self, profile_id: ProfileId) -> AppResult<Option<PoolId>> {
        self.pool_store
            .find_default_pool_for_profile(profile_id)
            .await
    }

    /// Delete the profile's default pool. Returns whether one existed.
    pub async fn delete_default_pool_for(
        &self,
        profile_id: ProfileId,
        actor: Option<UserId>,
    ) -> AppResult<bool> {
        match self.default_pool_for(profile_id).await? {
            Some(pool_id) => {
                self.delete(pool_id, true, actor).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Detach a profile that is being deleted from every pool.
    ///
    /// The profile leaves each custom pool it belongs to and its default
    /// pool is deleted.
    pub async fn remove_profile(
        &self,
        profile_id: ProfileId,
        actor: Option<UserId>,
    ) -> AppResult<()> {
        for pool_id in self.pools_for_profile(profile_id).await? {
            let pool = self.get(pool_id).await?;
            if !pool.is_default() {
                self.remove_members(pool_id, &[profile_id], actor).await?;
            }
        }
        self.delete_default_pool_for(profile_id, actor).await?;
        info!(profile_id = %profile_id, "Profile detached from all pools");
        Ok(())
    }

    /// Propagate a profile status change to the cached pools that hold it.
    ///
    /// Returns the number of cached pools updated. Pools not yet cached pick
    /// the status up from the store when first loaded.
    pub async fn set_profile_status(
        &self,
        profile_id: ProfileId,
        status: ProfileStatus,
    ) -> AppResult<usize> {
        let mut updated = 0;
        for pool_id in self.pools_for_profile(profile_id).await? {
            let cached = self.pools.get(&pool_id).map(|p| Arc::clone(p.value()));
            if let Some(pool) = cached {
                if pool.set_member_status(profile_id, status).await {
                    updated += 1;
                }
            }
        }
        debug!(profile_id = %profile_id, %status, updated, "Profile status propagated");
        Ok(updated)
    }

    /// Write a pool's current state to the store.
    ///
    /// A newer snapshot already in the store wins; that is not an error.
    /// A pool that was deleted is never written back and yields `NotFound`.
    pub async fn persist(&self, pool: &ProfilePool) -> AppResult<()> {
        let record = pool.persistable_snapshot().await?;
        let applied = self.pool_store.save_pool(&record).await.inspect_err(|e| {
            error!(pool_id = %record.id, version = record.version, error = %e, "Failed to persist pool");
        })?;
        if applied {
            return Ok(());
        }

        if self.pool_store.load_pool(record.id).await?.is_none() {
            pool.mark_deleted().await;
            if let Some((_, cached)) = self.pools.remove(&record.id) {
                cached.mark_deleted().await;
            }
            warn!(pool_id = %record.id, "Pool vanished from the store, dropped from the directory");
            return Err(AppError::not_found(format!("Pool {} has been deleted", record.id)));
        }
        debug!(pool_id = %record.id, version = record.version, "Newer pool state already stored");
        Ok(())
    }

    /// Persist an administrative change, undoing it in memory if the write fails.
    async fn persist_or_restore(&self, pool: &ProfilePool, previous: PoolSettings) -> AppResult<()> {
        if let Err(e) = self.persist(pool).await {
            pool.restore_settings(previous).await;
            return Err(e);
        }
        Ok(())
    }

    /// Active pools with at least one free session slot.
    pub async fn pools_with_available_capacity(&self) -> AppResult<Vec<PoolId>> {
        self.pool_store.find_pools_with_available_capacity().await
    }

    /// Usage statistics for a pool.
    pub async fn stats(&self, pool_id: PoolId) -> AppResult<PoolStats> {
        Ok(self.get(pool_id).await?.stats().await)
    }

    /// Drop every cached pool so the next access reloads from the store.
    pub fn clear_cache(&self) {
        self.pools.clear();
    }

    /// Record an audit event. Failures are logged and never propagated.
    pub async fn record_audit(&self, event: AuditEvent) {
        let action = event.action;
        let target_id = event.target_id;
        if let Err(e) = self.audit.record(event).await {
            error!(%action, %target_id, error = %e, "Failed to record audit event");
        }
    }

    async fn resolve_members(&self, profile_ids: &[ProfileId]) -> AppResult<Vec<Profile>> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(profile_ids.len());

        for id in profile_ids.iter().copied().filter(|id| seen.insert(*id)) {
            let profile = self
                .profile_store
                .load_profile(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Profile {id} not found")))?;
            if !profile.is_active() {
                return Err(AppError::validation(format!("Profile {id} is not active")));
            }
            members.push(profile);
        }
        Ok(members)
    }
}

async fn apply_update(pool: &ProfilePool, update: &PoolUpdate) -> AppResult<()> {
    if let Some(max) = update.max_concurrent_sessions {
        pool.set_capacity(max).await?;
    }
    if let Some(mode) = update.selection_mode {
        pool.set_selection_mode(mode).await?;
    }
    if let Some(status) = update.status {
        pool.set_status(status).await?;
    }
    Ok(())
}

fn pool_event(pool_id: PoolId, action: AuditAction, actor: Option<UserId>) -> AuditEvent {
    let event = AuditEvent::new(AuditTarget::Pool, pool_id, action);
    match actor {
        Some(actor) => event.with_actor(actor),
        None => event,
    }
}
