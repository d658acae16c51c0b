//! Per-pool selection and session admission.
//!
//! Each [`ProfilePool`] keeps its mutable state behind one Tokio mutex and
//! every public operation is a single critical section. Different pools never
//! share a lock. No operation performs I/O while holding the lock; callers
//! take a [`PoolRecord`] snapshot and persist it afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use profilehub_core::error::AppError;
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId};
use profilehub_entity::pool::{GroupKind, PoolRecord, PoolStatus, SelectionMode};
use profilehub_entity::profile::{Profile, ProfileStatus};

use crate::selection;

/// Mutable pool state.
#[derive(Debug)]
struct PoolState {
    name: String,
    members: Vec<Profile>,
    selection_mode: SelectionMode,
    cursor: u32,
    max_concurrent_sessions: u32,
    active_sessions: u32,
    status: PoolStatus,
    last_used: Option<DateTime<Utc>>,
    version: u64,
    updated_at: DateTime<Utc>,
    /// Set once the pool is deleted. A deleted pool refuses every change.
    deleted: bool,
}

impl PoolState {
    fn eligible(&self) -> Vec<Profile> {
        self.members.iter().copied().filter(Profile::is_active).collect()
    }

    fn bump(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn ensure_live(&self, pool_id: PoolId) -> AppResult<()> {
        if self.deleted {
            return Err(AppError::not_found(format!("Pool {pool_id} has been deleted")));
        }
        Ok(())
    }
}

/// Administrative settings captured before a change so it can be undone.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    members: Vec<Profile>,
    selection_mode: SelectionMode,
    cursor: u32,
    max_concurrent_sessions: u32,
    status: PoolStatus,
}

/// Selection state captured before a checkout.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutMark {
    cursor: u32,
    last_used: Option<DateTime<Utc>>,
}

/// Point-in-time usage statistics for one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Pool identifier.
    pub pool_id: PoolId,
    /// Display name.
    pub name: String,
    /// Default or custom.
    pub kind: GroupKind,
    /// Pool availability.
    pub status: PoolStatus,
    /// Selection mode.
    pub selection_mode: SelectionMode,
    /// Number of members.
    pub member_count: usize,
    /// Number of members that can be selected.
    pub active_member_count: usize,
    /// Sessions currently checked out.
    pub active_sessions: u32,
    /// Capacity.
    pub max_concurrent_sessions: u32,
    /// Free session slots.
    pub available_slots: u32,
    /// Share of capacity in use, 0 to 100.
    pub utilization_percent: f64,
    /// Last successful checkout.
    pub last_used: Option<DateTime<Utc>>,
}

/// A pool of profiles with a session capacity.
#[derive(Debug)]
pub struct ProfilePool {
    id: PoolId,
    kind: GroupKind,
    owner_profile_id: Option<ProfileId>,
    created_at: DateTime<Utc>,
    state: Mutex<PoolState>,
}

impl ProfilePool {
    /// Build a pool from its persisted record.
    ///
    /// Out-of-range values from storage are clamped so the in-memory
    /// invariants hold from the start.
    pub fn from_record(record: PoolRecord) -> Self {
        let max_concurrent_sessions = record.max_concurrent_sessions.max(1);
        let active_sessions = record.active_sessions.min(max_concurrent_sessions);
        if active_sessions != record.active_sessions {
            warn!(
                pool_id = %record.id,
                stored = record.active_sessions,
                max = max_concurrent_sessions,
                "Stored active sessions exceed capacity, clamping"
            );
        }

        Self {
            id: record.id,
            kind: record.kind,
            owner_profile_id: record.owner_profile_id,
            created_at: record.created_at,
            state: Mutex::new(PoolState {
                name: record.name,
                members: record.members,
                selection_mode: record.selection_mode,
                cursor: record.cursor,
                max_concurrent_sessions,
                active_sessions,
                status: record.status,
                last_used: record.last_used,
                version: record.version,
                updated_at: record.updated_at,
                deleted: false,
            }),
        }
    }

    /// Pool identifier.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Default or custom.
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Whether this is a profile's system-generated default pool.
    pub fn is_default(&self) -> bool {
        self.kind == GroupKind::Default
    }

    /// Owning profile of a default pool.
    pub fn owner_profile_id(&self) -> Option<ProfileId> {
        self.owner_profile_id
    }

    /// Pick the next profile without touching the session count.
    ///
    /// Returns `None` when no member is active. Sequential mode advances the
    /// cursor; random and weighted modes do not.
    pub async fn select_next(&self) -> Option<Profile> {
        let mut state = self.state.lock().await;
        let eligible = state.eligible();
        let mode = state.selection_mode;
        let mut cursor = state.cursor;

        let picked = selection::pick(mode, &eligible, &mut cursor);
        if cursor != state.cursor {
            state.cursor = cursor;
            state.bump();
        }

        match picked {
            Some(profile) => debug!(pool_id = %self.id, profile_id = %profile.id, %mode, "Profile selected"),
            None => debug!(pool_id = %self.id, "No eligible profile"),
        }
        picked
    }

    /// Pick a named member if it is eligible. The cursor is not moved.
    pub async fn select_specific(&self, profile_id: ProfileId) -> AppResult<Profile> {
        let state = self.state.lock().await;
        state
            .members
            .iter()
            .copied()
            .find(|p| p.id == profile_id && p.is_active())
            .ok_or_else(|| {
                AppError::no_eligible_profile(format!(
                    "Profile {profile_id} is not an active member of pool {}",
                    self.id
                ))
            })
    }

    /// Atomically check capacity and take one session slot.
    pub async fn try_admit_session(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;

        state.ensure_live(self.id)?;
        if !state.status.is_active() {
            return Err(AppError::not_found(format!(
                "Pool {} is {}",
                self.id, state.status
            )));
        }
        if state.active_sessions >= state.max_concurrent_sessions {
            return Err(AppError::capacity_exceeded(format!(
                "Pool {} is at capacity ({}/{})",
                self.id, state.active_sessions, state.max_concurrent_sessions
            )));
        }

        state.active_sessions += 1;
        state.bump();
        debug!(
            pool_id = %self.id,
            active_sessions = state.active_sessions,
            max = state.max_concurrent_sessions,
            "Session admitted"
        );
        Ok(())
    }

    /// Give back one session slot. Returns `false` if none was held.
    pub async fn release_session(&self) -> bool {
        let mut state = self.state.lock().await;

        if state.active_sessions == 0 {
            warn!(pool_id = %self.id, "Release requested with no active sessions");
            return false;
        }

        state.active_sessions -= 1;
        state.bump();
        debug!(
            pool_id = %self.id,
            active_sessions = state.active_sessions,
            "Session released"
        );
        true
    }

    /// Restart sequential selection from the first member.
    pub async fn reset_selection(&self) {
        let mut state = self.state.lock().await;
        if state.cursor != 0 {
            state.cursor = 0;
            state.bump();
        }
    }

    /// Append members that are not already present. Returns how many were added.
    pub async fn add_members(&self, profiles: &[Profile]) -> AppResult<usize> {
        self.ensure_custom("add members to")?;
        let mut state = self.state.lock().await;
        state.ensure_live(self.id)?;

        let mut added = 0;
        for profile in profiles {
            if state.members.iter().any(|m| m.id == profile.id) {
                continue;
            }
            state.members.push(*profile);
            added += 1;
        }

        state.cursor = 0;
        state.bump();
        info!(pool_id = %self.id, added, members = state.members.len(), "Members added");
        Ok(added)
    }

    /// Remove members by id. Returns how many were removed.
    pub async fn remove_members(&self, profile_ids: &[ProfileId]) -> AppResult<usize> {
        self.ensure_custom("remove members from")?;
        let mut state = self.state.lock().await;
        state.ensure_live(self.id)?;

        let before = state.members.len();
        state.members.retain(|m| !profile_ids.contains(&m.id));
        let removed = before - state.members.len();

        state.cursor = 0;
        state.bump();
        info!(pool_id = %self.id, removed, members = state.members.len(), "Members removed");
        Ok(removed)
    }

    /// Mirror a profile's status onto its membership entry.
    pub async fn set_member_status(&self, profile_id: ProfileId, status: ProfileStatus) -> bool {
        let mut state = self.state.lock().await;
        let Some(member) = state.members.iter_mut().find(|m| m.id == profile_id) else {
            return false;
        };
        if member.status == status {
            return true;
        }
        member.status = status;
        state.bump();
        true
    }

    /// Change capacity.
    ///
    /// Capacity must be at least one and cannot drop below the sessions
    /// currently checked out.
    pub async fn set_capacity(&self, max_concurrent_sessions: u32) -> AppResult<()> {
        if max_concurrent_sessions < 1 {
            return Err(AppError::validation(
                "max_concurrent_sessions must be at least 1",
            ));
        }

        let mut state = self.state.lock().await;
        state.ensure_live(self.id)?;
        if max_concurrent_sessions < state.active_sessions {
            return Err(AppError::invalid_operation(format!(
                "Pool {} has {} active sessions; capacity cannot drop to {}",
                self.id, state.active_sessions, max_concurrent_sessions
            )));
        }
        state.max_concurrent_sessions = max_concurrent_sessions;
        state.bump();
        Ok(())
    }

    /// Change selection mode. The cursor restarts.
    pub async fn set_selection_mode(&self, mode: SelectionMode) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_live(self.id)?;
        state.selection_mode = mode;
        state.cursor = 0;
        state.bump();
        Ok(())
    }

    /// Change availability.
    pub async fn set_status(&self, status: PoolStatus) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.ensure_live(self.id)?;
        state.status = status;
        state.bump();
        Ok(())
    }

    /// Record a successful checkout.
    pub async fn touch_last_used(&self) {
        let mut state = self.state.lock().await;
        state.last_used = Some(Utc::now());
        state.bump();
    }

    /// Capture what a checkout may change besides the session count.
    pub async fn checkout_mark(&self) -> CheckoutMark {
        let state = self.state.lock().await;
        CheckoutMark {
            cursor: state.cursor,
            last_used: state.last_used,
        }
    }

    /// Put back the cursor and `last_used` of a checkout that did not complete.
    pub async fn rewind_checkout(&self, mark: CheckoutMark) {
        let mut state = self.state.lock().await;
        state.cursor = mark.cursor;
        state.last_used = mark.last_used;
        state.bump();
        debug!(pool_id = %self.id, cursor = mark.cursor, "Checkout rewound");
    }

    /// Capture the administrative settings.
    pub async fn settings(&self) -> PoolSettings {
        let state = self.state.lock().await;
        PoolSettings {
            members: state.members.clone(),
            selection_mode: state.selection_mode,
            cursor: state.cursor,
            max_concurrent_sessions: state.max_concurrent_sessions,
            status: state.status,
        }
    }

    /// Reinstate settings captured by [`ProfilePool::settings`].
    ///
    /// Sessions admitted in the meantime are kept, so capacity never drops
    /// below the current session count.
    pub async fn restore_settings(&self, settings: PoolSettings) {
        let mut state = self.state.lock().await;
        if state.deleted {
            return;
        }
        let max_concurrent_sessions = settings
            .max_concurrent_sessions
            .max(state.active_sessions)
            .max(1);
        state.members = settings.members;
        state.selection_mode = settings.selection_mode;
        state.cursor = settings.cursor;
        state.max_concurrent_sessions = max_concurrent_sessions;
        state.status = settings.status;
        state.bump();
        info!(pool_id = %self.id, "Pool settings restored");
    }

    /// Tombstone the pool. Every later change or save is refused.
    pub async fn mark_deleted(&self) {
        let mut state = self.state.lock().await;
        state.deleted = true;
        state.status = PoolStatus::Inactive;
    }

    /// Whether the pool has been deleted.
    pub async fn is_deleted(&self) -> bool {
        self.state.lock().await.deleted
    }

    /// Members that can currently be selected, in order.
    pub async fn eligible_members(&self) -> Vec<Profile> {
        self.state.lock().await.eligible()
    }

    /// Whether the pool may yield profiles.
    pub async fn is_active(&self) -> bool {
        self.state.lock().await.status.is_active()
    }

    /// Sessions currently checked out.
    pub async fn active_sessions(&self) -> u32 {
        self.state.lock().await.active_sessions
    }

    /// Number of members.
    pub async fn member_count(&self) -> usize {
        self.state.lock().await.members.len()
    }

    /// Number of selectable members.
    pub async fn active_member_count(&self) -> usize {
        self.state
            .lock()
            .await
            .members
            .iter()
            .filter(|m| m.is_active())
            .count()
    }

    /// Whether the profile is a member.
    pub async fn contains(&self, profile_id: ProfileId) -> bool {
        self.state
            .lock()
            .await
            .members
            .iter()
            .any(|m| m.id == profile_id)
    }

    /// Usage statistics.
    pub async fn stats(&self) -> PoolStats {
        let state = self.state.lock().await;
        let available_slots = state
            .max_concurrent_sessions
            .saturating_sub(state.active_sessions);
        let utilization_percent = if state.max_concurrent_sessions == 0 {
            0.0
        } else {
            f64::from(state.active_sessions) * 100.0 / f64::from(state.max_concurrent_sessions)
        };

        PoolStats {
            pool_id: self.id,
            name: state.name.clone(),
            kind: self.kind,
            status: state.status,
            selection_mode: state.selection_mode,
            member_count: state.members.len(),
            active_member_count: state.members.iter().filter(|m| m.is_active()).count(),
            active_sessions: state.active_sessions,
            max_concurrent_sessions: state.max_concurrent_sessions,
            available_slots,
            utilization_percent,
            last_used: state.last_used,
        }
    }

    /// Full state, including a deleted pool's last state.
    pub async fn snapshot(&self) -> PoolRecord {
        let state = self.state.lock().await;
        self.record_of(&state)
    }

    /// Full state for persistence. A deleted pool is `NotFound`.
    pub async fn persistable_snapshot(&self) -> AppResult<PoolRecord> {
        let state = self.state.lock().await;
        state.ensure_live(self.id)?;
        Ok(self.record_of(&state))
    }

    fn record_of(&self, state: &PoolState) -> PoolRecord {
        PoolRecord {
            id: self.id,
            name: state.name.clone(),
            kind: self.kind,
            owner_profile_id: self.owner_profile_id,
            members: state.members.clone(),
            selection_mode: state.selection_mode,
            cursor: state.cursor,
            max_concurrent_sessions: state.max_concurrent_sessions,
            active_sessions: state.active_sessions,
            status: state.status,
            last_used: state.last_used,
            version: state.version,
            created_at: self.created_at,
            updated_at: state.updated_at,
        }
    }

    fn ensure_custom(&self, action: &str) -> AppResult<()> {
        if self.is_default() {
            return Err(AppError::invalid_operation(format!(
                "Cannot {action} default pool {}",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use profilehub_core::error::ErrorKind;

    fn profiles(n: usize) -> Vec<Profile> {
        (0..n).map(|_| Profile::active(ProfileId::new())).collect()
    }

    fn pool(members: Vec<Profile>, max: u32, mode: SelectionMode) -> ProfilePool {
        ProfilePool::from_record(PoolRecord::new_custom("test", members, max, mode))
    }

    #[tokio::test]
    async fn test_sequential_round_robin() {
        let members = profiles(3);
        let pool = pool(members.clone(), 1, SelectionMode::Sequential);

        let mut picked = Vec::new();
        for _ in 0..4 {
            picked.push(pool.select_next().await.unwrap());
        }
        assert_eq!(picked, vec![members[0], members[1], members[2], members[0]]);
    }

    #[tokio::test]
    async fn test_inactive_members_are_skipped() {
        let mut members = profiles(3);
        members[1].status = ProfileStatus::Inactive;
        let pool = pool(members.clone(), 1, SelectionMode::Sequential);

        assert_eq!(pool.select_next().await, Some(members[0]));
        assert_eq!(pool.select_next().await, Some(members[2]));
        assert_eq!(pool.select_next().await, Some(members[0]));
        assert_eq!(pool.active_member_count().await, 2);
    }

    #[tokio::test]
    async fn test_all_inactive_yields_none() {
        let mut members = profiles(2);
        for m in &mut members {
            m.status = ProfileStatus::Inactive;
        }
        let pool = pool(members, 1, SelectionMode::Random);
        assert!(pool.select_next().await.is_none());

        let empty = self::pool(vec![], 1, SelectionMode::Sequential);
        assert!(empty.select_next().await.is_none());
    }

    #[tokio::test]
    async fn test_select_specific() {
        let mut members = profiles(2);
        members[1].status = ProfileStatus::Inactive;
        let pool = pool(members.clone(), 1, SelectionMode::Sequential);

        assert_eq!(pool.select_specific(members[0].id).await.unwrap(), members[0]);
        let err = pool.select_specific(members[1].id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoEligibleProfile);
        let err = pool.select_specific(ProfileId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoEligibleProfile);
        assert_eq!(pool.snapshot().await.cursor, 0);
    }

    #[tokio::test]
    async fn test_admission_respects_capacity() {
        let pool = pool(profiles(1), 2, SelectionMode::Random);
        pool.try_admit_session().await.unwrap();
        pool.try_admit_session().await.unwrap();

        let err = pool.try_admit_session().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapacityExceeded);
        assert!(err.kind.is_retryable());
        assert_eq!(pool.active_sessions().await, 2);

        assert!(pool.release_session().await);
        pool.try_admit_session().await.unwrap();
    }

    #[tokio::test]
    async fn test_release_at_zero_is_not_an_error() {
        let pool = pool(profiles(1), 1, SelectionMode::Random);
        assert!(!pool.release_session().await);
        assert_eq!(pool.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_inactive_pool_rejects_admission() {
        let pool = pool(profiles(1), 1, SelectionMode::Random);
        pool.set_status(PoolStatus::Suspended).await.unwrap();
        let err = pool.try_admit_session().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_never_exceed_capacity() {
        let max = 5;
        let pool = Arc::new(pool(profiles(2), max, SelectionMode::Random));

        let attempts = (0..=max).map(|_| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.try_admit_session().await.is_ok() })
        });
        let results = futures::future::join_all(attempts).await;

        let admitted = results
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count();
        assert_eq!(admitted, max as usize);
        assert_eq!(pool.active_sessions().await, max);
    }

    #[tokio::test]
    async fn test_membership_changes_reset_cursor() {
        let members = profiles(3);
        let pool = pool(members[..2].to_vec(), 1, SelectionMode::Sequential);
        pool.select_next().await;
        assert_eq!(pool.snapshot().await.cursor, 1);

        assert_eq!(pool.add_members(&[members[2], members[0]]).await.unwrap(), 1);
        assert_eq!(pool.snapshot().await.cursor, 0);
        assert_eq!(pool.member_count().await, 3);

        pool.select_next().await;
        assert_eq!(pool.remove_members(&[members[1].id]).await.unwrap(), 1);
        assert_eq!(pool.snapshot().await.cursor, 0);
        assert_eq!(pool.select_next().await, Some(members[0]));
        assert_eq!(pool.select_next().await, Some(members[2]));
    }

    #[tokio::test]
    async fn test_default_pool_membership_is_fixed() {
        let owner = Profile::active(ProfileId::new());
        let pool = ProfilePool::from_record(PoolRecord::new_default(owner, 1, SelectionMode::Random));

        let err = pool.add_members(&profiles(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
        let err = pool.remove_members(&[owner.id]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
        assert_eq!(pool.eligible_members().await, vec![owner]);
    }

    #[tokio::test]
    async fn test_set_capacity() {
        let pool = pool(profiles(1), 3, SelectionMode::Random);
        assert_eq!(
            pool.set_capacity(0).await.unwrap_err().kind,
            ErrorKind::Validation
        );

        pool.try_admit_session().await.unwrap();
        pool.try_admit_session().await.unwrap();
        assert_eq!(
            pool.set_capacity(1).await.unwrap_err().kind,
            ErrorKind::InvalidOperation
        );
        pool.set_capacity(2).await.unwrap();
        assert_eq!(
            pool.try_admit_session().await.unwrap_err().kind,
            ErrorKind::CapacityExceeded
        );
    }

    #[tokio::test]
    async fn test_mutations_bump_version() {
        let members = profiles(2);
        let pool = pool(members.clone(), 2, SelectionMode::Random);
        let v0 = pool.snapshot().await.version;

        pool.try_admit_session().await.unwrap();
        let v1 = pool.snapshot().await.version;
        assert!(v1 > v0);

        pool.set_selection_mode(SelectionMode::Sequential).await.unwrap();
        pool.set_member_status(members[0].id, ProfileStatus::Inactive).await;
        pool.touch_last_used().await;
        let snapshot = pool.snapshot().await;
        assert!(snapshot.version >= v1 + 3);
        assert!(snapshot.last_used.is_some());
        assert_eq!(snapshot.active_sessions, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let mut members = profiles(4);
        members[3].status = ProfileStatus::Inactive;
        let pool = pool(members, 4, SelectionMode::Weighted);
        pool.try_admit_session().await.unwrap();

        let stats = pool.stats().await;
        assert_eq!(stats.member_count, 4);
        assert_eq!(stats.active_member_count, 3);
        assert_eq!(stats.available_slots, 3);
        assert!((stats.utilization_percent - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_from_record_clamps_active_sessions() {
        let mut record = PoolRecord::new_custom("g", profiles(1), 2, SelectionMode::Random);
        record.active_sessions = 9;
        let pool = ProfilePool::from_record(record);
        assert_eq!(pool.active_sessions().await, 2);
    }

    #[tokio::test]
    async fn test_deleted_pool_refuses_changes() {
        let members = profiles(2);
        let pool = pool(members[..1].to_vec(), 2, SelectionMode::Random);
        pool.mark_deleted().await;

        assert!(pool.is_deleted().await);
        assert!(!pool.is_active().await);
        for err in [
            pool.try_admit_session().await.unwrap_err(),
            pool.add_members(&members[1..]).await.unwrap_err(),
            pool.remove_members(&[members[0].id]).await.unwrap_err(),
            pool.set_capacity(3).await.unwrap_err(),
            pool.set_status(PoolStatus::Active).await.unwrap_err(),
            pool.persistable_snapshot().await.unwrap_err(),
        ] {
            assert_eq!(err.kind, ErrorKind::NotFound);
        }
        assert_eq!(pool.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_restore_settings() {
        let members = profiles(3);
        let pool = pool(members[..2].to_vec(), 1, SelectionMode::Sequential);
        pool.select_next().await;
        let before = pool.settings().await;
        let version = pool.snapshot().await.version;

        pool.add_members(&members[2..]).await.unwrap();
        pool.set_capacity(3).await.unwrap();
        pool.set_selection_mode(SelectionMode::Random).await.unwrap();
        pool.try_admit_session().await.unwrap();
        pool.try_admit_session().await.unwrap();
        pool.restore_settings(before).await;

        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot.members, members[..2].to_vec());
        assert_eq!(snapshot.selection_mode, SelectionMode::Sequential);
        assert_eq!(snapshot.cursor, 1);
        // Two sessions were admitted after the capture; capacity keeps room for them.
        assert_eq!(snapshot.max_concurrent_sessions, 2);
        assert_eq!(snapshot.active_sessions, 2);
        assert!(snapshot.version > version);
    }

    #[tokio::test]
    async fn test_rewind_checkout() {
        let members = profiles(2);
        let pool = pool(members.clone(), 1, SelectionMode::Sequential);

        let mark = pool.checkout_mark().await;
        assert_eq!(pool.select_next().await, Some(members[0]));
        pool.touch_last_used().await;
        pool.rewind_checkout(mark).await;

        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot.cursor, 0);
        assert!(snapshot.last_used.is_none());
        assert_eq!(pool.select_next().await, Some(members[0]));
    }
}
