//! Persisted pool snapshot.

use chrono::{DateTime, Utc};
use profilehub_core::types::{PoolId, ProfileId};
use serde::{Deserialize, Serialize};

use super::{GroupKind, PoolStatus, SelectionMode};
use crate::profile::Profile;

/// The full persisted state of one pool.
///
/// Members are kept in insertion order; that order drives sequential
/// selection. `version` increases on every in-memory mutation and stores
/// refuse to overwrite a row with an older version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Pool identifier.
    pub id: PoolId,
    /// Display name.
    pub name: String,
    /// Default or custom.
    pub kind: GroupKind,
    /// Owning profile for default pools.
    pub owner_profile_id: Option<ProfileId>,
    /// Members in insertion order.
    pub members: Vec<Profile>,
    /// How the next profile is picked.
    pub selection_mode: SelectionMode,
    /// Sequential-mode position.
    pub cursor: u32,
    /// Maximum sessions checked out at once.
    pub max_concurrent_sessions: u32,
    /// Sessions currently checked out.
    pub active_sessions: u32,
    /// Pool availability.
    pub status: PoolStatus,
    /// Last successful checkout.
    pub last_used: Option<DateTime<Utc>>,
    /// Mutation counter.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl PoolRecord {
    /// Build a fresh custom pool record.
    pub fn new_custom(
        name: impl Into<String>,
        members: Vec<Profile>,
        max_concurrent_sessions: u32,
        selection_mode: SelectionMode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PoolId::new(),
            name: name.into(),
            kind: GroupKind::Custom,
            owner_profile_id: None,
            members,
            selection_mode,
            cursor: 0,
            max_concurrent_sessions,
            active_sessions: 0,
            status: PoolStatus::Active,
            last_used: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the default pool record for a profile.
    pub fn new_default(
        owner: Profile,
        max_concurrent_sessions: u32,
        selection_mode: SelectionMode,
    ) -> Self {
        let mut record = Self::new_custom(
            Self::default_name(owner.id),
            vec![owner],
            max_concurrent_sessions,
            selection_mode,
        );
        record.kind = GroupKind::Default;
        record.owner_profile_id = Some(owner.id);
        record
    }

    /// Display name given to a profile's default pool.
    pub fn default_name(owner: ProfileId) -> String {
        format!("{owner} - Default Group")
    }

    /// Whether this is a system-generated default pool.
    pub fn is_default(&self) -> bool {
        self.kind == GroupKind::Default
    }

    /// Whether the given profile is a member.
    pub fn contains(&self, profile_id: ProfileId) -> bool {
        self.members.iter().any(|m| m.id == profile_id)
    }

    /// Whether another session could be admitted right now.
    pub fn has_capacity(&self) -> bool {
        self.status.is_active() && self.active_sessions < self.max_concurrent_sessions
    }
}
