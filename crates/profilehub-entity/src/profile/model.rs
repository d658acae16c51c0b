//! Profile reference entity.

use profilehub_core::types::ProfileId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::ProfileStatus;

/// An opaque reference to a fingerprint profile.
///
/// Fingerprint attributes live with the profile owner; pools only need to
/// know which profile it is and whether it may be handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Profile {
    /// Profile identifier.
    pub id: ProfileId,
    /// Whether the profile may be selected.
    pub status: ProfileStatus,
}

impl Profile {
    /// Create a reference to an active profile.
    pub fn active(id: ProfileId) -> Self {
        Self {
            id,
            status: ProfileStatus::Active,
        }
    }

    /// Whether this profile may be handed out.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
