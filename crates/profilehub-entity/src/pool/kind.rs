//! Pool kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a pool is system-generated or admin-managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pool_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Created alongside a profile; contains exactly that profile.
    Default,
    /// Created by an administrator with an arbitrary member set.
    Custom,
}

impl GroupKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
