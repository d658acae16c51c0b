//! Pool status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Availability of a pool.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "pool_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    /// Pool hands out profiles.
    #[default]
    Active,
    /// Pool is switched off by an administrator.
    Inactive,
    /// Pool is temporarily withheld.
    Suspended,
}

impl PoolStatus {
    /// Check whether the pool may yield profiles.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PoolStatus {
    type Err = profilehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            _ => Err(profilehub_core::AppError::validation(format!(
                "Invalid pool status: '{s}'. Expected one of: active, inactive, suspended"
            ))),
        }
    }
}
