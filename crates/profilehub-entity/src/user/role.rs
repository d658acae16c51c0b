//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles available in the RBAC system.
///
/// Variants are declared in ascending privilege order so the derived `Ord`
/// agrees with [`UserRole::level`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Uses the pools assigned to them.
    User,
    /// Manages profiles, pools and non-super users.
    Admin,
    /// Full system control.
    SuperAdmin,
}

impl UserRole {
    /// Every role, lowest privilege first.
    pub const ALL: [UserRole; 3] = [Self::User, Self::Admin, Self::SuperAdmin];

    /// Return the privilege level (higher = more privileged).
    ///
    /// Levels 2 and 3 are unused.
    pub fn level(&self) -> u8 {
        match self {
            Self::User => 1,
            Self::Admin => 4,
            Self::SuperAdmin => 5,
        }
    }

    /// Check if this role has at least the given role's privileges.
    pub fn has_at_least(&self, other: &UserRole) -> bool {
        self.level() >= other.level()
    }

    /// Return the role as its stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
            Self::SuperAdmin => "Super Admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = profilehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            "SUPER_ADMIN" | "SUPERADMIN" => Ok(Self::SuperAdmin),
            _ => Err(profilehub_core::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: USER, ADMIN, SUPER_ADMIN"
            ))),
        }
    }
}
