//! Selection mode enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a pool picks the next profile.
///
/// `Weighted` has no weight source and selects exactly like `Random`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "pool_selection_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Uniform draw over eligible members.
    #[default]
    Random,
    /// Round-robin in insertion order.
    Sequential,
    /// Reserved; currently identical to `Random`.
    Weighted,
}

impl SelectionMode {
    /// Whether this mode advances a cursor.
    pub fn uses_cursor(&self) -> bool {
        matches!(self, Self::Sequential)
    }

    /// Return the mode as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
            Self::Weighted => "weighted",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = profilehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            "weighted" => Ok(Self::Weighted),
            _ => Err(profilehub_core::AppError::validation(format!(
                "Invalid selection mode: '{s}'. Expected one of: random, sequential, weighted"
            ))),
        }
    }
}
