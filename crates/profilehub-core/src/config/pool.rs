//! Pool defaults and store backend selection.

use serde::{Deserialize, Serialize};

/// Defaults applied to newly created pools and startup behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Capacity given to a profile's default pool.
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
    /// Selection mode for default pools: `"random"`, `"sequential"`, or `"weighted"`.
    #[serde(default = "default_selection_mode")]
    pub default_selection_mode: String,
    /// Zero all active session counters when the process starts.
    ///
    /// Sessions held by a previous process are not tracked anywhere else, so
    /// leaving the counters in place would leak capacity after a crash.
    #[serde(default = "default_true")]
    pub reset_sessions_on_startup: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            default_selection_mode: default_selection_mode(),
            reset_sessions_on_startup: default_true(),
        }
    }
}

/// Store backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: StoreBackend,
}

/// Supported store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL via sqlx.
    #[default]
    Postgres,
    /// Process-local in-memory store.
    Memory,
}

fn default_capacity() -> u32 {
    1
}

fn default_selection_mode() -> String {
    "random".to_string()
}

fn default_true() -> bool {
    true
}
