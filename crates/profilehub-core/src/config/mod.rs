//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod logging;
pub mod pool;

use serde::{Deserialize, Serialize};

use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::pool::{PoolConfig, StoreConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Pool defaults and startup behaviour.
    #[serde(default)]
    pub pools: PoolConfig,
    /// Which store backend to run against.
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PROFILEHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PROFILEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("empty config should deserialize");

        assert_eq!(config.pools.default_capacity, 1);
        assert_eq!(config.pools.default_selection_mode, "random");
        assert!(config.pools.reset_sessions_on_startup);
        assert_eq!(config.store.backend, pool::StoreBackend::Postgres);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config: AppConfig = config::Config::builder()
            .set_override("pools.default_capacity", 4)
            .and_then(|b| b.set_override("store.backend", "memory"))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .expect("overridden config should deserialize");

        assert_eq!(config.pools.default_capacity, 4);
        assert_eq!(config.store.backend, pool::StoreBackend::Memory);
    }
}
