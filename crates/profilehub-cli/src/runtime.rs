//! Wiring of stores and services for one CLI invocation.

use std::sync::Arc;

use tracing::{info, warn};

use profilehub_auth::rbac::RbacEnforcer;
use profilehub_core::config::AppConfig;
use profilehub_core::config::pool::StoreBackend;
use profilehub_core::result::AppResult;
use profilehub_core::types::ProfileId;
use profilehub_database::repositories::{PgAuditSink, PgPoolStore, PgProfileStore, PgUserRoleStore};
use profilehub_database::store::{AuditSink, PoolStore, ProfileStore, UserRoleStore};
use profilehub_database::{DatabasePool, MemoryStore};
use profilehub_entity::profile::{Profile, ProfileStatus};
use profilehub_pool::{GroupDirectory, PoolDefaults, SessionReconciler};
use profilehub_service::{GroupService, RoleService, SessionCoordinator};

/// Writes to the profile reference table, which the store traits only read.
#[derive(Debug, Clone)]
pub enum ProfileRegistry {
    Postgres(PgProfileStore),
    Memory(Arc<MemoryStore>),
}

impl ProfileRegistry {
    pub async fn insert(&self, profile: Profile) -> AppResult<()> {
        match self {
            Self::Postgres(store) => store.insert(profile).await,
            Self::Memory(store) => {
                store.insert_profile(profile);
                Ok(())
            }
        }
    }

    pub async fn set_status(&self, id: ProfileId, status: ProfileStatus) -> AppResult<bool> {
        match self {
            Self::Postgres(store) => store.update_status(id, status).await,
            Self::Memory(store) => Ok(store.set_profile_status(id, status)),
        }
    }

    pub async fn delete(&self, id: ProfileId) -> AppResult<bool> {
        match self {
            Self::Postgres(store) => store.delete(id).await,
            Self::Memory(store) => Ok(store.remove_profile(id)),
        }
    }
}

/// Everything a command needs.
pub struct Runtime {
    pub directory: Arc<GroupDirectory>,
    pub roles: Arc<RoleService>,
    pub groups: GroupService,
    pub sessions: SessionCoordinator,
    pub reconciler: SessionReconciler,
    pub profiles: ProfileRegistry,
}

struct Stores {
    profiles: Arc<dyn ProfileStore>,
    pools: Arc<dyn PoolStore>,
    roles: Arc<dyn UserRoleStore>,
    audit: Arc<dyn AuditSink>,
    registry: ProfileRegistry,
}

impl Runtime {
    /// Build the stores selected by `store.backend` and the services over them.
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let stores = match config.store.backend {
            StoreBackend::Postgres => {
                let db = DatabasePool::connect(&config.database).await?;
                let pool = db.pool().clone();
                let profiles = PgProfileStore::new(pool.clone());
                Stores {
                    profiles: Arc::new(profiles.clone()),
                    pools: Arc::new(PgPoolStore::new(pool.clone())),
                    roles: Arc::new(PgUserRoleStore::new(pool.clone())),
                    audit: Arc::new(PgAuditSink::new(pool)),
                    registry: ProfileRegistry::Postgres(profiles),
                }
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store; state is discarded when the process exits");
                let store = Arc::new(MemoryStore::new());
                Stores {
                    profiles: store.clone(),
                    pools: store.clone(),
                    roles: store.clone(),
                    audit: store.clone(),
                    registry: ProfileRegistry::Memory(store),
                }
            }
        };

        let defaults = PoolDefaults::try_from(&config.pools)?;
        let directory = Arc::new(GroupDirectory::new(
            stores.pools.clone(),
            stores.profiles,
            stores.audit.clone(),
            defaults,
        ));
        let roles = Arc::new(RoleService::new(
            stores.roles.clone(),
            stores.audit,
            Arc::new(RbacEnforcer::new()),
        ));
        let groups = GroupService::new(directory.clone(), stores.roles.clone(), roles.clone());
        let sessions = SessionCoordinator::new(directory.clone(), stores.roles, roles.clone());
        let reconciler = SessionReconciler::new(stores.pools, directory.clone());

        info!(backend = ?config.store.backend, "Services ready");
        Ok(Self {
            directory,
            roles,
            groups,
            sessions,
            reconciler,
            profiles: stores.registry,
        })
    }
}
