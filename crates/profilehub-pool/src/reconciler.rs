//! Startup recovery of pool session counters.
//!
//! Session counters live in the pool rows. A process that exits without
//! ending its sessions leaves them raised, and nothing else will lower them.
//! Recovery zeroes them in the store and drops the directory cache so the
//! next access reloads clean state.

use std::sync::Arc;

use tracing::{info, warn};

use profilehub_core::error::AppError;
use profilehub_database::store::PoolStore;

use crate::directory::GroupDirectory;

/// Resets stale session counters.
#[derive(Clone)]
pub struct SessionReconciler {
    pool_store: Arc<dyn PoolStore>,
    directory: Arc<GroupDirectory>,
}

impl std::fmt::Debug for SessionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionReconciler").finish()
    }
}

impl SessionReconciler {
    /// Creates a new reconciler.
    pub fn new(pool_store: Arc<dyn PoolStore>, directory: Arc<GroupDirectory>) -> Self {
        Self {
            pool_store,
            directory,
        }
    }

    /// Performs startup recovery. Returns the number of pools that were reset.
    ///
    /// Should be called once during startup, before any session is admitted.
    pub async fn startup_recovery(&self) -> Result<u64, AppError> {
        info!("Running startup session recovery");

        let reset = self.pool_store.reset_active_sessions().await?;
        self.directory.clear_cache();

        if reset > 0 {
            warn!(pools = reset, "Startup recovery cleared stale session counters");
        } else {
            info!("Startup recovery: no stale sessions");
        }

        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{NewCustomPool, PoolDefaults};
    use profilehub_core::types::ProfileId;
    use profilehub_database::MemoryStore;
    use profilehub_entity::pool::SelectionMode;
    use profilehub_entity::profile::Profile;

    #[tokio::test]
    async fn test_startup_recovery_resets_counters() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(GroupDirectory::new(
            store.clone(),
            store.clone(),
            store.clone(),
            PoolDefaults::default(),
        ));
        let profile = Profile::active(ProfileId::new());
        store.insert_profile(profile);

        let pool_id = directory
            .create_custom_pool(
                NewCustomPool {
                    name: "G1".to_string(),
                    member_ids: vec![profile.id],
                    max_concurrent_sessions: 2,
                    selection_mode: SelectionMode::Random,
                },
                None,
            )
            .await
            .unwrap();
        let pool = directory.get(pool_id).await.unwrap();
        pool.try_admit_session().await.unwrap();
        directory.persist(&pool).await.unwrap();

        let reconciler = SessionReconciler::new(store.clone(), directory.clone());
        assert_eq!(reconciler.startup_recovery().await.unwrap(), 1);
        assert_eq!(directory.get(pool_id).await.unwrap().active_sessions().await, 0);
        assert_eq!(reconciler.startup_recovery().await.unwrap(), 0);
    }
}
