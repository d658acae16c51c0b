//! Shared wiring for the service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use profilehub_auth::rbac::RbacEnforcer;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_database::MemoryStore;
use profilehub_database::store::UserRoleStore;
use profilehub_entity::pool::SelectionMode;
use profilehub_entity::profile::Profile;
use profilehub_entity::user::UserRole;
use profilehub_pool::{GroupDirectory, NewCustomPool, PoolDefaults};
use profilehub_service::{GroupService, RequestContext, RoleService, SessionCoordinator};

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<GroupDirectory>,
    pub roles: Arc<RoleService>,
    pub groups: GroupService,
    pub sessions: SessionCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(GroupDirectory::new(
            store.clone(),
            store.clone(),
            store.clone(),
            PoolDefaults::default(),
        ));
        let roles = Arc::new(RoleService::new(
            store.clone(),
            store.clone(),
            Arc::new(RbacEnforcer::new()),
        ));
        let groups = GroupService::new(directory.clone(), store.clone(), roles.clone());
        let sessions = SessionCoordinator::new(directory.clone(), store.clone(), roles.clone());

        Self {
            store,
            directory,
            roles,
            groups,
            sessions,
        }
    }

    pub async fn user_with(&self, role: UserRole) -> RequestContext {
        let user = UserId::new();
        self.store
            .save_user_roles(user, &[role].into_iter().collect())
            .await
            .expect("seed roles");
        RequestContext::new(user)
    }

    pub fn profile(&self) -> ProfileId {
        let profile = Profile::active(ProfileId::new());
        self.store.insert_profile(profile);
        profile.id
    }

    pub async fn custom_pool(
        &self,
        admin: &RequestContext,
        name: &str,
        members: Vec<ProfileId>,
        max: u32,
        mode: SelectionMode,
    ) -> PoolId {
        self.groups
            .create_custom_pool(
                admin,
                NewCustomPool {
                    name: name.to_string(),
                    member_ids: members,
                    max_concurrent_sessions: max,
                    selection_mode: mode,
                },
            )
            .await
            .expect("create pool")
    }

    pub async fn assign(&self, admin: &RequestContext, user: &RequestContext, pool: PoolId) {
        self.groups
            .assign_pools_to_user(admin, user.user_id, &[pool])
            .await
            .expect("assign pool");
    }
}
