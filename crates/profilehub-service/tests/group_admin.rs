//! Authorized pool administration.

mod common;

use common::Harness;
use profilehub_core::error::ErrorKind;
use profilehub_core::types::PoolId;
use profilehub_entity::pool::SelectionMode;
use profilehub_entity::profile::ProfileStatus;
use profilehub_entity::user::UserRole;
use profilehub_pool::{NewCustomPool, PoolUpdate};

#[tokio::test]
async fn test_plain_user_cannot_administer_pools() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;

    let err = h
        .groups
        .create_custom_pool(
            &user,
            NewCustomPool {
                name: "G2".to_string(),
                member_ids: vec![],
                max_concurrent_sessions: 1,
                selection_mode: SelectionMode::Random,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);

    for result in [
        h.groups.add_members(&user, g1, &[h.profile()]).await.map(|_| ()),
        h.groups.delete_pool(&user, g1).await,
        h.groups
            .assign_pools_to_user(&user, user.user_id, &[g1])
            .await,
        h.groups.pool_stats(&user, g1).await.map(|_| ()),
    ] {
        assert_eq!(result.unwrap_err().kind, ErrorKind::Unauthorized);
    }
}

#[tokio::test]
async fn test_custom_versus_default_deletion() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let p1 = h.profile();

    let default_pool = h.groups.create_default_pool(&admin, p1).await.unwrap();
    let custom = h
        .custom_pool(&admin, "G1", vec![p1], 1, SelectionMode::Random)
        .await;
    assert_eq!(h.directory.pools_for_profile(p1).await.unwrap().len(), 2);

    h.groups.delete_pool(&admin, custom).await.unwrap();
    assert_eq!(
        h.directory.pools_for_profile(p1).await.unwrap(),
        vec![default_pool]
    );

    let err = h.groups.delete_pool(&admin, default_pool).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    h.groups.remove_profile(&admin, p1).await.unwrap();
    assert!(h.directory.pools_for_profile(p1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_assignments_require_existing_pools() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;

    let err = h
        .groups
        .assign_pools_to_user(&admin, user.user_id, &[g1, PoolId::new()])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(h.sessions.request_next_profile(g1, &user).await.is_err());

    h.assign(&admin, &user, g1).await;
    assert!(h.sessions.request_next_profile(g1, &user).await.is_ok());

    assert_eq!(
        h.groups
            .unassign_pools_from_user(&admin, user.user_id, &[g1])
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        h.sessions.request_next_profile(g1, &user).await.unwrap_err().kind,
        ErrorKind::Unauthorized
    );
}

#[tokio::test]
async fn test_update_and_stats() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let (p1, p2) = (h.profile(), h.profile());
    let g1 = h
        .custom_pool(&admin, "G1", vec![p1, p2], 1, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;

    h.groups
        .update_pool(
            &admin,
            g1,
            PoolUpdate {
                max_concurrent_sessions: Some(3),
                selection_mode: Some(SelectionMode::Sequential),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(h.sessions.request_next_profile(g1, &user).await.unwrap().id, p1);

    h.groups
        .set_profile_status(&admin, p2, ProfileStatus::Inactive)
        .await
        .unwrap();
    let stats = h.groups.pool_stats(&admin, g1).await.unwrap();
    assert_eq!(stats.max_concurrent_sessions, 3);
    assert_eq!(stats.active_sessions, 1);
    assert_eq!(stats.active_member_count, 1);
    assert_eq!(
        h.sessions.available_profiles(g1, &user).await.unwrap().len(),
        1
    );
    assert_eq!(
        h.groups.pools_with_available_capacity(&admin).await.unwrap(),
        vec![g1]
    );
}
