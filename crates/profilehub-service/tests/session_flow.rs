//! End-to-end checkout behaviour against the in-memory store.

mod common;

use std::sync::Arc;

use common::Harness;
use profilehub_core::error::ErrorKind;
use profilehub_database::store::PoolStore;
use profilehub_entity::audit::AuditAction;
use profilehub_entity::pool::{PoolStatus, SelectionMode};
use profilehub_entity::profile::ProfileStatus;
use profilehub_entity::user::UserRole;
use profilehub_pool::PoolUpdate;

#[tokio::test]
async fn test_group_checkout_scenario() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let (p1, p2) = (h.profile(), h.profile());

    let g1 = h
        .custom_pool(&admin, "G1", vec![p1, p2], 1, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    let first = h.sessions.request_next_profile(g1, &user).await.unwrap();
    assert_eq!(first.id, p1);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 1);

    let err = h.sessions.request_next_profile(g1, &user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CapacityExceeded);

    assert!(h.sessions.end_session(g1, Some(p1), &user).await.unwrap());
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 0);

    let second = h.sessions.request_next_profile(g1, &user).await.unwrap();
    assert_eq!(second.id, p2);

    let stored = h.store.stored_pool(g1).unwrap();
    assert_eq!(stored.active_sessions, 1);
    assert!(stored.last_used.is_some());

    let uses = h
        .store
        .audit_events()
        .await
        .into_iter()
        .filter(|e| e.action == AuditAction::Use)
        .count();
    assert_eq!(uses, 2);
}

#[tokio::test]
async fn test_unassigned_user_is_unauthorized() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let outsider = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;

    let err = h
        .sessions
        .request_next_profile(g1, &outsider)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_all_inactive_members_net_zero() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let p1 = h.profile();
    let g1 = h
        .custom_pool(&admin, "G1", vec![p1], 2, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    h.store.set_profile_status(p1, ProfileStatus::Inactive);
    h.directory
        .set_profile_status(p1, ProfileStatus::Inactive)
        .await
        .unwrap();

    let err = h.sessions.request_next_profile(g1, &user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoEligibleProfile);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_persistence_failure_releases_admission() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;

    h.store.set_fail_pool_saves(true);
    let err = h.sessions.request_next_profile(g1, &user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 0);

    h.store.set_fail_pool_saves(false);
    assert!(h.sessions.request_next_profile(g1, &user).await.is_ok());
}

#[tokio::test]
async fn test_failed_checkout_does_not_advance_cursor() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let (a, b) = (h.profile(), h.profile());
    let g1 = h
        .custom_pool(&admin, "G1", vec![a, b], 2, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    h.store.set_fail_pool_saves(true);
    assert!(h.sessions.request_next_profile(g1, &user).await.is_err());
    h.store.set_fail_pool_saves(false);

    let first = h.sessions.request_next_profile(g1, &user).await.unwrap();
    assert_eq!(first.id, a);
    let stats = h.groups.pool_stats(&admin, g1).await.unwrap();
    assert_eq!(stats.active_sessions, 1);
    assert!(stats.last_used.is_some());
}

#[tokio::test]
async fn test_end_session_survives_persistence_failure() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;
    h.sessions.request_next_profile(g1, &user).await.unwrap();

    h.store.set_fail_pool_saves(true);
    assert!(h.sessions.end_session(g1, None, &user).await.unwrap());
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 0);
    h.store.set_fail_pool_saves(false);

    assert!(h.sessions.request_next_profile(g1, &user).await.is_ok());
}

#[tokio::test]
async fn test_failed_membership_change_keeps_previous_state() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let (a, b) = (h.profile(), h.profile());
    let g1 = h
        .custom_pool(&admin, "G1", vec![a], 1, SelectionMode::Sequential)
        .await;

    h.store.set_fail_pool_saves(true);
    assert!(h.groups.add_members(&admin, g1, &[b]).await.is_err());
    assert!(h.groups.remove_members(&admin, g1, &[a]).await.is_err());
    let update = PoolUpdate {
        max_concurrent_sessions: Some(4),
        selection_mode: Some(SelectionMode::Random),
        ..PoolUpdate::default()
    };
    assert!(h.groups.update_pool(&admin, g1, update).await.is_err());
    h.store.set_fail_pool_saves(false);

    let stats = h.groups.pool_stats(&admin, g1).await.unwrap();
    let stored = h.store.load_pool(g1).await.unwrap().unwrap();
    assert_eq!(stats.member_count, 1);
    assert_eq!(stored.members.len(), 1);
    assert_eq!(stats.max_concurrent_sessions, 1);
    assert_eq!(stats.selection_mode, SelectionMode::Sequential);
    assert_eq!(stored.max_concurrent_sessions, stats.max_concurrent_sessions);
}

#[tokio::test]
async fn test_held_pool_is_not_written_back_after_delete() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 2, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;

    let held = h.directory.get(g1).await.unwrap();
    h.groups.delete_pool(&admin, g1).await.unwrap();

    let err = held.try_admit_session().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = h.directory.persist(&held).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(h.store.load_pool(g1).await.unwrap().is_none());
    assert!(h.sessions.request_next_profile(g1, &user).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_checkouts_racing_deletion_leave_no_row() {
    let h = Arc::new(Harness::new());
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile(), h.profile()], 8, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        let user = user.clone();
        tasks.push(tokio::spawn(async move {
            let _ = h.sessions.request_next_profile(g1, &user).await;
        }));
    }
    h.groups.delete_pool(&admin, g1).await.unwrap();
    for task in tasks {
        task.await.unwrap();
    }

    assert!(h.store.load_pool(g1).await.unwrap().is_none());
    assert_eq!(
        h.directory.get(g1).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_audit_failure_does_not_roll_back_checkout() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;

    h.store.set_fail_audit(true);
    assert!(h.sessions.request_next_profile(g1, &user).await.is_ok());
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_specific_profile_checkout() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let (p1, p2) = (h.profile(), h.profile());
    let g1 = h
        .custom_pool(&admin, "G1", vec![p1, p2], 2, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    let picked = h
        .sessions
        .request_specific_profile(g1, p2, &user)
        .await
        .unwrap();
    assert_eq!(picked.id, p2);

    let err = h
        .sessions
        .request_specific_profile(g1, h.profile(), &user)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoEligibleProfile);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 1);

    // The specific checkout did not move the sequential cursor.
    let next = h.sessions.request_next_profile(g1, &user).await.unwrap();
    assert_eq!(next.id, p1);
}

#[tokio::test]
async fn test_start_session_validates_profile() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let p1 = h.profile();
    let g1 = h
        .custom_pool(&admin, "G1", vec![p1], 1, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;

    let err = h
        .sessions
        .start_session(g1, Some(h.profile()), &user)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoEligibleProfile);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), 0);

    let started = h.sessions.start_session(g1, Some(p1), &user).await.unwrap();
    assert_eq!(started.map(|p| p.id), Some(p1));
    assert_eq!(
        h.sessions.start_session(g1, None, &user).await.unwrap_err().kind,
        ErrorKind::CapacityExceeded
    );
}

#[tokio::test]
async fn test_end_session_edge_cases() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;

    assert!(!h.sessions.end_session(g1, None, &user).await.unwrap());
    let err = h
        .sessions
        .end_session(profilehub_core::types::PoolId::new(), None, &user)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_inactive_pool_is_not_found() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let g1 = h
        .custom_pool(&admin, "G1", vec![h.profile()], 1, SelectionMode::Random)
        .await;
    h.assign(&admin, &user, g1).await;

    h.groups
        .update_pool(
            &admin,
            g1,
            PoolUpdate {
                status: Some(PoolStatus::Inactive),
                ..PoolUpdate::default()
            },
        )
        .await
        .unwrap();

    let err = h.sessions.request_next_profile(g1, &user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(h.sessions.available_profiles(g1, &user).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_admit_exactly_capacity() {
    let h = Arc::new(Harness::new());
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let members = (0..3).map(|_| h.profile()).collect();
    let max = 4;
    let g1 = h
        .custom_pool(&admin, "G1", members, max, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    let attempts = (0..=max).map(|_| {
        let h = Arc::clone(&h);
        let user = user.clone();
        tokio::spawn(async move { h.sessions.request_next_profile(g1, &user).await })
    });
    let results = futures::future::join_all(attempts).await;

    let mut admitted = 0;
    let mut refused = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(_) => admitted += 1,
            Err(e) => {
                assert_eq!(e.kind, ErrorKind::CapacityExceeded);
                refused += 1;
            }
        }
    }
    assert_eq!(admitted, max);
    assert_eq!(refused, 1);
    assert_eq!(h.sessions.active_sessions(g1).await.unwrap(), max);
    assert_eq!(h.store.stored_pool(g1).unwrap().active_sessions, max);
}

#[tokio::test]
async fn test_reloaded_pool_keeps_cursor() {
    let h = Harness::new();
    let admin = h.user_with(UserRole::Admin).await;
    let user = h.user_with(UserRole::User).await;
    let (p1, p2, p3) = (h.profile(), h.profile(), h.profile());
    let g1 = h
        .custom_pool(&admin, "G1", vec![p1, p2, p3], 3, SelectionMode::Sequential)
        .await;
    h.assign(&admin, &user, g1).await;

    assert_eq!(h.sessions.request_next_profile(g1, &user).await.unwrap().id, p1);
    h.directory.clear_cache();
    assert_eq!(h.sessions.request_next_profile(g1, &user).await.unwrap().id, p2);

    let stored = h.store.load_pool(g1).await.unwrap().unwrap();
    assert_eq!(stored.cursor, 2);
}
