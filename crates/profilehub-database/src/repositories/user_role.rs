//! User role and pool assignment repository implementation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use profilehub_core::error::{AppError, ErrorKind};
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, UserId};
use profilehub_entity::user::UserRole;

use crate::store::UserRoleStore;

/// PostgreSQL-backed [`UserRoleStore`].
#[derive(Debug, Clone)]
pub struct PgUserRoleStore {
    pool: PgPool,
}

impl PgUserRoleStore {
    /// Create a new user role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pools the user may draw from.
    pub async fn find_assigned_pools(&self, user: UserId) -> AppResult<Vec<PoolId>> {
        sqlx::query_scalar::<_, PoolId>(
            "SELECT pool_id FROM user_pool_assignments WHERE user_id = $1 ORDER BY assigned_at",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list assigned pools", e)
        })
    }
}

#[async_trait]
impl UserRoleStore for PgUserRoleStore {
    async fn load_user_roles(&self, user: UserId) -> AppResult<Option<BTreeSet<UserRole>>> {
        let roles = sqlx::query_scalar::<_, UserRole>(
            "SELECT role FROM user_roles WHERE user_id = $1",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))?;

        if roles.is_empty() {
            return Ok(None);
        }
        Ok(Some(roles.into_iter().collect()))
    }

    async fn save_user_roles(&self, user: UserId, roles: &BTreeSet<UserRole>) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear user roles", e)
            })?;

        for role in roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                .bind(user)
                .bind(role)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to insert user role", e)
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit user roles", e)
        })
    }

    async fn is_user_assigned_to_pool(&self, user: UserId, pool: PoolId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_pool_assignments \
             WHERE user_id = $1 AND pool_id = $2)",
        )
        .bind(user)
        .bind(pool)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check pool assignment", e)
        })
    }

    async fn assign_pools(&self, user: UserId, pools: &[PoolId]) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_pool_assignments (user_id, pool_id) \
             SELECT $1, UNNEST($2::uuid[]) \
             ON CONFLICT (user_id, pool_id) DO NOTHING",
        )
        .bind(user)
        .bind(pools)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to assign pools", e))?;
        Ok(())
    }

    async fn unassign_pools(&self, user: UserId, pools: &[PoolId]) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM user_pool_assignments WHERE user_id = $1 AND pool_id = ANY($2)",
        )
        .bind(user)
        .bind(pools)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unassign pools", e))?;
        Ok(result.rows_affected())
    }
}
