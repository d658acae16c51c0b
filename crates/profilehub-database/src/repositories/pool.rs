//! Profile pool repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use profilehub_core::error::{AppError, ErrorKind};
use profilehub_core::result::AppResult;
use profilehub_core::types::{PoolId, ProfileId};
use profilehub_entity::pool::{GroupKind, PoolRecord, PoolStatus, SelectionMode};
use profilehub_entity::profile::Profile;

use crate::store::PoolStore;

const POOL_COLUMNS: &str = "id, name, kind, owner_profile_id, selection_mode, cursor, \
     max_concurrent_sessions, active_sessions, status, last_used, version, created_at, updated_at";

/// Row shape of `profile_pools`.
#[derive(Debug, FromRow)]
struct PoolRow {
    id: PoolId,
    name: String,
    kind: GroupKind,
    owner_profile_id: Option<ProfileId>,
    selection_mode: SelectionMode,
    cursor: i32,
    max_concurrent_sessions: i32,
    active_sessions: i32,
    status: PoolStatus,
    last_used: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PoolRow {
    fn into_record(self, members: Vec<Profile>) -> AppResult<PoolRecord> {
        Ok(PoolRecord {
            id: self.id,
            name: self.name,
            kind: self.kind,
            owner_profile_id: self.owner_profile_id,
            members,
            selection_mode: self.selection_mode,
            cursor: from_column(self.cursor, "cursor")?,
            max_concurrent_sessions: from_column(
                self.max_concurrent_sessions,
                "max_concurrent_sessions",
            )?,
            active_sessions: from_column(self.active_sessions, "active_sessions")?,
            status: self.status,
            last_used: self.last_used,
            version: u64::try_from(self.version)
                .map_err(|_| AppError::database(format!("Negative pool version {}", self.version)))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn from_column(value: i32, column: &str) -> AppResult<u32> {
    u32::try_from(value).map_err(|_| AppError::database(format!("Negative {column}: {value}")))
}

fn to_column(value: u32, column: &str) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|_| AppError::validation(format!("{column} out of range: {value}")))
}

/// PostgreSQL-backed [`PoolStore`].
#[derive(Debug, Clone)]
pub struct PgPoolStore {
    pool: PgPool,
}

impl PgPoolStore {
    /// Create a new pool repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every pool, newest first, without members.
    pub async fn list_ids(&self) -> AppResult<Vec<PoolId>> {
        sqlx::query_scalar::<_, PoolId>("SELECT id FROM profile_pools ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list pools", e))
    }

    async fn load_members(&self, id: PoolId) -> AppResult<Vec<Profile>> {
        sqlx::query_as::<_, Profile>(
            "SELECT p.id, p.status FROM pool_members m \
             JOIN profiles p ON p.id = m.profile_id \
             WHERE m.pool_id = $1 ORDER BY m.position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load pool members", e))
    }
}

#[async_trait]
impl PoolStore for PgPoolStore {
    async fn load_pool(&self, id: PoolId) -> AppResult<Option<PoolRecord>> {
        let row = sqlx::query_as::<_, PoolRow>(&format!(
            "SELECT {POOL_COLUMNS} FROM profile_pools WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load pool", e))?;

        match row {
            Some(row) => {
                let members = self.load_members(id).await?;
                row.into_record(members).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn insert_pool(&self, record: &PoolRecord) -> AppResult<()> {
        let version = version_column(record.version)?;
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query(
            "INSERT INTO profile_pools (id, name, kind, owner_profile_id, selection_mode, cursor, \
                max_concurrent_sessions, active_sessions, status, last_used, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.kind)
        .bind(record.owner_profile_id)
        .bind(record.selection_mode)
        .bind(to_column(record.cursor, "cursor")?)
        .bind(to_column(record.max_concurrent_sessions, "max_concurrent_sessions")?)
        .bind(to_column(record.active_sessions, "active_sessions")?)
        .bind(record.status)
        .bind(record.last_used)
        .bind(version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert pool", e))?;

        write_members(&mut tx, record).await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit pool insert", e)
        })?;
        Ok(())
    }

    async fn save_pool(&self, record: &PoolRecord) -> AppResult<bool> {
        let version = version_column(record.version)?;
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let result = sqlx::query(
            "UPDATE profile_pools SET \
                name = $2, \
                selection_mode = $3, \
                cursor = $4, \
                max_concurrent_sessions = $5, \
                active_sessions = $6, \
                status = $7, \
                last_used = $8, \
                version = $9, \
                updated_at = $10 \
             WHERE id = $1 AND version < $9",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.selection_mode)
        .bind(to_column(record.cursor, "cursor")?)
        .bind(to_column(record.max_concurrent_sessions, "max_concurrent_sessions")?)
        .bind(to_column(record.active_sessions, "active_sessions")?)
        .bind(record.status)
        .bind(record.last_used)
        .bind(version)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save pool", e))?;

        if result.rows_affected() == 0 {
            // Row is gone or holds a newer version.
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to roll back transaction", e)
            })?;
            return Ok(false);
        }

        write_members(&mut tx, record).await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit pool save", e)
        })?;
        Ok(true)
    }

    async fn delete_pool(&self, id: PoolId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM profile_pools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete pool", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_pools_containing_profile(&self, id: ProfileId) -> AppResult<Vec<PoolId>> {
        sqlx::query_scalar::<_, PoolId>(
            "SELECT pool_id FROM pool_members WHERE profile_id = $1 ORDER BY pool_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find pools for profile", e)
        })
    }

    async fn exists_pool_name_case_insensitive(&self, name: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profile_pools \
             WHERE kind = 'custom' AND LOWER(name) = LOWER($1))",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check pool name", e))
    }

    async fn find_default_pool_for_profile(&self, id: ProfileId) -> AppResult<Option<PoolId>> {
        sqlx::query_scalar::<_, PoolId>(
            "SELECT id FROM profile_pools WHERE kind = 'default' AND owner_profile_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find default pool", e)
        })
    }

    async fn reset_active_sessions(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE profile_pools SET active_sessions = 0, version = version + 1, \
             updated_at = NOW() WHERE active_sessions > 0",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reset active sessions", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn find_pools_with_available_capacity(&self) -> AppResult<Vec<PoolId>> {
        sqlx::query_scalar::<_, PoolId>(
            "SELECT id FROM profile_pools \
             WHERE status = 'active' AND active_sessions < max_concurrent_sessions \
             ORDER BY last_used NULLS FIRST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find pools with capacity", e)
        })
    }
}

fn version_column(version: u64) -> AppResult<i64> {
    i64::try_from(version)
        .map_err(|_| AppError::validation(format!("version out of range: {version}")))
}

/// Replace a pool's member rows inside the caller's transaction.
async fn write_members(tx: &mut Transaction<'_, Postgres>, record: &PoolRecord) -> AppResult<()> {
    sqlx::query("DELETE FROM pool_members WHERE pool_id = $1")
        .bind(record.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear pool members", e))?;

    let member_ids: Vec<ProfileId> = record.members.iter().map(|m| m.id).collect();
    let positions: Vec<i32> = (0..member_ids.len())
        .map(|i| to_column(i as u32, "position"))
        .collect::<AppResult<_>>()?;

    sqlx::query(
        "INSERT INTO pool_members (pool_id, profile_id, position) \
         SELECT $1, m.profile_id, m.position \
         FROM UNNEST($2::uuid[], $3::int[]) AS m(profile_id, position)",
    )
    .bind(record.id)
    .bind(&member_ids)
    .bind(&positions)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save pool members", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_conversions() {
        assert_eq!(from_column(3, "cursor").unwrap(), 3);
        assert!(from_column(-1, "cursor").is_err());
        assert_eq!(to_column(7, "cursor").unwrap(), 7);
        assert!(to_column(u32::MAX, "cursor").is_err());
    }
}

