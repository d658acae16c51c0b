//! Profile repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use profilehub_core::error::{AppError, ErrorKind};
use profilehub_core::result::AppResult;
use profilehub_core::types::ProfileId;
use profilehub_entity::profile::{Profile, ProfileStatus};

use crate::store::ProfileStore;

/// Access to the `profiles` table.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a profile reference.
    pub async fn insert(&self, profile: Profile) -> AppResult<()> {
        sqlx::query("INSERT INTO profiles (id, status) VALUES ($1, $2)")
            .bind(profile.id)
            .bind(profile.status)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert profile", e))?;
        Ok(())
    }

    /// Remove a profile reference. Returns whether it existed.
    pub async fn delete(&self, id: ProfileId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete profile", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Update a profile's status. Returns whether the profile exists.
    pub async fn update_status(&self, id: ProfileId, status: ProfileStatus) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE profiles SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update profile status", e)
                })?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load_profile(&self, id: ProfileId) -> AppResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>("SELECT id, status FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load profile", e))
    }

    async fn exists(&self, id: ProfileId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to check profile existence", e)
            })
    }
}
