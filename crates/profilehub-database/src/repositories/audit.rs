//! Audit log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use profilehub_core::error::{AppError, ErrorKind};
use profilehub_core::result::AppResult;
use profilehub_entity::audit::AuditEvent;

use crate::store::AuditSink;

/// Writes audit events to the `audit_log` table.
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Create a new audit sink.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, target_type, target_id, action, actor_id, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id)
        .bind(event.target_type.as_str())
        .bind(event.target_id)
        .bind(event.action.as_str())
        .bind(event.actor_id)
        .bind(&event.details)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record audit event", e))?;
        Ok(())
    }
}
