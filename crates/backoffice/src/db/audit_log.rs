//! Append-only audit log of admin mutations.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use bamboo_core::AuditLogId;

use super::RepositoryError;
use crate::models::AuditEntry;
use crate::services::audit::AuditSink;

/// Repository for the audit log.
pub struct AuditLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for AuditLogRepository<'_> {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO backoffice.audit_log
                (id, admin_user_id, action, entity_type, entity_id, old_values, new_values)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(AuditLogId::generate().as_str())
        .bind(entry.actor.as_str())
        .bind(entry.action.as_str())
        .bind(entry.entity_type)
        .bind(entry.entity_id.as_deref())
        .bind(entry.old_values.clone().map(Json))
        .bind(entry.new_values.clone().map(Json))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
