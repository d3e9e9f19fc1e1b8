//! Best-effort audit recording.

use async_trait::async_trait;

use crate::db::RepositoryError;
use crate::models::AuditEntry;

/// Append-only destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError>;
}

/// Append `entry`, logging and discarding any failure.
///
/// The accompanying operation has already committed and must not be undone
/// by a lost audit row.
pub async fn record<S: AuditSink + ?Sized>(sink: &S, entry: AuditEntry) {
    if let Err(e) = sink.append(&entry).await {
        tracing::warn!(
            action = %entry.action,
            entity_type = entry.entity_type,
            entity_id = entry.entity_id.as_deref().unwrap_or_default(),
            actor = %entry.actor,
            error = %e,
            "Failed to write audit log entry"
        );
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory sink for service tests.

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryAudit {
        pub entries: Mutex<Vec<AuditEntry>>,
        pub fail: bool,
    }

    impl MemoryAudit {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn entries(&self) -> Vec<AuditEntry> {
            self.entries.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl AuditSink for MemoryAudit {
        async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
            if self.fail {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            if let Ok(mut entries) = self.entries.lock() {
                entries.push(entry.clone());
            }
            Ok(())
        }
    }
}
