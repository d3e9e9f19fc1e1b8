//! In-app notification repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bamboo_core::{NotificationId, NotificationPriority, UserId};

use super::RepositoryError;
use crate::models::{NewNotification, Notification};
use crate::services::applications::NotificationSink;
use crate::services::user_auth::NotificationInbox;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    message: String,
    related_entity_type: Option<String>,
    related_entity_id: Option<String>,
    is_read: bool,
    priority: NotificationPriority,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId::new(row.id),
            kind: row.kind,
            title: row.title,
            message: row.message,
            related_entity_type: row.related_entity_type,
            related_entity_id: row.related_entity_id,
            is_read: row.is_read,
            priority: row.priority,
            created_at: row.created_at,
        }
    }
}

/// Repository for user notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationInbox for NotificationRepository<'_> {
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, type, title, message, related_entity_type, related_entity_id,
                   is_read, priority, created_at
            FROM backoffice.user_notification
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id.as_str())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_read(
        &self,
        user_id: &UserId,
        ids: &[NotificationId],
    ) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<&str> = ids.iter().map(NotificationId::as_str).collect();
        let result = sqlx::query(
            r"
            UPDATE backoffice.user_notification
            SET is_read = TRUE
            WHERE user_id = $1 AND id = ANY($2) AND NOT is_read
            ",
        )
        .bind(user_id.as_str())
        .bind(&ids)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl NotificationSink for NotificationRepository<'_> {
    async fn notify(&self, notification: &NewNotification) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO backoffice.user_notification
                (id, user_id, type, title, message, related_entity_type,
                 related_entity_id, priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(notification.id.as_str())
        .bind(notification.user_id.as_str())
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_entity_type.as_deref())
        .bind(notification.related_entity_id.as_deref())
        .bind(notification.priority)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
