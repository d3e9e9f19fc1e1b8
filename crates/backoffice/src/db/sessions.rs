//! End-user bearer session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use bamboo_core::{Metadata, SessionId, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::{NewUserSession, UserSession};
use crate::services::user_auth::SessionStore;

const SESSION_COLUMNS: &str = r"
    id, user_id, token, refresh_token, device_info, ip_address, user_agent,
    expires_at, is_active, created_at
";

#[derive(Debug, sqlx::FromRow)]
struct UserSessionRow {
    id: String,
    user_id: String,
    token: String,
    refresh_token: Option<String>,
    device_info: Json<Metadata>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserSessionRow> for UserSession {
    fn from(row: UserSessionRow) -> Self {
        Self {
            id: SessionId::new(row.id),
            user_id: UserId::new(row.user_id),
            token: row.token,
            refresh_token: row.refresh_token,
            device_info: row.device_info.0,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for end-user sessions.
pub struct UserSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserSessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for UserSessionRepository<'_> {
    async fn insert(&self, session: &NewUserSession) -> Result<UserSession, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO backoffice.user_session (
                id, user_id, token, refresh_token, device_info, ip_address,
                user_agent, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SESSION_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserSessionRow>(&sql)
            .bind(session.id.as_str())
            .bind(session.user_id.as_str())
            .bind(&session.token)
            .bind(session.refresh_token.as_deref())
            .bind(Json(&session.device_info))
            .bind(session.ip_address.as_deref())
            .bind(session.user_agent.as_deref())
            .bind(session.expires_at)
            .fetch_one(self.pool)
            .await
            .map_err(map_unique_violation)?;
        Ok(row.into())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>, RepositoryError> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM backoffice.user_session WHERE token = $1");
        let row = sqlx::query_as::<_, UserSessionRow>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn deactivate(&self, token: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE backoffice.user_session SET is_active = FALSE WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn deactivate_all(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE backoffice.user_session SET is_active = FALSE WHERE user_id = $1 AND is_active",
        )
        .bind(user_id.as_str())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
