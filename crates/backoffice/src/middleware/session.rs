//! Session middleware configuration for admin cookies.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions with
//! SameSite=Strict and a 24 hour inactivity expiry.

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::BackofficeConfig;

/// Session cookie name for back-office admins.
pub const SESSION_COOKIE_NAME: &str = "bamboo_admin_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
#[error("invalid session store identifier: {0}")]
pub struct SessionLayerError(String);

/// Create the session layer with `PostgreSQL` store.
///
/// The `backoffice.session` table is created by the migrations.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected by the store.
pub fn create_session_layer(
    pool: &PgPool,
    config: &BackofficeConfig,
) -> Result<SessionManagerLayer<PostgresStore>, SessionLayerError> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("backoffice")
        .map_err(|e| SessionLayerError(e.to_string()))?
        .with_table_name("session")
        .map_err(|e| SessionLayerError(e.to_string()))?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/"))
}
