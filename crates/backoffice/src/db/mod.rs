//! Database operations for the back office `PostgreSQL` schema.
//!
//! # Schema: `backoffice`
//!
//! ## Tables
//!
//! - `bank`, `insurance_company` - Institutions admins can be assigned to
//! - `admin_user` - Admin accounts (role + assignment + permissions)
//! - `audit_log` - Append-only record of admin mutations
//! - `session` - Admin cookie sessions (tower-sessions)
//! - `app_user`, `user_session`, `user_notification` - End users
//! - `user_document` - Metadata of files end users supplied
//! - `credit_application`, `savings_application`, `insurance_application`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/backoffice/migrations/` and run via:
//! ```bash
//! cargo run -p bamboo-cli -- migrate
//! ```

pub mod admin_users;
pub mod applications;
pub mod audit_log;
pub mod documents;
pub mod institutions;
pub mod notifications;
pub mod sessions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use applications::ApplicationRepository;
pub use audit_log::AuditLogRepository;
pub use documents::UserDocumentRepository;
pub use institutions::InstitutionRepository;
pub use notifications::NotificationRepository;
pub use sessions::UserSessionRepository;
pub use users::{StoredUser, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation; holds the conflicting field name.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Field guarded by a named unique constraint.
fn constrained_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "admin_user_username_key" => Some("username"),
        "admin_user_email_key" | "app_user_email_key" => Some("email"),
        "app_user_phone_key" => Some("phone"),
        "user_session_token_key" => Some("token"),
        "user_session_refresh_token_key" => Some("refresh_token"),
        _ => None,
    }
}

/// Map a unique violation to [`RepositoryError::Conflict`] naming the field.
///
/// The store constraint is the authority; service pre-checks can race.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = db_err
            .constraint()
            .and_then(constrained_field)
            .unwrap_or("value");
        return RepositoryError::Conflict(field.to_string());
    }
    RepositoryError::Database(e)
}

/// A stored value failed its domain parser.
pub(crate) fn corrupt(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::DataCorruption(format!("invalid {what} in database: {e}"))
}
