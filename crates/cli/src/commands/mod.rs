//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string variable shared with the server.
pub const DATABASE_URL_VAR: &str = "BACKOFFICE_DATABASE_URL";

/// Connect to the back-office database.
///
/// Falls back to `DATABASE_URL` when `BACKOFFICE_DATABASE_URL` is unset.
///
/// # Errors
///
/// Returns an error if neither variable is set or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| format!("{DATABASE_URL_VAR} not set"))?;

    tracing::info!("Connecting to back-office database...");
    Ok(bamboo_backoffice::db::create_pool(&database_url).await?)
}
