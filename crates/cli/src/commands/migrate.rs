//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bamboo-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BACKOFFICE_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/backoffice/migrations/` and are embedded at
//! compile time.

/// Run back-office database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running back-office migrations...");
    sqlx::migrate!("../backoffice/migrations").run(&pool).await?;

    tracing::info!("Back-office migrations complete!");
    Ok(())
}
