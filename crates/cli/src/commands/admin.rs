//! Admin user bootstrap command.
//!
//! Super admins can only be created by another super admin through the API,
//! so the first one is created here.
//!
//! # Usage
//!
//! ```bash
//! bamboo-cli admin create-super -u root -e root@bamboo.ga -f Awa -l Ndong
//! ```
//!
//! The password is read from `BAMBOO_ADMIN_PASSWORD` so it never appears in
//! shell history.

use thiserror::Error;

use bamboo_backoffice::services::{AdminError, Argon2Hasher};
use bamboo_backoffice::state::AdminRepositories;

/// Variable holding the initial super admin password.
pub const PASSWORD_VAR: &str = "BAMBOO_ADMIN_PASSWORD";

/// Errors that can occur during admin bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Validation or persistence failure.
    #[error(transparent)]
    Admin(#[from] AdminError),
}

/// Arguments for `admin create-super`.
#[derive(Debug, Clone)]
pub struct SuperAdminArgs {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Create a super admin account.
///
/// # Errors
///
/// Returns an error if the password variable is missing, validation fails,
/// or the username or email is already taken.
pub async fn create_super(args: SuperAdminArgs) -> Result<(), Box<dyn std::error::Error>> {
    let password =
        std::env::var(PASSWORD_VAR).map_err(|_| BootstrapError::MissingEnvVar(PASSWORD_VAR))?;

    let pool = super::connect().await?;
    let repos = AdminRepositories::new(&pool);
    let hasher = Argon2Hasher;

    tracing::info!(username = %args.username, "Creating super admin");
    let admin = repos
        .manager(&hasher)
        .bootstrap_super_admin(
            &args.username,
            &args.email,
            &password,
            &args.first_name,
            &args.last_name,
        )
        .await
        .map_err(BootstrapError::from)?;

    tracing::info!(
        "Super admin created successfully! ID: {}, Username: {}",
        admin.id,
        admin.username
    );
    Ok(())
}
