//! End-user account error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::credentials::CredentialError;

/// Errors that can occur during end-user account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A field failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("email already registered")]
    EmailTaken,

    #[error("phone number already registered")]
    PhoneTaken,

    /// Unknown account, wrong password or disabled account.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired verification code")]
    InvalidCode,

    #[error("user not found")]
    NotFound,

    /// Missing, unknown, expired or deactivated bearer token.
    #[error("invalid or expired session")]
    InvalidSession,

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AuthError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(field) if field == "email" => Self::EmailTaken,
            RepositoryError::Conflict(field) if field == "phone" => Self::PhoneTaken,
            other => Self::Repository(other),
        }
    }
}
