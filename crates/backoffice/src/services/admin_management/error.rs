//! Admin lifecycle error types.

use thiserror::Error;

use bamboo_core::{AssignmentError, InstitutionKind};

use crate::db::RepositoryError;
use crate::services::credentials::CredentialError;

/// Errors that can occur during admin management operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// A field failed validation.
    #[error("{0}")]
    Validation(String),

    /// Role and institution assignment do not fit together.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("username already exists")]
    UsernameTaken,

    #[error("email already exists")]
    EmailTaken,

    /// The referenced institution id does not exist.
    #[error("{} not found", kind.label())]
    InstitutionNotFound { kind: InstitutionKind },

    #[error("{} is not active", kind.label())]
    InstitutionInactive { kind: InstitutionKind },

    #[error("admin not found")]
    NotFound,

    /// Super admins cannot be modified, deleted or toggled here.
    #[error("super admin accounts cannot be modified")]
    ProtectedSuperAdmin,

    #[error("you cannot delete your own account")]
    SelfDeletion,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AdminError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(field) if field == "username" => Self::UsernameTaken,
            RepositoryError::Conflict(field) if field == "email" => Self::EmailTaken,
            other => Self::Repository(other),
        }
    }
}
