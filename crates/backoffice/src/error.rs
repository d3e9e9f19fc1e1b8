//! Unified error handling for the back-office API.
//!
//! Every handler returns `Result<T, AppError>`. Bodies are always
//! `{"error": "<message>"}`; server-side causes are logged and sent to
//! Sentry, never echoed to the caller.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AdminError, ApplicationError, AuthError, DocumentError};

/// Application-level error type for the back office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks permission.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Duplicate value on a unique field.
    #[error("{0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Back-office request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::Validation(_)
            | AdminError::Assignment(_)
            | AdminError::InstitutionInactive { .. } => Self::BadRequest(e.to_string()),
            AdminError::UsernameTaken | AdminError::EmailTaken => Self::Conflict(e.to_string()),
            AdminError::InstitutionNotFound { .. } | AdminError::NotFound => {
                Self::NotFound(e.to_string())
            }
            AdminError::ProtectedSuperAdmin
            | AdminError::SelfDeletion
            | AdminError::AccountDisabled => Self::Forbidden(e.to_string()),
            AdminError::InvalidCredentials => Self::Unauthorized(e.to_string()),
            AdminError::Credential(_) => Self::Internal(e.to_string()),
            AdminError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(_) | AuthError::InvalidCode => Self::BadRequest(e.to_string()),
            AuthError::EmailTaken | AuthError::PhoneTaken => Self::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidSession => {
                Self::Unauthorized(e.to_string())
            }
            AuthError::NotFound => Self::NotFound(e.to_string()),
            AuthError::Credential(_) => Self::Internal(e.to_string()),
            AuthError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ApplicationError> for AppError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::Invalid(_)
            | ApplicationError::Status(_)
            | ApplicationError::Validation(_) => Self::BadRequest(e.to_string()),
            ApplicationError::NotFound { .. } => Self::NotFound(e.to_string()),
            ApplicationError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::Validation(_) => Self::BadRequest(e.to_string()),
            DocumentError::Repository(e) => Self::Database(e),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an authenticated principal.
pub fn set_sentry_user(id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use bamboo_core::{AssignmentError, InstitutionKind};

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("admin not found".to_string());
        assert_eq!(err.to_string(), "admin not found");

        let err = AppError::Internal("pool exhausted".to_string());
        assert_eq!(err.to_string(), "Internal error: pool exhausted");
    }

    #[test]
    fn test_admin_error_taxonomy() {
        let status = |e: AdminError| AppError::from(e).status();

        assert_eq!(
            status(AdminError::Assignment(AssignmentError::MissingBank)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AdminError::UsernameTaken), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(AdminError::InstitutionNotFound {
                kind: InstitutionKind::Bank
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(AdminError::ProtectedSuperAdmin), StatusCode::FORBIDDEN);
        assert_eq!(status(AdminError::SelfDeletion), StatusCode::FORBIDDEN);
        assert_eq!(status(AdminError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AdminError::Repository(RepositoryError::DataCorruption(
                "bad row".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_taxonomy() {
        let status = |e: AuthError| AppError::from(e).status();

        assert_eq!(status(AuthError::PhoneTaken), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::InvalidSession), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let response = AppError::Internal("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
