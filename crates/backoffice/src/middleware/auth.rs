//! Authentication extractors.
//!
//! Admins authenticate with a cookie session holding [`CurrentAdmin`]; the
//! account is reloaded on every request so the stored copy only names it.
//! End users authenticate with `Authorization: Bearer <token>`.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentAdmin, User, UserSession, session_keys};
use crate::services::admin_management::AdminError;
use crate::services::user_auth::ClientInfo;
use crate::state::{AdminRepositories, AppState, UserRepositories};

/// Extractor that requires admin authentication (401 when absent).
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.username)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Read the session's admin id, then reload the account.
///
/// The session check runs first so requests without a session never touch
/// the database.
async fn current_admin(parts: &Parts, state: &AppState) -> Result<CurrentAdmin, AppError> {
    // Session comes from SessionManagerLayer
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or_else(authentication_required)?;
    let snapshot: CurrentAdmin = session
        .get(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
        .ok_or_else(authentication_required)?;

    let repos = AdminRepositories::new(state.pool());
    let admin = match repos
        .manager(state.hasher())
        .resume_session(&snapshot.id)
        .await
    {
        Ok(admin) => admin,
        Err(e) => {
            if let Err(flush_error) = session.flush().await {
                tracing::warn!(error = %flush_error, "Failed to flush stale admin session");
            }
            return Err(session_rejection(e));
        }
    };

    set_sentry_user(&admin.id, Some(&admin.username));
    Ok(admin)
}

fn authentication_required() -> AppError {
    AppError::Unauthorized("authentication required".to_string())
}

/// A session whose admin was deleted or deactivated is no session at all.
pub(crate) fn session_rejection(e: AdminError) -> AppError {
    match e {
        AdminError::NotFound | AdminError::AccountDisabled => {
            tracing::info!(reason = %e, "Admin session rejected");
            authentication_required()
        }
        other => other.into(),
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_admin(parts, state).await.map(Self)
    }
}

/// Extractor that requires a super admin (401 when absent, 403 otherwise).
pub struct RequireSuperAdmin(pub CurrentAdmin);

impl RequireSuperAdmin {
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless `admin` is a super admin.
    pub fn check(admin: CurrentAdmin) -> Result<Self, AppError> {
        if !admin.is_super_admin() {
            return Err(AppError::Forbidden(
                "only super admins can access this resource".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::check(current_admin(parts, state).await?)
    }
}

/// Extractor for application processing: super admins, or admins holding
/// `applications.manage`.
pub struct RequireApplicationManager(pub CurrentAdmin);

impl RequireApplicationManager {
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless `admin` may manage applications.
    pub fn check(admin: CurrentAdmin) -> Result<Self, AppError> {
        if !admin.can_manage_applications() {
            return Err(AppError::Forbidden(
                "application management permission required".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}

impl FromRequestParts<AppState> for RequireApplicationManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::check(current_admin(parts, state).await?)
    }
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    // New identity, new session id
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

// =============================================================================
// End users
// =============================================================================

/// Extractor that requires a valid end-user bearer session.
pub struct RequireUser {
    pub user: User,
    pub session: UserSession,
}

/// The token of an `Authorization: Bearer` header, if any.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("bearer token required".to_string()))?;
        let repos = UserRepositories::new(state.pool());
        let (user, session) = repos.accounts(state).authenticate(token).await?;
        set_sentry_user(&user.id, None);
        Ok(Self { user, session })
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = |name| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };

        // First hop of X-Forwarded-For is the client behind the proxy
        let ip_address = header_value("x-forwarded-for")
            .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_owned()))
            .filter(|ip| !ip.is_empty())
            .or_else(|| header_value("x-real-ip"));

        Ok(Self {
            ip_address,
            user_agent: header_value(header::USER_AGENT.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_client_info_prefers_forwarded_for() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "41.158.2.7, 10.0.0.1")
            .header(header::USER_AGENT, "BambooApp/2.1")
            .body(())
            .unwrap_or_default();
        let (mut parts, ()) = request.into_parts();

        let Ok(info) = ClientInfo::from_request_parts(&mut parts, &()).await;
        assert_eq!(info.ip_address.as_deref(), Some("41.158.2.7"));
        assert_eq!(info.user_agent.as_deref(), Some("BambooApp/2.1"));
    }
}
