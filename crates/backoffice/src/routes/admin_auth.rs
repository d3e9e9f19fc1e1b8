//! Admin login, logout and own-account routes.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{RequireAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::{AdminRepositories, AppState};

/// Build the admin auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/auth/login", post(login))
        .route("/api/admin/auth/logout", post(logout))
        .route("/api/admin/auth/me", get(me))
        .route("/api/admin/auth/change-password", post(change_password))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// Verify credentials and open a cookie session.
#[instrument(skip(state, session, body), fields(username = %body.username))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    let admin = repos
        .manager(state.hasher())
        .authenticate(&body.username, &body.password)
        .await?;

    set_current_admin(&session, &CurrentAdmin::from(&admin))
        .await
        .map_err(|e| session_error(&e))?;

    tracing::info!(admin_id = %admin.id, "Admin logged in");
    Ok(Json(json!({
        "message": "login successful",
        "admin": admin.view(),
    })))
}

async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_admin(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "logged out" })))
}

/// The logged-in admin, reloaded so changes since login are visible.
async fn me(
    RequireAdminAuth(current): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    let admin = repos
        .manager(state.hasher())
        .get(&current.id)
        .await
        .map_err(|_| AppError::Unauthorized("admin account no longer exists".to_string()))?;
    Ok(Json(json!({ "admin": admin.view() })))
}

#[instrument(skip_all, fields(admin_id = %current.id))]
async fn change_password(
    RequireAdminAuth(current): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    repos
        .manager(state.hasher())
        .change_password(&current.id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(json!({ "message": "password changed" })))
}
