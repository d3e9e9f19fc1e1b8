//! End-user authentication routes.
//!
//! Sessions are opaque bearer tokens issued at login and sent back in the
//! `Authorization` header.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::Contact;
use crate::services::user_auth::{
    ClientInfo, ContactRequest, LoginRequest, PasswordResetConfirm, RegistrationRequest,
    VerifyRequest,
};
use crate::state::{AppState, UserRepositories};

/// Build the end-user auth router.
pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/users/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/verify", post(verify))
            .route("/resend-verification", post(resend_verification))
            .route("/password-reset", post(request_password_reset))
            .route("/password-reset/confirm", post(confirm_password_reset)),
    )
}

pub(crate) fn channel_label(contact: &Contact) -> &'static str {
    match contact {
        Contact::Email(_) => "email",
        Contact::Phone(_) => "sms",
    }
}

#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let repos = UserRepositories::new(state.pool());
    let registered = repos.accounts(&state).register(body).await?;
    let method = channel_label(&registered.channel);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user": registered.user,
            "verification_required": true,
            "verification_method": method,
            "message": format!("account created, a verification code was sent by {method}"),
        })),
    ))
}

#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    let logged_in = repos.accounts(&state).login(body, client).await?;
    let expires_in = logged_in.expires_in(Utc::now());

    Ok(Json(json!({
        "success": true,
        "user": logged_in.user,
        "token": logged_in.session.token,
        "refresh_token": logged_in.session.refresh_token,
        "expires_in": expires_in,
        "message": "login successful",
    })))
}

async fn logout(State(state): State<AppState>, auth: RequireUser) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    repos.accounts(&state).logout(&auth.session.token).await?;
    Ok(Json(json!({ "success": true, "message": "logged out" })))
}

async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    let user = repos.accounts(&state).verify(&body).await?;
    Ok(Json(json!({
        "success": true,
        "user": user,
        "message": "account verified",
    })))
}

async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    let channel = repos.accounts(&state).resend_verification(&body).await?;
    Ok(Json(json!({
        "success": true,
        "verification_method": channel_label(&channel),
        "message": "a new verification code was sent",
    })))
}

/// Always answers the same way so the response never reveals whether an
/// account exists.
async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    repos.accounts(&state).request_password_reset(&body).await?;
    Ok(Json(json!({
        "success": true,
        "message": "if an account exists, a reset code was sent",
    })))
}

async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetConfirm>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    repos.accounts(&state).confirm_password_reset(&body).await?;
    Ok(Json(json!({
        "success": true,
        "message": "password reset, please log in again",
    })))
}
