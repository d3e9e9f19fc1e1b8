//! End-user profile, contact, password, document and notification routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::UserDocumentRepository;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{Notification, User, UserDocument};
use crate::routes::user_auth::channel_label;
use crate::services::documents::{DocumentService, RegisterDocumentRequest};
use crate::services::user_auth::{
    AddContactRequest, ChangePasswordRequest, MarkReadRequest, ProfileUpdateRequest,
};
use crate::state::{AppState, ApplicationRepositories, UserRepositories};

/// Build the end-user account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(profile).put(update_profile))
        .route("/api/users/me/contact", post(add_contact))
        .route("/api/users/me/password", post(change_password))
        .route("/api/users/me/documents", get(documents).post(register_document))
        .route("/api/users/me/notifications", get(notifications))
        .route("/api/users/me/notifications/read", post(mark_read))
}

async fn profile(auth: RequireUser) -> Json<User> {
    Json(auth.user)
}

#[instrument(skip_all, fields(user_id = %auth.user.id))]
async fn update_profile(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    let user = repos.accounts(&state).update_profile(&auth.user.id, body).await?;
    Ok(Json(json!({
        "success": true,
        "user": user,
        "message": "profile updated",
    })))
}

#[instrument(skip_all, fields(user_id = %auth.user.id))]
async fn add_contact(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<AddContactRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    let (user, contact) = repos.accounts(&state).add_contact(&auth.user.id, &body).await?;
    let method = channel_label(&contact);
    Ok(Json(json!({
        "success": true,
        "user": user,
        "verification_required": true,
        "verification_method": method,
        "message": format!("contact added, a verification code was sent by {method}"),
    })))
}

#[instrument(skip_all, fields(user_id = %auth.user.id))]
async fn change_password(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    repos
        .accounts(&state)
        .change_password(&auth.user.id, &body)
        .await?;
    Ok(Json(json!({ "success": true, "message": "password changed" })))
}

async fn documents(
    State(state): State<AppState>,
    auth: RequireUser,
) -> Result<Json<Vec<UserDocument>>> {
    let store = UserDocumentRepository::new(state.pool());
    Ok(Json(DocumentService::new(&store).list(&auth.user.id).await?))
}

/// Record an uploaded file. A linked application must belong to the caller.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
async fn register_document(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<RegisterDocumentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if let Some(link) = body.link()? {
        let repos = ApplicationRepositories::new(state.pool());
        repos
            .service()
            .get_owned(&auth.user.id, link.application_type, &link.application_id)
            .await?;
    }

    let store = UserDocumentRepository::new(state.pool());
    let document = DocumentService::new(&store)
        .register(&auth.user.id, &body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "document": document })),
    ))
}

async fn notifications(
    State(state): State<AppState>,
    auth: RequireUser,
) -> Result<Json<Vec<Notification>>> {
    let repos = UserRepositories::new(state.pool());
    Ok(Json(repos.accounts(&state).notifications(&auth.user.id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<MarkReadRequest>,
) -> Result<Json<Value>> {
    let repos = UserRepositories::new(state.pool());
    let updated = repos
        .accounts(&state)
        .mark_notifications_read(&auth.user.id, &body.notification_ids)
        .await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}
