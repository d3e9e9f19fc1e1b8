//! End-user application submission and history routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::instrument;

use bamboo_core::ApplicationKind;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::application::{
    CreditApplicationRequest, InsuranceApplicationRequest, SavingsApplicationRequest,
};
use crate::models::{ApplicationRecord, ApplicationSummary, NewApplication};
use crate::services::applications::ApplicationError;
use crate::state::{AppState, ApplicationRepositories};

/// Build the end-user applications router.
pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/users/me/applications",
        Router::new()
            .route("/", get(history))
            .route("/credit", post(submit_credit))
            .route("/savings", post(submit_savings))
            .route("/insurance", post(submit_insurance))
            .route("/{kind}/{id}", get(get_application)),
    )
}

#[instrument(skip_all, fields(user_id = %auth.user.id, kind = %application.kind()))]
async fn submit(
    state: &AppState,
    auth: &RequireUser,
    application: NewApplication,
) -> Result<(StatusCode, Json<Value>)> {
    let repos = ApplicationRepositories::new(state.pool());
    let record = repos.service().submit(&auth.user.id, application).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "application": record,
            "message": format!("{} application submitted", record.kind().label()),
        })),
    ))
}

async fn submit_credit(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<CreditApplicationRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let application = body.validate().map_err(ApplicationError::from)?;
    submit(&state, &auth, application).await
}

async fn submit_savings(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<SavingsApplicationRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let application = body.validate().map_err(ApplicationError::from)?;
    submit(&state, &auth, application).await
}

async fn submit_insurance(
    State(state): State<AppState>,
    auth: RequireUser,
    Json(body): Json<InsuranceApplicationRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let application = body.validate().map_err(ApplicationError::from)?;
    submit(&state, &auth, application).await
}

async fn history(
    State(state): State<AppState>,
    auth: RequireUser,
) -> Result<Json<Vec<ApplicationSummary>>> {
    let repos = ApplicationRepositories::new(state.pool());
    Ok(Json(repos.service().history(&auth.user.id).await?))
}

async fn get_application(
    State(state): State<AppState>,
    auth: RequireUser,
    Path((kind, id)): Path<(ApplicationKind, String)>,
) -> Result<Json<ApplicationRecord>> {
    let repos = ApplicationRepositories::new(state.pool());
    Ok(Json(
        repos
            .service()
            .get_owned(&auth.user.id, kind, &id)
            .await?,
    ))
}
