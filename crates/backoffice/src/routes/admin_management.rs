//! Admin management routes (super admin only).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bamboo_core::{AdminRole, AdminUserId, InstitutionKind};

use crate::error::Result;
use crate::middleware::RequireSuperAdmin;
use crate::models::{AdminFilter, AdminStats, AssignableInstitutions};
use crate::services::admin_management::{CreateAdminRequest, UpdateAdminRequest};
use crate::state::{AdminRepositories, AppState};

/// Build the admin management router.
pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/admin/management",
        Router::new()
            .route("/admins", get(list_admins).post(create_admin))
            .route(
                "/admins/{id}",
                get(get_admin).put(update_admin).delete(delete_admin),
            )
            .route("/admins/{id}/toggle-status", patch(toggle_status))
            .route("/institutions", get(institutions))
            .route("/stats", get(stats)),
    )
}

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListAdminsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub role: Option<AdminRole>,
    pub institution_type: Option<InstitutionKind>,
    pub is_active: Option<bool>,
}

impl From<ListAdminsQuery> for AdminFilter {
    fn from(query: ListAdminsQuery) -> Self {
        Self {
            search: query.search,
            role: query.role,
            institution: query.institution_type,
            is_active: query.is_active,
            skip: query.skip.unwrap_or(0),
            limit: query.limit.unwrap_or(Self::DEFAULT_LIMIT),
        }
    }
}

#[instrument(skip(state, query))]
async fn list_admins(
    RequireSuperAdmin(_actor): RequireSuperAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListAdminsQuery>,
) -> Result<Json<Value>> {
    let filter = AdminFilter::from(query);
    let repos = AdminRepositories::new(state.pool());
    let (admins, total) = repos.manager(state.hasher()).list(&filter).await?;

    let admins: Vec<_> = admins.iter().map(|admin| admin.view()).collect();
    Ok(Json(json!({
        "admins": admins,
        "total": total,
        "skip": filter.skip,
        "limit": filter.limit,
    })))
}

async fn get_admin(
    RequireSuperAdmin(_actor): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    let admin = repos.manager(state.hasher()).get(&id).await?;
    Ok(Json(json!(admin.view())))
}

async fn create_admin(
    RequireSuperAdmin(actor): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let repos = AdminRepositories::new(state.pool());
    let admin = repos.manager(state.hasher()).create(&actor.id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "admin created",
            "admin": {
                "id": admin.id,
                "username": admin.username,
                "email": admin.email,
                "role": admin.role(),
                "is_active": admin.is_active,
            },
        })),
    ))
}

async fn update_admin(
    RequireSuperAdmin(actor): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
    Json(body): Json<UpdateAdminRequest>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    let admin = repos.manager(state.hasher()).update(&actor.id, &id, body).await?;

    Ok(Json(json!({
        "message": "admin updated",
        "admin": {
            "id": admin.id,
            "username": admin.username,
            "email": admin.email,
            "role": admin.role(),
            "is_active": admin.is_active,
            "updated_at": admin.updated_at,
        },
    })))
}

async fn delete_admin(
    RequireSuperAdmin(actor): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    repos.manager(state.hasher()).delete(&actor.id, &id).await?;
    Ok(Json(json!({ "message": "admin deleted" })))
}

async fn toggle_status(
    RequireSuperAdmin(actor): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<Json<Value>> {
    let repos = AdminRepositories::new(state.pool());
    let is_active = repos
        .manager(state.hasher())
        .toggle_status(&actor.id, &id)
        .await?;

    let message = if is_active {
        "admin activated"
    } else {
        "admin deactivated"
    };
    Ok(Json(json!({ "message": message, "is_active": is_active })))
}

async fn institutions(
    RequireSuperAdmin(_actor): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<AssignableInstitutions>> {
    let repos = AdminRepositories::new(state.pool());
    Ok(Json(repos.manager(state.hasher()).institutions().await?))
}

async fn stats(
    RequireSuperAdmin(_actor): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>> {
    let repos = AdminRepositories::new(state.pool());
    Ok(Json(repos.manager(state.hasher()).stats(Utc::now()).await?))
}
