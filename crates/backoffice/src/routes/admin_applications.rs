//! Back-office application processing routes.
//!
//! Available to super admins and to any admin holding the
//! `applications.manage` permission.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use bamboo_core::{ApplicationKind, ApplicationStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireApplicationManager;
use crate::models::{AdminFilter, ApplicationFilter, ApplicationRecord};
use crate::services::applications::StatusUpdateRequest;
use crate::state::{AppState, ApplicationRepositories};

/// Build the application processing router.
pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/admin/applications",
        Router::new()
            .route("/{kind}", get(list_applications))
            .route("/{kind}/{id}", get(get_application))
            .route("/{kind}/{id}/status", patch(update_status))
            .route("/{kind}/{id}/notified", post(mark_notified)),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListApplicationsQuery {
    pub status: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListApplicationsQuery {
    /// Resolve the status string against `kind`'s status set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a status outside the set.
    pub fn into_filter(self, kind: ApplicationKind) -> Result<ApplicationFilter> {
        let status = self
            .status
            .filter(|status| !status.is_empty())
            .map(|status| ApplicationStatus::parse(kind, &status))
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(ApplicationFilter {
            status,
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(AdminFilter::DEFAULT_LIMIT),
        })
    }
}

#[instrument(skip(state, query), fields(admin_id = %admin.id))]
async fn list_applications(
    RequireApplicationManager(admin): RequireApplicationManager,
    State(state): State<AppState>,
    Path(kind): Path<ApplicationKind>,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Value>> {
    let filter = query.into_filter(kind)?;
    let repos = ApplicationRepositories::new(state.pool());
    let (applications, total) = repos.service().list(kind, &filter).await?;

    Ok(Json(json!({
        "applications": applications,
        "total": total,
        "skip": filter.skip,
        "limit": filter.limit,
    })))
}

async fn get_application(
    RequireApplicationManager(_admin): RequireApplicationManager,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ApplicationKind, String)>,
) -> Result<Json<ApplicationRecord>> {
    let repos = ApplicationRepositories::new(state.pool());
    Ok(Json(repos.service().get(kind, &id).await?))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn update_status(
    RequireApplicationManager(admin): RequireApplicationManager,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ApplicationKind, String)>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Value>> {
    let change = body.into_change(kind)?;
    let repos = ApplicationRepositories::new(state.pool());
    let application = repos
        .service()
        .update_status(&admin.id, kind, &id, change)
        .await?;

    Ok(Json(json!({
        "message": "status updated",
        "application": application,
    })))
}

async fn mark_notified(
    RequireApplicationManager(_admin): RequireApplicationManager,
    State(state): State<AppState>,
    Path((kind, id)): Path<(ApplicationKind, String)>,
) -> Result<Json<Value>> {
    let repos = ApplicationRepositories::new(state.pool());
    repos.service().mark_notified(kind, &id, Utc::now()).await?;
    Ok(Json(json!({ "message": "user marked as notified" })))
}

#[cfg(test)]
mod tests {
    use bamboo_core::CreditStatus;

    use super::*;

    #[test]
    fn test_filter_parses_status_for_kind() {
        let query = ListApplicationsQuery {
            status: Some("under_review".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter(ApplicationKind::Credit);
        assert!(matches!(
            filter,
            Ok(ApplicationFilter {
                status: Some(ApplicationStatus::Credit(CreditStatus::UnderReview)),
                skip: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_filter_rejects_status_of_other_kind() {
        // "on_hold" only exists for credit
        let query = ListApplicationsQuery {
            status: Some("on_hold".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_filter(ApplicationKind::Insurance),
            Err(AppError::BadRequest(_))
        ));
    }
}
