//! Application lifecycle: submission by end users, processing by admins.
//!
//! Status writes accept any member of the kind's status set. Moves outside
//! the nominal flow are logged, not rejected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use bamboo_core::{
    AdminUserId, ApplicationKind, ApplicationStatus, NotificationId, NotificationPriority,
    StatusParseError, UserId,
};

use crate::db::RepositoryError;
use crate::models::application::InvalidApplication;
use crate::models::{
    ApplicationFilter, ApplicationRecord, ApplicationSummary, AuditAction, AuditEntry,
    NewApplication, NewNotification, StatusChange,
};
use crate::services::audit::{self, AuditSink};

/// Persistence needed by [`ApplicationService`].
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Store a new application with status `pending`.
    async fn submit(
        &self,
        user_id: &UserId,
        application: &NewApplication,
    ) -> Result<ApplicationRecord, RepositoryError>;

    /// Summaries of every kind for one user, newest first.
    async fn list_for_user(&self, user_id: &UserId)
    -> Result<Vec<ApplicationSummary>, RepositoryError>;

    /// Page of one kind, newest first, with the unpaginated total.
    async fn list(
        &self,
        kind: ApplicationKind,
        filter: &ApplicationFilter,
    ) -> Result<(Vec<ApplicationRecord>, i64), RepositoryError>;

    async fn get(
        &self,
        kind: ApplicationKind,
        id: &str,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;

    /// Write status and annotations, clearing `user_notified`.
    ///
    /// Returns `RepositoryError::NotFound` if the application is gone.
    async fn write_status(
        &self,
        kind: ApplicationKind,
        id: &str,
        change: &StatusChange,
    ) -> Result<ApplicationRecord, RepositoryError>;

    async fn mark_notified(
        &self,
        kind: ApplicationKind,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Destination for in-app user notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &NewNotification) -> Result<(), RepositoryError>;
}

/// Errors that can occur during application operations.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Invalid(#[from] InvalidApplication),

    #[error(transparent)]
    Status(#[from] StatusParseError),

    #[error("{0}")]
    Validation(String),

    #[error("{} application not found", kind.label())]
    NotFound { kind: ApplicationKind },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Back-office status update as received from the API.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub processing_notes: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<AdminUserId>,
    #[serde(default)]
    pub institution_response: Option<bamboo_core::Metadata>,
}

impl StatusUpdateRequest {
    /// Resolve the status string against the kind's status set.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Status` for a value outside the set.
    pub fn into_change(self, kind: ApplicationKind) -> Result<StatusChange, ApplicationError> {
        Ok(StatusChange {
            status: ApplicationStatus::parse(kind, self.status.trim())?,
            processing_notes: self
                .processing_notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            assigned_to: self.assigned_to,
            institution_response: self.institution_response,
        })
    }
}

fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Notification text shown to the owner after a status write.
#[must_use]
pub fn status_notification(record: &ApplicationRecord) -> NewNotification {
    let kind = record.kind();
    let status = record.status();
    let priority = match status.as_str() {
        "approved" | "rejected" | "medical_exam_required" => NotificationPriority::High,
        _ => NotificationPriority::Normal,
    };
    let label = kind.label();
    let readable = status.as_str().replace('_', " ");

    NewNotification {
        id: NotificationId::generate(),
        user_id: record.user_id().clone(),
        kind: "application_status".to_string(),
        title: format!("{} application update", capitalized(label)),
        message: format!("Your {label} application is now {readable}."),
        related_entity_type: Some(kind.entity_type().to_string()),
        related_entity_id: Some(record.id().to_string()),
        priority,
    }
}

/// Application service.
pub struct ApplicationService<'a, S: ?Sized, A: ?Sized, N: ?Sized> {
    store: &'a S,
    audit: &'a A,
    notifications: &'a N,
}

impl<'a, S, A, N> ApplicationService<'a, S, A, N>
where
    S: ApplicationStore + ?Sized,
    A: AuditSink + ?Sized,
    N: NotificationSink + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S, audit: &'a A, notifications: &'a N) -> Self {
        Self {
            store,
            audit,
            notifications,
        }
    }

    /// Store an end user's submission.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Repository` if the insert fails.
    #[instrument(skip(self, application), fields(user_id = %user_id, kind = %application.kind()))]
    pub async fn submit(
        &self,
        user_id: &UserId,
        application: NewApplication,
    ) -> Result<ApplicationRecord, ApplicationError> {
        let record = self.store.submit(user_id, &application).await?;
        tracing::info!(application_id = record.id(), "Application submitted");
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `ApplicationError::Repository` if the query fails.
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<ApplicationSummary>, ApplicationError> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` for bad pagination.
    pub async fn list(
        &self,
        kind: ApplicationKind,
        filter: &ApplicationFilter,
    ) -> Result<(Vec<ApplicationRecord>, i64), ApplicationError> {
        crate::services::admin_management::check_pagination(filter.skip, filter.limit)
            .map_err(|e| ApplicationError::Validation(e.to_string()))?;
        Ok(self.store.list(kind, filter).await?)
    }

    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if no application has this id.
    pub async fn get(
        &self,
        kind: ApplicationKind,
        id: &str,
    ) -> Result<ApplicationRecord, ApplicationError> {
        self.store
            .get(kind, id)
            .await?
            .ok_or(ApplicationError::NotFound { kind })
    }

    /// An application, only if `user_id` owns it.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` for unknown or foreign ids.
    pub async fn get_owned(
        &self,
        user_id: &UserId,
        kind: ApplicationKind,
        id: &str,
    ) -> Result<ApplicationRecord, ApplicationError> {
        let record = self.get(kind, id).await?;
        if record.user_id() == user_id {
            Ok(record)
        } else {
            Err(ApplicationError::NotFound { kind })
        }
    }

    /// Write a new status on behalf of `actor`.
    ///
    /// Any member of the kind's status set is accepted regardless of the
    /// current status. The owner is notified and the change audited; both
    /// side effects are best-effort.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` or `ApplicationError::Repository`.
    #[instrument(skip(self, change), fields(actor = %actor, kind = %kind, application_id = id, status = %change.status))]
    pub async fn update_status(
        &self,
        actor: &AdminUserId,
        kind: ApplicationKind,
        id: &str,
        change: StatusChange,
    ) -> Result<ApplicationRecord, ApplicationError> {
        if change.status.kind() != kind {
            return Err(ApplicationError::Validation(format!(
                "{} is not a {} application status",
                change.status,
                kind.label()
            )));
        }

        let current = self.get(kind, id).await?;
        let from = current.status();
        if !from.is_nominal_transition(change.status) && from != change.status {
            tracing::info!(from = %from, to = %change.status, "Status change outside the nominal flow");
        }

        let updated = self
            .store
            .write_status(kind, id, &change)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ApplicationError::NotFound { kind },
                other => ApplicationError::Repository(other),
            })?;

        audit::record(
            self.audit,
            AuditEntry::new(actor, AuditAction::Update, kind.entity_type(), id)
                .old(current.status_snapshot())
                .new_values(updated.status_snapshot()),
        )
        .await;

        if let Err(e) = self.notifications.notify(&status_notification(&updated)).await {
            tracing::warn!(error = %e, "Failed to create status notification");
        }

        Ok(updated)
    }

    /// Stamp that the owner has been told about the current status.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if the application is gone.
    pub async fn mark_notified(
        &self,
        kind: ApplicationKind,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        self.store
            .mark_notified(kind, id, at)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ApplicationError::NotFound { kind },
                other => ApplicationError::Repository(other),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use bamboo_core::{CreditStatus, InsuranceStatus};

    use super::*;
    use crate::models::application::{CreditApplication, CreditApplicationRequest};
    use crate::services::audit::memory::MemoryAudit;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<ApplicationRecord>>,
    }

    fn credit_record(user_id: &UserId, new: &NewApplication) -> ApplicationRecord {
        let NewApplication::Credit(app) = new else {
            panic!("only credit applications are stored in these tests");
        };
        let now = Utc::now();
        ApplicationRecord::Credit(CreditApplication {
            id: app.id.clone(),
            user_id: user_id.clone(),
            credit_product_id: app.credit_product_id.clone(),
            simulation_id: app.simulation_id.clone(),
            requested_amount: app.requested_amount,
            duration_months: app.duration_months,
            purpose: app.purpose.clone(),
            monthly_income: app.monthly_income,
            current_debts: app.current_debts,
            down_payment: app.down_payment,
            employment_type: None,
            employer_name: None,
            employment_duration_months: None,
            documents: app.documents.clone(),
            status: CreditStatus::Pending,
            bank_response: None,
            processing_notes: None,
            assigned_to: None,
            user_notified: true,
            last_notification_sent: Some(now),
            submitted_at: now,
            updated_at: now,
        })
    }

    #[async_trait]
    impl ApplicationStore for MemoryStore {
        async fn submit(
            &self,
            user_id: &UserId,
            application: &NewApplication,
        ) -> Result<ApplicationRecord, RepositoryError> {
            let mut record = credit_record(user_id, application);
            if let ApplicationRecord::Credit(app) = &mut record {
                app.user_notified = false;
                app.last_notification_sent = None;
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn list_for_user(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<ApplicationSummary>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.user_id() == user_id)
                .map(ApplicationRecord::summary)
                .collect())
        }

        async fn list(
            &self,
            kind: ApplicationKind,
            filter: &ApplicationFilter,
        ) -> Result<(Vec<ApplicationRecord>, i64), RepositoryError> {
            let records: Vec<_> = self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.kind() == kind && filter.matches(r))
                .cloned()
                .collect();
            let total = i64::try_from(records.len()).unwrap();
            Ok((records, total))
        }

        async fn get(
            &self,
            kind: ApplicationKind,
            id: &str,
        ) -> Result<Option<ApplicationRecord>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.kind() == kind && r.id() == id)
                .cloned())
        }

        async fn write_status(
            &self,
            _kind: ApplicationKind,
            id: &str,
            change: &StatusChange,
        ) -> Result<ApplicationRecord, RepositoryError> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or(RepositoryError::NotFound)?;
            if let (ApplicationRecord::Credit(app), ApplicationStatus::Credit(status)) =
                (&mut *record, change.status)
            {
                app.status = status;
                app.processing_notes.clone_from(&change.processing_notes);
                app.user_notified = false;
            }
            Ok(record.clone())
        }

        async fn mark_notified(
            &self,
            _kind: ApplicationKind,
            id: &str,
            at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.id() == id) {
                Some(ApplicationRecord::Credit(app)) => {
                    app.user_notified = true;
                    app.last_notification_sent = Some(at);
                    Ok(())
                }
                _ => Err(RepositoryError::NotFound),
            }
        }
    }

    #[derive(Default)]
    struct MemoryNotifications {
        sent: Mutex<Vec<NewNotification>>,
    }

    #[async_trait]
    impl NotificationSink for MemoryNotifications {
        async fn notify(&self, notification: &NewNotification) -> Result<(), RepositoryError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn credit_submission() -> NewApplication {
        let request: CreditApplicationRequest = serde_json::from_value(serde_json::json!({
            "credit_product_id": "bgfi_immo",
            "requested_amount": 5_000_000,
            "duration_months": 60,
            "purpose": "Renovation of the family house",
            "monthly_income": 750_000,
        }))
        .unwrap();
        request.validate().unwrap()
    }

    fn change(status: CreditStatus) -> StatusChange {
        StatusChange {
            status: ApplicationStatus::Credit(status),
            processing_notes: None,
            assigned_to: None,
            institution_response: None,
        }
    }

    struct Fixture {
        store: MemoryStore,
        audit: MemoryAudit,
        notifications: MemoryNotifications,
        actor: AdminUserId,
        owner: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::default(),
                audit: MemoryAudit::default(),
                notifications: MemoryNotifications::default(),
                actor: AdminUserId::new("admin_1"),
                owner: UserId::new("user_1"),
            }
        }

        fn service(&self) -> ApplicationService<'_, MemoryStore, MemoryAudit, MemoryNotifications> {
            ApplicationService::new(&self.store, &self.audit, &self.notifications)
        }
    }

    #[tokio::test]
    async fn test_submit_starts_pending() {
        let fx = Fixture::new();
        let record = fx
            .service()
            .submit(&fx.owner, credit_submission())
            .await
            .unwrap();
        assert_eq!(record.status(), ApplicationStatus::initial(ApplicationKind::Credit));
        assert_eq!(record.amount(), Some(Decimal::from(5_000_000)));

        let history = fx.service().history(&fx.owner).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_to_completed_is_accepted() {
        let fx = Fixture::new();
        let service = fx.service();
        let record = service.submit(&fx.owner, credit_submission()).await.unwrap();
        service
            .mark_notified(ApplicationKind::Credit, record.id(), Utc::now())
            .await
            .unwrap();

        let updated = service
            .update_status(
                &fx.actor,
                ApplicationKind::Credit,
                record.id(),
                change(CreditStatus::Completed),
            )
            .await
            .unwrap();

        assert_eq!(updated.status(), ApplicationStatus::Credit(CreditStatus::Completed));
        assert!(!updated.user_notified());
    }

    #[tokio::test]
    async fn test_status_update_audits_and_notifies_owner() {
        let fx = Fixture::new();
        let service = fx.service();
        let record = service.submit(&fx.owner, credit_submission()).await.unwrap();

        service
            .update_status(
                &fx.actor,
                ApplicationKind::Credit,
                record.id(),
                change(CreditStatus::Approved),
            )
            .await
            .unwrap();

        let entries = fx.audit.entries();
        let entry = entries.first().unwrap();
        assert_eq!(entry.entity_type, "credit_application");
        assert_eq!(entry.old_values.as_ref().unwrap()["status"], "pending");
        assert_eq!(entry.new_values.as_ref().unwrap()["status"], "approved");

        let sent = fx.notifications.sent.lock().unwrap().clone();
        let notification = sent.first().unwrap();
        assert_eq!(&notification.user_id, &fx.owner);
        assert_eq!(notification.priority, NotificationPriority::High);
        assert_eq!(notification.related_entity_id.as_deref(), Some(record.id()));
        assert_eq!(notification.title, "Credit application update");
    }

    #[tokio::test]
    async fn test_status_of_other_kind_is_rejected() {
        let fx = Fixture::new();
        let service = fx.service();
        let record = service.submit(&fx.owner, credit_submission()).await.unwrap();

        let err = service
            .update_status(
                &fx.actor,
                ApplicationKind::Credit,
                record.id(),
                StatusChange {
                    status: ApplicationStatus::Insurance(InsuranceStatus::MedicalExamRequired),
                    ..change(CreditStatus::Pending)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[test]
    fn test_request_status_outside_set_is_rejected() {
        let request = StatusUpdateRequest {
            status: "opened".to_string(),
            ..StatusUpdateRequest::default()
        };
        assert!(matches!(
            request.into_change(ApplicationKind::Credit),
            Err(ApplicationError::Status(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_application_is_not_found() {
        let fx = Fixture::new();
        let service = fx.service();
        let record = service.submit(&fx.owner, credit_submission()).await.unwrap();

        let err = service
            .get_owned(&UserId::new("user_2"), ApplicationKind::Credit, record.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_application_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .service()
            .update_status(
                &fx.actor,
                ApplicationKind::Credit,
                "app_credit_missing",
                change(CreditStatus::Approved),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }
}
