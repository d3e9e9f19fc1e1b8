//! Document metadata registered by end users.
//!
//! Uploading the file itself happens elsewhere; the service records what was
//! stored, optionally linked to one of the user's applications.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use bamboo_core::{ApplicationKind, DocumentId, UserId};

use crate::db::RepositoryError;
use crate::models::{DocumentLink, NewUserDocument, UserDocument};

const FILENAME_LEN: usize = 255;
const LABEL_LEN: usize = 50;
const URL_LEN: usize = 500;

/// Persistence needed by [`DocumentService`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of one user, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<UserDocument>, RepositoryError>;

    async fn insert(&self, document: &NewUserDocument) -> Result<UserDocument, RepositoryError>;
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Body of `POST /api/users/me/documents`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDocumentRequest {
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub application_type: Option<ApplicationKind>,
    #[serde(default)]
    pub application_id: Option<String>,
}

fn bounded(field: &str, value: &str, max: usize) -> Result<String, DocumentError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(DocumentError::Validation(format!(
            "{field} must be between 1 and {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, DocumentError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| bounded(field, v, max))
        .transpose()
}

impl RegisterDocumentRequest {
    /// The application this document belongs to, if any.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Validation` when only one of
    /// `application_type` and `application_id` is given.
    pub fn link(&self) -> Result<Option<DocumentLink>, DocumentError> {
        let id = self
            .application_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        match (self.application_type, id) {
            (Some(application_type), Some(id)) => Ok(Some(DocumentLink {
                application_type,
                application_id: id.to_string(),
            })),
            (None, None) => Ok(None),
            _ => Err(DocumentError::Validation(
                "application_type and application_id go together".to_string(),
            )),
        }
    }

    /// # Errors
    ///
    /// Returns `DocumentError::Validation` naming the first offending field.
    pub fn validate(&self, user_id: &UserId) -> Result<NewUserDocument, DocumentError> {
        if self.file_size <= 0 {
            return Err(DocumentError::Validation(
                "file_size must be positive".to_string(),
            ));
        }
        Ok(NewUserDocument {
            id: DocumentId::generate(),
            user_id: user_id.clone(),
            filename: bounded("filename", &self.filename, FILENAME_LEN)?,
            file_type: bounded("file_type", &self.file_type, LABEL_LEN)?,
            file_size: self.file_size,
            file_url: optional("file_url", self.file_url.as_deref(), URL_LEN)?,
            document_type: optional("document_type", self.document_type.as_deref(), LABEL_LEN)?,
            application: self.link()?,
        })
    }
}

/// Document metadata service.
pub struct DocumentService<'a, D: ?Sized> {
    store: &'a D,
}

impl<'a, D> DocumentService<'a, D>
where
    D: DocumentStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a D) -> Self {
        Self { store }
    }

    /// Record a document for `user_id`.
    ///
    /// A linked application must already be known to belong to the user;
    /// callers check ownership before registering.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Validation` or `DocumentError::Repository`.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn register(
        &self,
        user_id: &UserId,
        request: &RegisterDocumentRequest,
    ) -> Result<UserDocument, DocumentError> {
        let document = request.validate(user_id)?;
        let stored = self.store.insert(&document).await?;
        tracing::info!(document_id = %stored.id, "Document registered");
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns `DocumentError::Repository` if the query fails.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<UserDocument>, DocumentError> {
        Ok(self.store.list_for_user(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct MemoryDocuments {
        documents: Mutex<Vec<UserDocument>>,
    }

    #[async_trait]
    impl DocumentStore for MemoryDocuments {
        async fn list_for_user(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<UserDocument>, RepositoryError> {
            let mut owned: Vec<UserDocument> = self
                .documents
                .lock()
                .unwrap()
                .iter()
                .filter(|d| &d.user_id == user_id)
                .cloned()
                .collect();
            owned.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
            Ok(owned)
        }

        async fn insert(&self, document: &NewUserDocument) -> Result<UserDocument, RepositoryError> {
            let stored = UserDocument {
                id: document.id.clone(),
                user_id: document.user_id.clone(),
                filename: document.filename.clone(),
                file_type: document.file_type.clone(),
                file_size: document.file_size,
                file_url: document.file_url.clone(),
                document_type: document.document_type.clone(),
                application: document.application.clone(),
                is_verified: false,
                verified_by: None,
                verified_at: None,
                uploaded_at: Utc::now(),
            };
            self.documents.lock().unwrap().push(stored.clone());
            Ok(stored)
        }
    }

    fn request(value: serde_json::Value) -> RegisterDocumentRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_list_own_documents() {
        let store = MemoryDocuments::default();
        let service = DocumentService::new(&store);
        let owner = UserId::new("user_1");

        let document = service
            .register(
                &owner,
                &request(json!({
                    "filename": " payslip-march.pdf ",
                    "file_type": "application/pdf",
                    "file_size": 48_213,
                    "document_type": "payslip",
                    "application_type": "credit",
                    "application_id": "app_credit_1",
                })),
            )
            .await
            .unwrap();
        assert_eq!(document.filename, "payslip-march.pdf");
        assert!(!document.is_verified);
        assert_eq!(
            document.application.as_ref().map(|l| l.application_type),
            Some(ApplicationKind::Credit)
        );

        service
            .register(
                &UserId::new("user_2"),
                &request(json!({ "filename": "id.png", "file_type": "image/png", "file_size": 10 })),
            )
            .await
            .unwrap();

        let listed = service.list(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().unwrap().id, document.id);
    }

    #[test]
    fn test_half_application_link_is_rejected() {
        let err = request(json!({
            "filename": "id.png",
            "file_type": "image/png",
            "file_size": 10,
            "application_id": "app_credit_1",
        }))
        .validate(&UserId::new("user_1"))
        .unwrap_err();
        assert!(err.to_string().contains("application_type"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let err = request(json!({ "filename": "id.png", "file_type": "image/png", "file_size": 0 }))
            .validate(&UserId::new("user_1"))
            .unwrap_err();
        assert!(err.to_string().contains("file_size"));
    }

    #[test]
    fn test_serialized_document_flattens_link() {
        let document = UserDocument {
            id: DocumentId::new("doc_1"),
            user_id: UserId::new("user_1"),
            filename: "id.png".to_string(),
            file_type: "image/png".to_string(),
            file_size: 10,
            file_url: None,
            document_type: None,
            application: Some(DocumentLink {
                application_type: ApplicationKind::Savings,
                application_id: "app_savings_1".to_string(),
            }),
            is_verified: false,
            verified_by: None,
            verified_at: None,
            uploaded_at: Utc::now(),
        };
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["application_type"], "savings");
        assert_eq!(value["application_id"], "app_savings_1");
        assert!(value.get("user_id").is_none());
    }
}
