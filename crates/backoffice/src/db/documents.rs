//! User document metadata repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bamboo_core::{AdminUserId, ApplicationKind, DocumentId, UserId};

use super::{RepositoryError, corrupt};
use crate::models::{DocumentLink, NewUserDocument, UserDocument};
use crate::services::documents::DocumentStore;

const DOCUMENT_COLUMNS: &str = r"
    id, user_id, filename, file_type, file_size, file_url, document_type,
    application_type, application_id, is_verified, verified_by, verified_at,
    uploaded_at
";

#[derive(Debug, sqlx::FromRow)]
struct UserDocumentRow {
    id: String,
    user_id: String,
    filename: String,
    file_type: String,
    file_size: i64,
    file_url: Option<String>,
    document_type: Option<String>,
    application_type: Option<String>,
    application_id: Option<String>,
    is_verified: bool,
    verified_by: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    uploaded_at: DateTime<Utc>,
}

impl TryFrom<UserDocumentRow> for UserDocument {
    type Error = RepositoryError;

    fn try_from(row: UserDocumentRow) -> Result<Self, Self::Error> {
        let application = match (row.application_type, row.application_id) {
            (Some(kind), Some(application_id)) => Some(DocumentLink {
                application_type: kind
                    .parse::<ApplicationKind>()
                    .map_err(|e| corrupt("document application type", e))?,
                application_id,
            }),
            _ => None,
        };

        Ok(Self {
            id: DocumentId::new(row.id),
            user_id: UserId::new(row.user_id),
            filename: row.filename,
            file_type: row.file_type,
            file_size: row.file_size,
            file_url: row.file_url,
            document_type: row.document_type,
            application,
            is_verified: row.is_verified,
            verified_by: row.verified_by.map(AdminUserId::new),
            verified_at: row.verified_at,
            uploaded_at: row.uploaded_at,
        })
    }
}

/// Repository for user document metadata.
pub struct UserDocumentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserDocumentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for UserDocumentRepository<'_> {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<UserDocument>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {DOCUMENT_COLUMNS}
            FROM backoffice.user_document
            WHERE user_id = $1
            ORDER BY uploaded_at DESC
            "
        );
        let rows = sqlx::query_as::<_, UserDocumentRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert(&self, document: &NewUserDocument) -> Result<UserDocument, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO backoffice.user_document (
                id, user_id, filename, file_type, file_size, file_url,
                document_type, application_type, application_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DOCUMENT_COLUMNS}
            "
        );
        let link = document.application.as_ref();
        let row = sqlx::query_as::<_, UserDocumentRow>(&sql)
            .bind(document.id.as_str())
            .bind(document.user_id.as_str())
            .bind(&document.filename)
            .bind(&document.file_type)
            .bind(document.file_size)
            .bind(document.file_url.as_deref())
            .bind(document.document_type.as_deref())
            .bind(link.map(|l| l.application_type.as_str()))
            .bind(link.map(|l| l.application_id.as_str()))
            .fetch_one(self.pool)
            .await?;
        row.try_into()
    }
}
