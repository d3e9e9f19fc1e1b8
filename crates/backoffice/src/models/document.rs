//! Metadata of files end users attach to their account or applications.
//!
//! Only the metadata lives here; the file itself sits in external storage
//! and is referenced by `file_url`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bamboo_core::{AdminUserId, ApplicationKind, DocumentId, UserId};

/// Application a document was supplied for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    pub application_type: ApplicationKind,
    pub application_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDocument {
    pub id: DocumentId,
    #[serde(skip)]
    pub user_id: UserId,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_url: Option<String>,
    /// Free-form classification such as `id_card` or `payslip`.
    pub document_type: Option<String>,
    #[serde(flatten)]
    pub application: Option<DocumentLink>,
    pub is_verified: bool,
    pub verified_by: Option<AdminUserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
}

/// A validated document record ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUserDocument {
    pub id: DocumentId,
    pub user_id: UserId,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_url: Option<String>,
    pub document_type: Option<String>,
    pub application: Option<DocumentLink>,
}
