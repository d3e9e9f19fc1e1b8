//! Business logic services for the back office.
//!
//! # Services
//!
//! - `admin_management` - Admin lifecycle (create/update/delete/toggle) and admin login
//! - `applications` - Application submission and back-office status processing
//! - `audit` - Best-effort audit trail of admin mutations
//! - `credentials` - Password hashing strategy
//! - `documents` - Metadata of files end users supply
//! - `user_auth` - End-user registration, verification, sessions and profile

pub mod admin_management;
pub mod applications;
pub mod audit;
pub mod credentials;
pub mod documents;
pub mod user_auth;

pub use admin_management::{AdminDirectory, AdminError, AdminManager};
pub use applications::{ApplicationError, ApplicationService, ApplicationStore, NotificationSink};
pub use audit::AuditSink;
pub use credentials::{Argon2Hasher, CredentialError, CredentialHasher};
pub use documents::{DocumentError, DocumentService, DocumentStore};
pub use user_auth::{
    AuthError, NotificationInbox, SessionStore, UserAccounts, UserStore,
    generate_verification_code,
};
