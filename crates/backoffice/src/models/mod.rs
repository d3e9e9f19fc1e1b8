//! Domain models for the back office.

pub mod admin_user;
pub mod application;
pub mod audit;
pub mod document;
pub mod institution;
pub mod notification;
pub mod session;
pub mod user;

pub use admin_user::{AdminFilter, AdminStats, AdminUser, AdminUserUpdate, NewAdminUser, RoleCounts};
pub use application::{
    ApplicationFilter, ApplicationRecord, ApplicationSummary, NewApplication, StatusChange,
};
pub use audit::{AuditAction, AuditEntry};
pub use document::{DocumentLink, NewUserDocument, UserDocument};
pub use institution::{AssignableInstitutions, Institution, InstitutionSeed, InstitutionSummary};
pub use notification::{NewNotification, Notification};
pub use session::{CurrentAdmin, NewUserSession, UserSession, keys as session_keys};
pub use user::{Contact, NewUser, ProfileChanges, User, VerificationCode};
