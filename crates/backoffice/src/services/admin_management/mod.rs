//! Admin lifecycle management.
//!
//! Create, update, delete and activate back-office admins while enforcing
//! the role/assignment invariant, uniqueness of username and email, and
//! protection of super admin accounts. Every mutation is followed by a
//! best-effort audit entry.

mod error;

pub use error::AdminError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use bamboo_core::{
    AdminRole, AdminUserId, BankId, Email, InstitutionKind, InsuranceCompanyId, PermissionPatch,
    PermissionToggles, Permissions, RoleAssignment,
};

use crate::db::RepositoryError;
use crate::models::{
    AdminFilter, AdminStats, AdminUser, AdminUserUpdate, AssignableInstitutions, AuditAction,
    AuditEntry, CurrentAdmin, Institution, NewAdminUser, admin_user::start_of_month,
};
use crate::services::audit::{self, AuditSink};
use crate::services::credentials::CredentialHasher;

const ENTITY_TYPE: &str = "admin_user";

/// Persistence needed by [`AdminManager`].
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Page of admins matching `filter`, plus the unpaginated total.
    async fn list(&self, filter: &AdminFilter) -> Result<(Vec<AdminUser>, i64), RepositoryError>;

    async fn get(&self, id: &AdminUserId) -> Result<Option<AdminUser>, RepositoryError>;

    /// Admin and password hash by username, for login.
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError>;

    async fn password_hash(&self, id: &AdminUserId) -> Result<Option<String>, RepositoryError>;

    async fn username_taken(&self, username: &str) -> Result<bool, RepositoryError>;

    /// Whether another admin (other than `except`) uses `email`.
    async fn email_taken(
        &self,
        email: &Email,
        except: Option<&AdminUserId>,
    ) -> Result<bool, RepositoryError>;

    async fn institution(
        &self,
        kind: InstitutionKind,
        id: &str,
    ) -> Result<Option<Institution>, RepositoryError>;

    async fn active_institutions(&self) -> Result<Vec<Institution>, RepositoryError>;

    async fn insert(&self, admin: &NewAdminUser) -> Result<AdminUser, RepositoryError>;

    /// Returns `RepositoryError::NotFound` if the admin is gone.
    async fn update(
        &self,
        id: &AdminUserId,
        update: &AdminUserUpdate,
    ) -> Result<AdminUser, RepositoryError>;

    async fn delete(&self, id: &AdminUserId) -> Result<(), RepositoryError>;

    async fn set_active(&self, id: &AdminUserId, is_active: bool) -> Result<(), RepositoryError>;

    async fn record_login(&self, id: &AdminUserId, at: DateTime<Utc>)
    -> Result<(), RepositoryError>;

    async fn set_password(&self, id: &AdminUserId, hash: &str) -> Result<(), RepositoryError>;

    /// Counts excluding super admins; `recent_admins` counts from `since`.
    async fn stats(&self, since: DateTime<Utc>) -> Result<AdminStats, RepositoryError>;
}

// =============================================================================
// Requests
// =============================================================================

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdminRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    #[serde(default)]
    pub assigned_bank_id: Option<BankId>,
    #[serde(default)]
    pub assigned_insurance_company_id: Option<InsuranceCompanyId>,
    #[serde(flatten)]
    pub permissions: PermissionToggles,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update. Username is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateAdminRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<AdminRole>,
    pub assigned_bank_id: Option<BankId>,
    pub assigned_insurance_company_id: Option<InsuranceCompanyId>,
    #[serde(flatten)]
    pub permissions: PermissionPatch,
    pub is_active: Option<bool>,
}

pub const USERNAME_LEN: (usize, usize) = (3, 50);
pub const NAME_LEN: (usize, usize) = (1, 100);
pub const MIN_PASSWORD_LEN: usize = 6;

fn text(field: &str, value: &str, (min, max): (usize, usize)) -> Result<String, AdminError> {
    let value = value.trim();
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AdminError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn password(value: &str) -> Result<&str, AdminError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(value)
}

fn email(value: &str) -> Result<Email, AdminError> {
    Email::parse(value).map_err(|e| AdminError::Validation(format!("invalid email: {e}")))
}

/// Reject a listing filter outside the pagination bounds.
///
/// # Errors
///
/// Returns `AdminError::Validation` for a negative `skip` or a `limit`
/// outside `1..=100`.
pub fn check_pagination(skip: i64, limit: i64) -> Result<(), AdminError> {
    if skip < 0 {
        return Err(AdminError::Validation("skip must not be negative".to_string()));
    }
    if !(1..=AdminFilter::MAX_LIMIT).contains(&limit) {
        return Err(AdminError::Validation(format!(
            "limit must be between 1 and {}",
            AdminFilter::MAX_LIMIT
        )));
    }
    Ok(())
}

// =============================================================================
// Service
// =============================================================================

/// Admin lifecycle service.
pub struct AdminManager<'a, D: ?Sized, A: ?Sized> {
    directory: &'a D,
    audit: &'a A,
    hasher: &'a dyn CredentialHasher,
}

impl<'a, D, A> AdminManager<'a, D, A>
where
    D: AdminDirectory + ?Sized,
    A: AuditSink + ?Sized,
{
    /// Create a new admin manager.
    #[must_use]
    pub const fn new(directory: &'a D, audit: &'a A, hasher: &'a dyn CredentialHasher) -> Self {
        Self {
            directory,
            audit,
            hasher,
        }
    }

    /// Filtered page of non-super admins, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` for bad pagination and
    /// `AdminError::Repository` if the query fails.
    #[instrument(skip(self), fields(skip = filter.skip, limit = filter.limit))]
    pub async fn list(&self, filter: &AdminFilter) -> Result<(Vec<AdminUser>, i64), AdminError> {
        check_pagination(filter.skip, filter.limit)?;
        Ok(self.directory.list(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no admin has this id.
    pub async fn get(&self, id: &AdminUserId) -> Result<AdminUser, AdminError> {
        self.directory.get(id).await?.ok_or(AdminError::NotFound)
    }

    /// Create an admin on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns a validation, assignment, institution or uniqueness error
    /// before anything is written.
    #[instrument(skip(self, request), fields(actor = %actor, username = %request.username, role = %request.role))]
    pub async fn create(
        &self,
        actor: &AdminUserId,
        request: CreateAdminRequest,
    ) -> Result<AdminUser, AdminError> {
        let admin = self.insert_admin(request, Some(actor.clone())).await?;

        audit::record(
            self.audit,
            AuditEntry::new(actor, AuditAction::Create, ENTITY_TYPE, admin.id.as_str())
                .new_values(admin.create_snapshot()),
        )
        .await;

        tracing::info!(admin_id = %admin.id, "Admin created");
        Ok(admin)
    }

    /// Create the first super admin without an acting admin (CLI bootstrap).
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn bootstrap_super_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<AdminUser, AdminError> {
        let request = CreateAdminRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: AdminRole::SuperAdmin,
            assigned_bank_id: None,
            assigned_insurance_company_id: None,
            permissions: PermissionToggles::default(),
            is_active: true,
        };
        self.insert_admin(request, None).await
    }

    async fn insert_admin(
        &self,
        request: CreateAdminRequest,
        created_by: Option<AdminUserId>,
    ) -> Result<AdminUser, AdminError> {
        let username = text("username", &request.username, USERNAME_LEN)?;
        let email = email(&request.email)?;
        let password = password(&request.password)?;
        let first_name = text("first_name", &request.first_name, NAME_LEN)?;
        let last_name = text("last_name", &request.last_name, NAME_LEN)?;

        let assignment = RoleAssignment::from_request(
            request.role,
            request.assigned_bank_id,
            request.assigned_insurance_company_id,
        )?;
        self.ensure_institution(&assignment).await?;

        if self.directory.username_taken(&username).await? {
            return Err(AdminError::UsernameTaken);
        }
        if self.directory.email_taken(&email, None).await? {
            return Err(AdminError::EmailTaken);
        }

        let permissions = Permissions::from(request.permissions);

        let new_admin = NewAdminUser {
            id: AdminUserId::generate(),
            username,
            email,
            password_hash: self.hasher.hash(password)?,
            first_name,
            last_name,
            assignment,
            permissions,
            is_active: request.is_active,
            created_by,
        };

        Ok(self.directory.insert(&new_admin).await?)
    }

    /// Apply a partial update.
    ///
    /// Permission toggles are merged into the stored map key by key.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound`, `AdminError::ProtectedSuperAdmin`, or a
    /// validation/uniqueness error before anything is written.
    #[instrument(skip(self, request), fields(actor = %actor, admin_id = %id))]
    pub async fn update(
        &self,
        actor: &AdminUserId,
        id: &AdminUserId,
        request: UpdateAdminRequest,
    ) -> Result<AdminUser, AdminError> {
        let current = self.get(id).await?;
        if current.is_super_admin() {
            return Err(AdminError::ProtectedSuperAdmin);
        }

        let email = match request.email.as_deref() {
            Some(raw) => {
                let email = email(raw)?;
                if email != current.email && self.directory.email_taken(&email, Some(id)).await? {
                    return Err(AdminError::EmailTaken);
                }
                email
            }
            None => current.email.clone(),
        };
        let first_name = match request.first_name.as_deref() {
            Some(name) => text("first_name", name, NAME_LEN)?,
            None => current.first_name.clone(),
        };
        let last_name = match request.last_name.as_deref() {
            Some(name) => text("last_name", name, NAME_LEN)?,
            None => current.last_name.clone(),
        };
        let password_hash = match request.password.as_deref() {
            Some(raw) => Some(self.hasher.hash(password(raw)?)?),
            None => None,
        };

        let assignment = current.assignment.resolve_update(
            request.role,
            request.assigned_bank_id,
            request.assigned_insurance_company_id,
        )?;
        if assignment != current.assignment {
            self.ensure_institution(&assignment).await?;
        }

        let update = AdminUserUpdate {
            email,
            first_name,
            last_name,
            password_hash,
            assignment,
            permissions: request.permissions.merge(current.permissions),
            is_active: request.is_active.unwrap_or(current.is_active),
        };
        let updated = self.directory.update(id, &update).await?;

        audit::record(
            self.audit,
            AuditEntry::new(actor, AuditAction::Update, ENTITY_TYPE, id.as_str())
                .old(current.update_snapshot())
                .new_values(updated.update_snapshot()),
        )
        .await;

        tracing::info!("Admin updated");
        Ok(updated)
    }

    /// Delete an admin. Audit entries about it are kept.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::SelfDeletion` when `actor == id`,
    /// `AdminError::NotFound`, or `AdminError::ProtectedSuperAdmin`.
    #[instrument(skip(self), fields(actor = %actor, admin_id = %id))]
    pub async fn delete(&self, actor: &AdminUserId, id: &AdminUserId) -> Result<(), AdminError> {
        if actor == id {
            return Err(AdminError::SelfDeletion);
        }
        let target = self.get(id).await?;
        if target.is_super_admin() {
            return Err(AdminError::ProtectedSuperAdmin);
        }

        self.directory.delete(id).await?;

        audit::record(
            self.audit,
            AuditEntry::new(actor, AuditAction::Delete, ENTITY_TYPE, id.as_str())
                .old(target.delete_snapshot()),
        )
        .await;

        tracing::info!(username = %target.username, "Admin deleted");
        Ok(())
    }

    /// Flip the active flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` or `AdminError::ProtectedSuperAdmin`.
    #[instrument(skip(self), fields(actor = %actor, admin_id = %id))]
    pub async fn toggle_status(
        &self,
        actor: &AdminUserId,
        id: &AdminUserId,
    ) -> Result<bool, AdminError> {
        let target = self.get(id).await?;
        if target.is_super_admin() {
            return Err(AdminError::ProtectedSuperAdmin);
        }

        let is_active = !target.is_active;
        self.directory.set_active(id, is_active).await?;

        audit::record(
            self.audit,
            AuditEntry::new(actor, AuditAction::Update, ENTITY_TYPE, id.as_str())
                .old(serde_json::json!({ "is_active": target.is_active }))
                .new_values(serde_json::json!({ "is_active": is_active })),
        )
        .await;

        tracing::info!(is_active, "Admin status toggled");
        Ok(is_active)
    }

    /// Active banks and insurance companies for assignment pickers.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the query fails.
    pub async fn institutions(&self) -> Result<AssignableInstitutions, AdminError> {
        let institutions = self.directory.active_institutions().await?;
        Ok(AssignableInstitutions::from_active(institutions))
    }

    /// Admin counts as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the query fails.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<AdminStats, AdminError> {
        Ok(self.directory.stats(start_of_month(now)).await?)
    }

    /// Verify a username/password pair and stamp `last_login`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidCredentials` for an unknown user or wrong
    /// password, `AdminError::AccountDisabled` for an inactive account.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AdminUser, AdminError> {
        let Some((admin, hash)) = self.directory.find_credentials(username.trim()).await? else {
            return Err(AdminError::InvalidCredentials);
        };
        if !self.hasher.verify(password, &hash) {
            return Err(AdminError::InvalidCredentials);
        }
        if !admin.is_active {
            return Err(AdminError::AccountDisabled);
        }

        let now = Utc::now();
        self.directory.record_login(&admin.id, now).await?;
        Ok(AdminUser {
            last_login: Some(now),
            ..admin
        })
    }

    /// Reload the admin behind a cookie session.
    ///
    /// Role and permissions come from the stored row, so deactivation,
    /// deletion and permission changes reach sessions opened earlier.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for a deleted admin and
    /// `AdminError::AccountDisabled` for a deactivated one.
    pub async fn resume_session(&self, id: &AdminUserId) -> Result<CurrentAdmin, AdminError> {
        let admin = self.directory.get(id).await?.ok_or(AdminError::NotFound)?;
        if !admin.is_active {
            return Err(AdminError::AccountDisabled);
        }
        Ok(CurrentAdmin::from(&admin))
    }

    /// Change an admin's own password after re-checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidCredentials` if `current` is wrong and
    /// `AdminError::Validation` if `new` is too short.
    #[instrument(skip(self, current, new), fields(admin_id = %id))]
    pub async fn change_password(
        &self,
        id: &AdminUserId,
        current: &str,
        new: &str,
    ) -> Result<(), AdminError> {
        let new = password(new)?;
        let hash = self
            .directory
            .password_hash(id)
            .await?
            .ok_or(AdminError::NotFound)?;
        if !self.hasher.verify(current, &hash) {
            return Err(AdminError::InvalidCredentials);
        }
        self.directory.set_password(id, &self.hasher.hash(new)?).await?;
        tracing::info!("Admin password changed");
        Ok(())
    }

    /// The institution an assignment points at must exist and be active.
    async fn ensure_institution(&self, assignment: &RoleAssignment) -> Result<(), AdminError> {
        let (kind, id) = match assignment {
            RoleAssignment::BankAdmin { bank_id } => (InstitutionKind::Bank, bank_id.as_str()),
            RoleAssignment::InsuranceAdmin {
                insurance_company_id,
            } => (InstitutionKind::Insurance, insurance_company_id.as_str()),
            RoleAssignment::SuperAdmin | RoleAssignment::Moderator => return Ok(()),
        };

        match self.directory.institution(kind, id).await? {
            None => Err(AdminError::InstitutionNotFound { kind }),
            Some(institution) if !institution.is_active => {
                Err(AdminError::InstitutionInactive { kind })
            }
            Some(_) => Ok(()),
        }
    }
}
