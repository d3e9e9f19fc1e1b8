//! Admin user domain types.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use bamboo_core::{
    AdminRole, AdminUserId, Email, InstitutionKind, Permissions, RoleAssignment,
};

use super::institution::InstitutionSummary;

/// An admin user (domain type).
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Role together with its institution assignment.
    pub assignment: RoleAssignment,
    /// Display data of the assigned institution, if any.
    pub institution: Option<InstitutionSummary>,
    pub permissions: Permissions,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    /// Admin who created this account (absent for bootstrapped accounts).
    pub created_by: Option<AdminUserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    #[must_use]
    pub const fn role(&self) -> AdminRole {
        self.assignment.role()
    }

    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        self.role().is_super_admin()
    }

    /// Audit snapshot written before and after an update.
    #[must_use]
    pub fn update_snapshot(&self) -> Value {
        json!({
            "username": self.username,
            "email": self.email,
            "role": self.role(),
            "is_active": self.is_active,
        })
    }

    /// Audit snapshot written before a delete.
    #[must_use]
    pub fn delete_snapshot(&self) -> Value {
        json!({
            "username": self.username,
            "email": self.email,
            "role": self.role(),
        })
    }

    /// Audit snapshot written after a create.
    #[must_use]
    pub fn create_snapshot(&self) -> Value {
        json!({
            "username": self.username,
            "role": self.role(),
        })
    }

    /// Full JSON view used by listing and detail endpoints.
    #[must_use]
    pub fn view(&self) -> AdminView<'_> {
        let institution_of = |kind| {
            self.institution
                .as_ref()
                .filter(|summary| summary.kind == kind)
        };

        AdminView {
            id: &self.id,
            username: &self.username,
            email: &self.email,
            first_name: &self.first_name,
            last_name: &self.last_name,
            role: self.role(),
            assigned_bank: institution_of(InstitutionKind::Bank),
            assigned_insurance_company: institution_of(InstitutionKind::Insurance),
            permissions: &self.permissions,
            is_active: self.is_active,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Serialized shape of an admin for API responses.
#[derive(Debug, Serialize)]
pub struct AdminView<'a> {
    pub id: &'a AdminUserId,
    pub username: &'a str,
    pub email: &'a Email,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: AdminRole,
    pub assigned_bank: Option<&'a InstitutionSummary>,
    pub assigned_insurance_company: Option<&'a InstitutionSummary>,
    pub permissions: &'a Permissions,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated admin ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewAdminUser {
    pub id: AdminUserId,
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub assignment: RoleAssignment,
    pub permissions: Permissions,
    pub is_active: bool,
    pub created_by: Option<AdminUserId>,
}

/// The full post-update state of an admin's mutable columns.
///
/// `password_hash` is only written when present.
#[derive(Debug, Clone)]
pub struct AdminUserUpdate {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub assignment: RoleAssignment,
    pub permissions: Permissions,
    pub is_active: bool,
}

/// Listing filters. Super admins are never listed.
#[derive(Debug, Clone, Default)]
pub struct AdminFilter {
    /// Case-insensitive substring over username, first/last name and email.
    pub search: Option<String>,
    pub role: Option<AdminRole>,
    /// Only admins assigned to this kind of institution.
    pub institution: Option<InstitutionKind>,
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

impl AdminFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    /// Whether `admin` passes every filter except pagination.
    #[must_use]
    pub fn matches(&self, admin: &AdminUser) -> bool {
        if admin.is_super_admin() {
            return false;
        }
        if self.role.is_some_and(|role| admin.role() != role) {
            return false;
        }
        if self
            .institution
            .is_some_and(|kind| admin.role().institution_kind() != Some(kind))
        {
            return false;
        }
        if self.is_active.is_some_and(|active| admin.is_active != active) {
            return false;
        }
        self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            [
                admin.username.as_str(),
                admin.first_name.as_str(),
                admin.last_name.as_str(),
                admin.email.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
    }
}

/// Counts returned by the statistics endpoint. Super admins are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AdminStats {
    pub total_admins: i64,
    pub active_admins: i64,
    pub inactive_admins: i64,
    pub by_role: RoleCounts,
    /// Admins created since the start of the current calendar month (UTC).
    pub recent_admins: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoleCounts {
    pub bank_admins: i64,
    pub insurance_admins: i64,
    pub moderators: i64,
}

/// Midnight UTC on the first day of `now`'s month.
#[must_use]
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bamboo_core::{BankId, PermissionToggles};

    fn admin(username: &str, assignment: RoleAssignment) -> AdminUser {
        let now = Utc::now();
        AdminUser {
            id: AdminUserId::generate(),
            username: username.to_string(),
            email: Email::parse(&format!("{username}@bamboo.ga")).unwrap(),
            first_name: "Awa".to_string(),
            last_name: "Nzé".to_string(),
            assignment,
            institution: None,
            permissions: PermissionToggles::default().into(),
            is_active: true,
            last_login: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_start_of_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 17, 15, 42, 9).unwrap();
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_filter_never_matches_super_admin() {
        let filter = AdminFilter::default();
        assert!(!filter.matches(&admin("root", RoleAssignment::SuperAdmin)));
        assert!(filter.matches(&admin("mod", RoleAssignment::Moderator)));
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let filter = AdminFilter {
            search: Some("JDO".to_string()),
            ..AdminFilter::default()
        };
        assert!(filter.matches(&admin("jdoe", RoleAssignment::Moderator)));
        assert!(!filter.matches(&admin("asmith", RoleAssignment::Moderator)));
    }

    #[test]
    fn test_filter_by_institution_kind() {
        let filter = AdminFilter {
            institution: Some(InstitutionKind::Bank),
            ..AdminFilter::default()
        };
        let banker = admin(
            "banker",
            RoleAssignment::BankAdmin {
                bank_id: BankId::new("bgfi"),
            },
        );
        assert!(filter.matches(&banker));
        assert!(!filter.matches(&admin("mod", RoleAssignment::Moderator)));
    }

    #[test]
    fn test_snapshots() {
        let a = admin("jdoe", RoleAssignment::Moderator);
        assert_eq!(a.create_snapshot(), json!({"username": "jdoe", "role": "moderator"}));
        assert_eq!(a.update_snapshot()["is_active"], true);
        assert!(a.delete_snapshot().get("is_active").is_none());
    }
}
