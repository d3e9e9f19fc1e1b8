//! Session types: the admin cookie session payload and end-user bearer sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bamboo_core::{AdminRole, AdminUserId, Email, Metadata, Permissions, SessionId, UserId};

use super::admin_user::AdminUser;

/// Session-stored admin identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: AdminUserId,
    pub username: String,
    pub email: Email,
    pub role: AdminRole,
    pub permissions: Permissions,
}

impl CurrentAdmin {
    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        self.role.is_super_admin()
    }

    /// Super admins always pass; others need `applications.manage`.
    #[must_use]
    pub const fn can_manage_applications(&self) -> bool {
        self.is_super_admin() || self.permissions.applications.manage
    }
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id.clone(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            role: admin.role(),
            permissions: admin.permissions,
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}

/// An end-user bearer session.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub refresh_token: Option<String>,
    pub device_info: Metadata,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    /// A session is valid while it is active and not yet expired.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }
}

/// A session about to be stored.
#[derive(Debug, Clone)]
pub struct NewUserSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub token: String,
    pub refresh_token: Option<String>,
    pub device_info: Metadata,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}
