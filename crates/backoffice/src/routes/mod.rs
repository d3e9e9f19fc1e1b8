//! HTTP route handlers for the back office API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Readiness (database)
//!
//! # Admin auth (cookie session)
//! POST /api/admin/auth/login                    - Username/password login
//! POST /api/admin/auth/logout                   - End the session
//! GET  /api/admin/auth/me                       - Current admin
//! POST /api/admin/auth/change-password          - Change own password
//!
//! # Admin management (super admin only)
//! GET    /api/admin/management/admins           - Filtered, paginated listing
//! POST   /api/admin/management/admins           - Create admin
//! GET    /api/admin/management/admins/{id}      - Admin detail
//! PUT    /api/admin/management/admins/{id}      - Update admin
//! DELETE /api/admin/management/admins/{id}      - Delete admin
//! PATCH  /api/admin/management/admins/{id}/toggle-status
//! GET    /api/admin/management/institutions     - Active banks and insurers
//! GET    /api/admin/management/stats            - Counts by role and status
//!
//! # Application processing (applications.manage)
//! GET   /api/admin/applications/{kind}          - Listing with status filter
//! GET   /api/admin/applications/{kind}/{id}     - Detail
//! PATCH /api/admin/applications/{kind}/{id}/status
//! POST  /api/admin/applications/{kind}/{id}/notified
//!
//! # End users (bearer token)
//! POST /api/users/auth/{register,login,logout,verify,resend-verification}
//! POST /api/users/auth/password-reset[/confirm]
//! GET|PUT /api/users/me                         - Profile
//! POST /api/users/me/contact                    - Add an email or phone
//! POST /api/users/me/password
//! GET|POST /api/users/me/documents              - Document metadata
//! GET  /api/users/me/notifications
//! POST /api/users/me/notifications/read
//! GET  /api/users/me/applications               - History
//! POST /api/users/me/applications/{credit,savings,insurance}
//! GET  /api/users/me/applications/{kind}/{id}
//! ```

pub mod admin_applications;
pub mod admin_auth;
pub mod admin_management;
pub mod user_account;
pub mod user_applications;
pub mod user_auth;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router (without health checks and layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(admin_auth::router())
        .merge(admin_management::router())
        .merge(admin_applications::router())
        .merge(user_auth::router())
        .merge(user_account::router())
        .merge(user_applications::router())
}
