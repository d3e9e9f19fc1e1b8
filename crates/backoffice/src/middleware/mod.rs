//! HTTP middleware stack for the back office.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store, admin cookies)
//! 5. Auth extractors (admin session or end-user bearer token, per route)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    RequireAdminAuth, RequireApplicationManager, RequireSuperAdmin, RequireUser, bearer_token,
    clear_current_admin, set_current_admin,
};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
