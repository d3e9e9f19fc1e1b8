//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::BackofficeConfig;
use crate::db::{
    AdminUserRepository, ApplicationRepository, AuditLogRepository, NotificationRepository,
    UserRepository, UserSessionRepository,
};
use crate::services::{AdminManager, ApplicationService, CredentialHasher, UserAccounts};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BackofficeConfig,
    pool: PgPool,
    hasher: Arc<dyn CredentialHasher>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Back-office configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `hasher` - Password hashing strategy shared by admin and user accounts
    #[must_use]
    pub fn new(config: BackofficeConfig, pool: PgPool, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                hasher,
            }),
        }
    }

    /// Get a reference to the back-office configuration.
    #[must_use]
    pub fn config(&self) -> &BackofficeConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.inner.hasher.as_ref()
    }
}

/// Postgres repositories backing [`UserAccounts`].
pub struct UserRepositories<'a> {
    users: UserRepository<'a>,
    sessions: UserSessionRepository<'a>,
    notifications: NotificationRepository<'a>,
}

impl<'a> UserRepositories<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            sessions: UserSessionRepository::new(pool),
            notifications: NotificationRepository::new(pool),
        }
    }

    /// End-user account service using the state's hasher and account policy.
    #[must_use]
    pub fn accounts<'s>(
        &'s self,
        state: &'s AppState,
    ) -> UserAccounts<'s, UserRepository<'a>, UserSessionRepository<'a>, NotificationRepository<'a>>
    {
        UserAccounts::new(
            &self.users,
            &self.sessions,
            &self.notifications,
            state.hasher(),
            state.config().accounts,
        )
    }
}

/// Postgres repositories backing [`AdminManager`].
pub struct AdminRepositories<'a> {
    directory: AdminUserRepository<'a>,
    audit: AuditLogRepository<'a>,
}

impl<'a> AdminRepositories<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            directory: AdminUserRepository::new(pool),
            audit: AuditLogRepository::new(pool),
        }
    }

    #[must_use]
    pub fn manager<'s>(
        &'s self,
        hasher: &'s dyn CredentialHasher,
    ) -> AdminManager<'s, AdminUserRepository<'a>, AuditLogRepository<'a>> {
        AdminManager::new(&self.directory, &self.audit, hasher)
    }
}

/// Postgres repositories backing [`ApplicationService`].
pub struct ApplicationRepositories<'a> {
    store: ApplicationRepository<'a>,
    audit: AuditLogRepository<'a>,
    notifications: NotificationRepository<'a>,
}

impl<'a> ApplicationRepositories<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            store: ApplicationRepository::new(pool),
            audit: AuditLogRepository::new(pool),
            notifications: NotificationRepository::new(pool),
        }
    }

    #[must_use]
    pub const fn service(
        &self,
    ) -> ApplicationService<
        '_,
        ApplicationRepository<'a>,
        AuditLogRepository<'a>,
        NotificationRepository<'a>,
    > {
        ApplicationService::new(&self.store, &self.audit, &self.notifications)
    }
}
