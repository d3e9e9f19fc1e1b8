//! Admin user repository for database operations.
//!
//! Admin rows are always read together with the display data of their
//! assigned institution. Listing filters are assembled with `QueryBuilder`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use bamboo_core::{
    AdminRole, AdminUserId, BankId, Email, InstitutionKind, InsuranceCompanyId, Permissions,
    RoleAssignment,
};

use super::institutions::InstitutionRepository;
use super::{RepositoryError, corrupt, map_unique_violation};
use crate::models::{
    AdminFilter, AdminStats, AdminUser, AdminUserUpdate, Institution, InstitutionSummary,
    NewAdminUser, RoleCounts,
};
use crate::services::admin_management::AdminDirectory;

// =============================================================================
// Internal Row Types
// =============================================================================

const SELECT_ADMIN: &str = r"
    SELECT a.id, a.username, a.email, a.first_name, a.last_name, a.role,
           a.assigned_bank_id, a.assigned_insurance_company_id, a.permissions,
           a.is_active, a.last_login, a.created_by, a.created_at, a.updated_at,
           COALESCE(b.name, i.name) AS institution_name,
           COALESCE(b.full_name, i.full_name) AS institution_full_name
    FROM backoffice.admin_user a
    LEFT JOIN backoffice.bank b ON b.id = a.assigned_bank_id
    LEFT JOIN backoffice.insurance_company i ON i.id = a.assigned_insurance_company_id
";

/// Internal row type for `PostgreSQL` admin user queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    role: AdminRole,
    assigned_bank_id: Option<String>,
    assigned_insurance_company_id: Option<String>,
    permissions: Json<Permissions>,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    institution_name: Option<String>,
    institution_full_name: Option<String>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| corrupt("email", e))?;

        let institution = match (&row.assigned_bank_id, &row.assigned_insurance_company_id) {
            (Some(id), _) => Some((id.clone(), InstitutionKind::Bank)),
            (None, Some(id)) => Some((id.clone(), InstitutionKind::Insurance)),
            (None, None) => None,
        }
        .and_then(|(id, kind)| {
            row.institution_name.clone().map(|name| InstitutionSummary {
                id,
                name,
                full_name: row.institution_full_name.clone(),
                kind,
            })
        });

        let assignment = RoleAssignment::from_columns(
            row.role,
            row.assigned_bank_id.map(BankId::new),
            row.assigned_insurance_company_id.map(InsuranceCompanyId::new),
        )
        .map_err(|e| corrupt("role assignment", e))?;

        Ok(Self {
            id: AdminUserId::new(row.id),
            username: row.username,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            assignment,
            institution,
            permissions: row.permissions.0,
            is_active: row.is_active,
            last_login: row.last_login,
            created_by: row.created_by.map(AdminUserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_admins: i64,
    active_admins: i64,
    bank_admins: i64,
    insurance_admins: i64,
    moderators: i64,
    recent_admins: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_ADMIN);
        query.push(" WHERE a.").push(column).push(" = ").push_bind(value);
        let row = query
            .build_query_as::<AdminUserRow>()
            .fetch_optional(self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

/// Append the listing filters shared by the page and count queries.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &AdminFilter) {
    query.push(" WHERE a.role <> 'super_admin'");

    if let Some(role) = filter.role {
        query.push(" AND a.role = ").push_bind(role);
    }
    match filter.institution {
        Some(InstitutionKind::Bank) => {
            query.push(" AND a.assigned_bank_id IS NOT NULL");
        }
        Some(InstitutionKind::Insurance) => {
            query.push(" AND a.assigned_insurance_company_id IS NOT NULL");
        }
        None => {}
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND a.is_active = ").push_bind(is_active);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(" AND (a.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl AdminDirectory for AdminUserRepository<'_> {
    async fn list(&self, filter: &AdminFilter) -> Result<(Vec<AdminUser>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM backoffice.admin_user a",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(SELECT_ADMIN);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY a.created_at DESC OFFSET ")
            .push_bind(filter.skip)
            .push(" LIMIT ")
            .push_bind(filter.limit);

        let rows = query
            .build_query_as::<AdminUserRow>()
            .fetch_all(self.pool)
            .await?;
        let admins = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((admins, total))
    }

    async fn get(&self, id: &AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        self.fetch_one_where("id", id.as_str()).await
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let Some(admin) = self.fetch_one_where("username", username).await? else {
            return Ok(None);
        };
        let hash = self.password_hash(&admin.id).await?;
        Ok(hash.map(|hash| (admin, hash)))
    }

    async fn password_hash(&self, id: &AdminUserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM backoffice.admin_user WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(hash)
    }

    async fn username_taken(&self, username: &str) -> Result<bool, RepositoryError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM backoffice.admin_user WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    async fn email_taken(
        &self,
        email: &Email,
        except: Option<&AdminUserId>,
    ) -> Result<bool, RepositoryError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM backoffice.admin_user
                WHERE email = $1 AND ($2::text IS NULL OR id <> $2)
            )
            ",
        )
        .bind(email.as_str())
        .bind(except.map(AdminUserId::as_str))
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    async fn institution(
        &self,
        kind: InstitutionKind,
        id: &str,
    ) -> Result<Option<Institution>, RepositoryError> {
        InstitutionRepository::new(self.pool).get(kind, id).await
    }

    async fn active_institutions(&self) -> Result<Vec<Institution>, RepositoryError> {
        InstitutionRepository::new(self.pool).list_active().await
    }

    async fn insert(&self, admin: &NewAdminUser) -> Result<AdminUser, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO backoffice.admin_user (
                id, username, email, password_hash, first_name, last_name, role,
                assigned_bank_id, assigned_insurance_company_id, permissions,
                is_active, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(admin.id.as_str())
        .bind(&admin.username)
        .bind(admin.email.as_str())
        .bind(&admin.password_hash)
        .bind(&admin.first_name)
        .bind(&admin.last_name)
        .bind(admin.assignment.role())
        .bind(admin.assignment.bank_id().map(BankId::as_str))
        .bind(admin.assignment.insurance_company_id().map(InsuranceCompanyId::as_str))
        .bind(Json(admin.permissions))
        .bind(admin.is_active)
        .bind(admin.created_by.as_ref().map(AdminUserId::as_str))
        .execute(self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.get(&admin.id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn update(
        &self,
        id: &AdminUserId,
        update: &AdminUserUpdate,
    ) -> Result<AdminUser, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE backoffice.admin_user
            SET email = $2,
                first_name = $3,
                last_name = $4,
                password_hash = COALESCE($5, password_hash),
                role = $6,
                assigned_bank_id = $7,
                assigned_insurance_company_id = $8,
                permissions = $9,
                is_active = $10,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .bind(update.email.as_str())
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.password_hash.as_deref())
        .bind(update.assignment.role())
        .bind(update.assignment.bank_id().map(BankId::as_str))
        .bind(update.assignment.insurance_company_id().map(InsuranceCompanyId::as_str))
        .bind(Json(update.permissions))
        .bind(update.is_active)
        .execute(self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: &AdminUserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM backoffice.admin_user WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: &AdminUserId, is_active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE backoffice.admin_user SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(is_active)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_login(
        &self,
        id: &AdminUserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE backoffice.admin_user SET last_login = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn set_password(&self, id: &AdminUserId, hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE backoffice.admin_user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(hash)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<AdminStats, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT COUNT(*) AS total_admins,
                   COUNT(*) FILTER (WHERE is_active) AS active_admins,
                   COUNT(*) FILTER (WHERE role = 'bank_admin') AS bank_admins,
                   COUNT(*) FILTER (WHERE role = 'insurance_admin') AS insurance_admins,
                   COUNT(*) FILTER (WHERE role = 'moderator') AS moderators,
                   COUNT(*) FILTER (WHERE created_at >= $1) AS recent_admins
            FROM backoffice.admin_user
            WHERE role <> 'super_admin'
            ",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(AdminStats {
            total_admins: row.total_admins,
            active_admins: row.active_admins,
            inactive_admins: row.total_admins - row.active_admins,
            by_role: RoleCounts {
                bank_admins: row.bank_admins,
                insurance_admins: row.insurance_admins,
                moderators: row.moderators,
            },
            recent_admins: row.recent_admins,
        })
    }
}
