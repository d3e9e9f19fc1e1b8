//! Bank and insurance company reference data.

use sqlx::PgPool;

use bamboo_core::InstitutionKind;

use super::RepositoryError;
use crate::models::{Institution, InstitutionSeed};

#[derive(Debug, sqlx::FromRow)]
struct InstitutionRow {
    id: String,
    name: String,
    full_name: Option<String>,
    is_active: bool,
}

impl InstitutionRow {
    fn into_institution(self, kind: InstitutionKind) -> Institution {
        Institution {
            id: self.id,
            name: self.name,
            full_name: self.full_name,
            kind,
            is_active: self.is_active,
        }
    }
}

const fn table(kind: InstitutionKind) -> &'static str {
    match kind {
        InstitutionKind::Bank => "backoffice.bank",
        InstitutionKind::Insurance => "backoffice.insurance_company",
    }
}

/// Repository for institution lookups and seeding.
pub struct InstitutionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InstitutionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an institution by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(
        &self,
        kind: InstitutionKind,
        id: &str,
    ) -> Result<Option<Institution>, RepositoryError> {
        let sql = format!(
            "SELECT id, name, full_name, is_active FROM {} WHERE id = $1",
            table(kind)
        );
        let row = sqlx::query_as::<_, InstitutionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|row| row.into_institution(kind)))
    }

    /// List active banks then active insurance companies, each ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> Result<Vec<Institution>, RepositoryError> {
        let mut institutions = Vec::new();
        for kind in [InstitutionKind::Bank, InstitutionKind::Insurance] {
            let sql = format!(
                "SELECT id, name, full_name, is_active FROM {} WHERE is_active ORDER BY name",
                table(kind)
            );
            let rows = sqlx::query_as::<_, InstitutionRow>(&sql)
                .fetch_all(self.pool)
                .await?;
            institutions.extend(rows.into_iter().map(|row| row.into_institution(kind)));
        }
        Ok(institutions)
    }

    /// Insert or update a seeded institution.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(
        &self,
        kind: InstitutionKind,
        seed: &InstitutionSeed,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO {} (id, name, full_name, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                full_name = EXCLUDED.full_name,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            ",
            table(kind)
        );
        sqlx::query(&sql)
            .bind(&seed.id)
            .bind(&seed.name)
            .bind(seed.full_name.as_deref())
            .bind(seed.is_active)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
