//! Credit, savings and insurance application repository.
//!
//! Each kind lives in its own table with its own status enum type. Queries
//! are assembled per kind with `QueryBuilder`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use bamboo_core::{
    AdminUserId, ApplicationKind, ApplicationStatus, CreditApplicationId, CreditStatus,
    InsuranceApplicationId, InsuranceStatus, Metadata, SavingsApplicationId, SavingsStatus,
    UserId,
};

use super::RepositoryError;
use crate::models::application::{
    CreditApplication, InsuranceApplication, NewCreditApplication, NewInsuranceApplication,
    NewSavingsApplication, SavingsApplication,
};
use crate::models::{
    ApplicationFilter, ApplicationRecord, ApplicationSummary, NewApplication, StatusChange,
};
use crate::services::applications::ApplicationStore;

// =============================================================================
// Internal Row Types
// =============================================================================

const CREDIT_COLUMNS: &str = r"
    id, user_id, credit_product_id, simulation_id, requested_amount, duration_months,
    purpose, monthly_income, current_debts, down_payment, employment_type, employer_name,
    employment_duration_months, documents, status, bank_response, processing_notes,
    assigned_to, user_notified, last_notification_sent, submitted_at, updated_at
";

const SAVINGS_COLUMNS: &str = r"
    id, user_id, savings_product_id, simulation_id, initial_deposit, monthly_contribution,
    savings_goal, target_amount, target_date, documents, status, bank_response,
    account_number, processing_notes, assigned_to, user_notified, last_notification_sent,
    submitted_at, updated_at
";

const INSURANCE_COLUMNS: &str = r"
    id, user_id, insurance_product_id, quote_id, insurance_type, coverage_amount,
    beneficiaries, vehicle_info, property_info, health_info, travel_info, business_info,
    documents, medical_exam_required, medical_exam_completed, status, insurance_response,
    policy_number, premium_amount, processing_notes, assigned_to, user_notified,
    last_notification_sent, submitted_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct CreditRow {
    id: String,
    user_id: String,
    credit_product_id: String,
    simulation_id: Option<String>,
    requested_amount: Decimal,
    duration_months: i32,
    purpose: String,
    monthly_income: Decimal,
    current_debts: Decimal,
    down_payment: Decimal,
    employment_type: Option<String>,
    employer_name: Option<String>,
    employment_duration_months: Option<i32>,
    documents: Json<Vec<String>>,
    status: CreditStatus,
    bank_response: Option<Json<Metadata>>,
    processing_notes: Option<String>,
    assigned_to: Option<String>,
    user_notified: bool,
    last_notification_sent: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CreditRow> for CreditApplication {
    fn from(row: CreditRow) -> Self {
        Self {
            id: CreditApplicationId::new(row.id),
            user_id: UserId::new(row.user_id),
            credit_product_id: row.credit_product_id,
            simulation_id: row.simulation_id,
            requested_amount: row.requested_amount,
            duration_months: row.duration_months,
            purpose: row.purpose,
            monthly_income: row.monthly_income,
            current_debts: row.current_debts,
            down_payment: row.down_payment,
            employment_type: row.employment_type,
            employer_name: row.employer_name,
            employment_duration_months: row.employment_duration_months,
            documents: row.documents.0,
            status: row.status,
            bank_response: row.bank_response.map(|json| json.0),
            processing_notes: row.processing_notes,
            assigned_to: row.assigned_to.map(AdminUserId::new),
            user_notified: row.user_notified,
            last_notification_sent: row.last_notification_sent,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SavingsRow {
    id: String,
    user_id: String,
    savings_product_id: String,
    simulation_id: Option<String>,
    initial_deposit: Decimal,
    monthly_contribution: Option<Decimal>,
    savings_goal: Option<String>,
    target_amount: Option<Decimal>,
    target_date: Option<NaiveDate>,
    documents: Json<Vec<String>>,
    status: SavingsStatus,
    bank_response: Option<Json<Metadata>>,
    account_number: Option<String>,
    processing_notes: Option<String>,
    assigned_to: Option<String>,
    user_notified: bool,
    last_notification_sent: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SavingsRow> for SavingsApplication {
    fn from(row: SavingsRow) -> Self {
        Self {
            id: SavingsApplicationId::new(row.id),
            user_id: UserId::new(row.user_id),
            savings_product_id: row.savings_product_id,
            simulation_id: row.simulation_id,
            initial_deposit: row.initial_deposit,
            monthly_contribution: row.monthly_contribution,
            savings_goal: row.savings_goal,
            target_amount: row.target_amount,
            target_date: row.target_date,
            documents: row.documents.0,
            status: row.status,
            bank_response: row.bank_response.map(|json| json.0),
            account_number: row.account_number,
            processing_notes: row.processing_notes,
            assigned_to: row.assigned_to.map(AdminUserId::new),
            user_notified: row.user_notified,
            last_notification_sent: row.last_notification_sent,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InsuranceRow {
    id: String,
    user_id: String,
    insurance_product_id: String,
    quote_id: Option<String>,
    insurance_type: String,
    coverage_amount: Option<Decimal>,
    beneficiaries: Json<Vec<Metadata>>,
    vehicle_info: Option<Json<Metadata>>,
    property_info: Option<Json<Metadata>>,
    health_info: Option<Json<Metadata>>,
    travel_info: Option<Json<Metadata>>,
    business_info: Option<Json<Metadata>>,
    documents: Json<Vec<String>>,
    medical_exam_required: bool,
    medical_exam_completed: bool,
    status: InsuranceStatus,
    insurance_response: Option<Json<Metadata>>,
    policy_number: Option<String>,
    premium_amount: Option<Decimal>,
    processing_notes: Option<String>,
    assigned_to: Option<String>,
    user_notified: bool,
    last_notification_sent: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InsuranceRow> for InsuranceApplication {
    fn from(row: InsuranceRow) -> Self {
        Self {
            id: InsuranceApplicationId::new(row.id),
            user_id: UserId::new(row.user_id),
            insurance_product_id: row.insurance_product_id,
            quote_id: row.quote_id,
            insurance_type: row.insurance_type,
            coverage_amount: row.coverage_amount,
            beneficiaries: row.beneficiaries.0,
            vehicle_info: row.vehicle_info.map(|json| json.0),
            property_info: row.property_info.map(|json| json.0),
            health_info: row.health_info.map(|json| json.0),
            travel_info: row.travel_info.map(|json| json.0),
            business_info: row.business_info.map(|json| json.0),
            documents: row.documents.0,
            medical_exam_required: row.medical_exam_required,
            medical_exam_completed: row.medical_exam_completed,
            status: row.status,
            insurance_response: row.insurance_response.map(|json| json.0),
            policy_number: row.policy_number,
            premium_amount: row.premium_amount,
            processing_notes: row.processing_notes,
            assigned_to: row.assigned_to.map(AdminUserId::new),
            user_notified: row.user_notified,
            last_notification_sent: row.last_notification_sent,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Per-kind SQL fragments
// =============================================================================

const fn table(kind: ApplicationKind) -> &'static str {
    match kind {
        ApplicationKind::Credit => "backoffice.credit_application",
        ApplicationKind::Savings => "backoffice.savings_application",
        ApplicationKind::Insurance => "backoffice.insurance_application",
    }
}

const fn columns(kind: ApplicationKind) -> &'static str {
    match kind {
        ApplicationKind::Credit => CREDIT_COLUMNS,
        ApplicationKind::Savings => SAVINGS_COLUMNS,
        ApplicationKind::Insurance => INSURANCE_COLUMNS,
    }
}

/// Column holding the institution's structured response.
const fn response_column(kind: ApplicationKind) -> &'static str {
    match kind {
        ApplicationKind::Credit | ApplicationKind::Savings => "bank_response",
        ApplicationKind::Insurance => "insurance_response",
    }
}

fn select(kind: ApplicationKind) -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT {} FROM {}", columns(kind), table(kind)))
}

/// Bind a status with the enum type of its own table.
fn push_status(query: &mut QueryBuilder<'_, Postgres>, status: ApplicationStatus) {
    match status {
        ApplicationStatus::Credit(status) => query.push_bind(status),
        ApplicationStatus::Savings(status) => query.push_bind(status),
        ApplicationStatus::Insurance(status) => query.push_bind(status),
    };
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for all three application tables.
pub struct ApplicationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApplicationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(
        &self,
        kind: ApplicationKind,
        mut query: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let records = match kind {
            ApplicationKind::Credit => query
                .build_query_as::<CreditRow>()
                .fetch_all(self.pool)
                .await?
                .into_iter()
                .map(|row| ApplicationRecord::Credit(row.into()))
                .collect(),
            ApplicationKind::Savings => query
                .build_query_as::<SavingsRow>()
                .fetch_all(self.pool)
                .await?
                .into_iter()
                .map(|row| ApplicationRecord::Savings(row.into()))
                .collect(),
            ApplicationKind::Insurance => query
                .build_query_as::<InsuranceRow>()
                .fetch_all(self.pool)
                .await?
                .into_iter()
                .map(|row| ApplicationRecord::Insurance(row.into()))
                .collect(),
        };
        Ok(records)
    }

    async fn insert_credit(
        &self,
        user_id: &UserId,
        app: &NewCreditApplication,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO backoffice.credit_application (
                id, user_id, credit_product_id, simulation_id, requested_amount,
                duration_months, purpose, monthly_income, current_debts, down_payment,
                employment_type, employer_name, employment_duration_months, documents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(app.id.as_str())
        .bind(user_id.as_str())
        .bind(&app.credit_product_id)
        .bind(app.simulation_id.as_deref())
        .bind(app.requested_amount)
        .bind(app.duration_months)
        .bind(&app.purpose)
        .bind(app.monthly_income)
        .bind(app.current_debts)
        .bind(app.down_payment)
        .bind(app.employment_type.as_deref())
        .bind(app.employer_name.as_deref())
        .bind(app.employment_duration_months)
        .bind(Json(&app.documents))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_savings(
        &self,
        user_id: &UserId,
        app: &NewSavingsApplication,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO backoffice.savings_application (
                id, user_id, savings_product_id, simulation_id, initial_deposit,
                monthly_contribution, savings_goal, target_amount, target_date, documents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(app.id.as_str())
        .bind(user_id.as_str())
        .bind(&app.savings_product_id)
        .bind(app.simulation_id.as_deref())
        .bind(app.initial_deposit)
        .bind(app.monthly_contribution)
        .bind(app.savings_goal.as_deref())
        .bind(app.target_amount)
        .bind(app.target_date)
        .bind(Json(&app.documents))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn insert_insurance(
        &self,
        user_id: &UserId,
        app: &NewInsuranceApplication,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO backoffice.insurance_application (
                id, user_id, insurance_product_id, quote_id, insurance_type,
                coverage_amount, beneficiaries, vehicle_info, property_info,
                health_info, travel_info, business_info, documents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(app.id.as_str())
        .bind(user_id.as_str())
        .bind(&app.insurance_product_id)
        .bind(app.quote_id.as_deref())
        .bind(&app.insurance_type)
        .bind(app.coverage_amount)
        .bind(Json(&app.beneficiaries))
        .bind(app.vehicle_info.as_ref().map(Json))
        .bind(app.property_info.as_ref().map(Json))
        .bind(app.health_info.as_ref().map(Json))
        .bind(app.travel_info.as_ref().map(Json))
        .bind(app.business_info.as_ref().map(Json))
        .bind(Json(&app.documents))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ApplicationStore for ApplicationRepository<'_> {
    async fn submit(
        &self,
        user_id: &UserId,
        application: &NewApplication,
    ) -> Result<ApplicationRecord, RepositoryError> {
        match application {
            NewApplication::Credit(app) => self.insert_credit(user_id, app).await?,
            NewApplication::Savings(app) => self.insert_savings(user_id, app).await?,
            NewApplication::Insurance(app) => self.insert_insurance(user_id, app).await?,
        }
        self.get(application.kind(), application.id())
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ApplicationSummary>, RepositoryError> {
        let mut summaries = Vec::new();
        for &kind in ApplicationKind::ALL {
            let mut query = select(kind);
            query.push(" WHERE user_id = ").push_bind(user_id.as_str().to_owned());
            let records = self.fetch_all(kind, query).await?;
            summaries.extend(records.iter().map(ApplicationRecord::summary));
        }
        summaries.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(summaries)
    }

    async fn list(
        &self,
        kind: ApplicationKind,
        filter: &ApplicationFilter,
    ) -> Result<(Vec<ApplicationRecord>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", table(kind)));
        let mut query = select(kind);
        if let Some(status) = filter.status {
            for builder in [&mut count, &mut query] {
                builder.push(" WHERE status = ");
                push_status(builder, status);
            }
        }
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        query
            .push(" ORDER BY submitted_at DESC OFFSET ")
            .push_bind(filter.skip)
            .push(" LIMIT ")
            .push_bind(filter.limit);
        let records = self.fetch_all(kind, query).await?;
        Ok((records, total))
    }

    async fn get(
        &self,
        kind: ApplicationKind,
        id: &str,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let mut query = select(kind);
        query.push(" WHERE id = ").push_bind(id.to_owned());
        Ok(self.fetch_all(kind, query).await?.into_iter().next())
    }

    async fn write_status(
        &self,
        kind: ApplicationKind,
        id: &str,
        change: &StatusChange,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET status = ", table(kind)));
        push_status(&mut query, change.status);
        query
            .push(", processing_notes = COALESCE(")
            .push_bind(change.processing_notes.clone())
            .push(", processing_notes), assigned_to = COALESCE(")
            .push_bind(change.assigned_to.as_ref().map(|id| id.as_str().to_owned()))
            .push(", assigned_to)");
        if let Some(response) = &change.institution_response {
            query
                .push(", ")
                .push(response_column(kind))
                .push(" = ")
                .push_bind(Json(response.clone()));
        }
        query
            .push(", user_notified = FALSE, updated_at = NOW() WHERE id = ")
            .push_bind(id.to_owned());

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(kind, id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn mark_notified(
        &self,
        kind: ApplicationKind,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "UPDATE {} SET user_notified = TRUE, last_notification_sent = $2 WHERE id = $1",
            table(kind)
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_institution_response_column_by_kind() {
        assert_eq!(response_column(ApplicationKind::Credit), "bank_response");
        assert_eq!(response_column(ApplicationKind::Savings), "bank_response");
        assert_eq!(response_column(ApplicationKind::Insurance), "insurance_response");
    }

    #[test]
    fn test_status_filter_binds_into_both_queries() {
        let mut query = select(ApplicationKind::Savings);
        query.push(" WHERE status = ");
        push_status(&mut query, ApplicationStatus::Savings(SavingsStatus::Opened));
        assert!(query.sql().contains("FROM backoffice.savings_application WHERE status = $1"));
    }
}
