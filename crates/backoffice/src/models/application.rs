//! Credit, savings and insurance applications submitted by end users.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use bamboo_core::{
    AdminUserId, ApplicationKind, ApplicationStatus, CreditApplicationId, CreditStatus,
    InsuranceApplicationId, InsuranceStatus, Metadata, SavingsApplicationId, SavingsStatus, UserId,
};

/// Rejected submission, with a user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidApplication(pub String);

fn positive(field: &str, value: Decimal) -> Result<Decimal, InvalidApplication> {
    if value > Decimal::ZERO {
        Ok(value)
    } else {
        Err(InvalidApplication(format!("{field} must be greater than 0")))
    }
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal, InvalidApplication> {
    if value >= Decimal::ZERO {
        Ok(value)
    } else {
        Err(InvalidApplication(format!("{field} must not be negative")))
    }
}

fn required(field: &str, value: String) -> Result<String, InvalidApplication> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(InvalidApplication(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Stored applications
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreditApplication {
    pub id: CreditApplicationId,
    pub user_id: UserId,
    pub credit_product_id: String,
    pub simulation_id: Option<String>,
    pub requested_amount: Decimal,
    pub duration_months: i32,
    pub purpose: String,
    pub monthly_income: Decimal,
    pub current_debts: Decimal,
    pub down_payment: Decimal,
    pub employment_type: Option<String>,
    pub employer_name: Option<String>,
    pub employment_duration_months: Option<i32>,
    pub documents: Vec<String>,
    pub status: CreditStatus,
    pub bank_response: Option<Metadata>,
    pub processing_notes: Option<String>,
    pub assigned_to: Option<AdminUserId>,
    pub user_notified: bool,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsApplication {
    pub id: SavingsApplicationId,
    pub user_id: UserId,
    pub savings_product_id: String,
    pub simulation_id: Option<String>,
    pub initial_deposit: Decimal,
    pub monthly_contribution: Option<Decimal>,
    pub savings_goal: Option<String>,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<NaiveDate>,
    pub documents: Vec<String>,
    pub status: SavingsStatus,
    pub bank_response: Option<Metadata>,
    pub account_number: Option<String>,
    pub processing_notes: Option<String>,
    pub assigned_to: Option<AdminUserId>,
    pub user_notified: bool,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsuranceApplication {
    pub id: InsuranceApplicationId,
    pub user_id: UserId,
    pub insurance_product_id: String,
    pub quote_id: Option<String>,
    pub insurance_type: String,
    pub coverage_amount: Option<Decimal>,
    pub beneficiaries: Vec<Metadata>,
    pub vehicle_info: Option<Metadata>,
    pub property_info: Option<Metadata>,
    pub health_info: Option<Metadata>,
    pub travel_info: Option<Metadata>,
    pub business_info: Option<Metadata>,
    pub documents: Vec<String>,
    pub medical_exam_required: bool,
    pub medical_exam_completed: bool,
    pub status: InsuranceStatus,
    pub insurance_response: Option<Metadata>,
    pub policy_number: Option<String>,
    pub premium_amount: Option<Decimal>,
    pub processing_notes: Option<String>,
    pub assigned_to: Option<AdminUserId>,
    pub user_notified: bool,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Any stored application. Serializes as the inner record.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApplicationRecord {
    Credit(CreditApplication),
    Savings(SavingsApplication),
    Insurance(InsuranceApplication),
}

impl ApplicationRecord {
    #[must_use]
    pub const fn kind(&self) -> ApplicationKind {
        match self {
            Self::Credit(_) => ApplicationKind::Credit,
            Self::Savings(_) => ApplicationKind::Savings,
            Self::Insurance(_) => ApplicationKind::Insurance,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Credit(app) => app.id.as_str(),
            Self::Savings(app) => app.id.as_str(),
            Self::Insurance(app) => app.id.as_str(),
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        match self {
            Self::Credit(app) => &app.user_id,
            Self::Savings(app) => &app.user_id,
            Self::Insurance(app) => &app.user_id,
        }
    }

    #[must_use]
    pub const fn status(&self) -> ApplicationStatus {
        match self {
            Self::Credit(app) => ApplicationStatus::Credit(app.status),
            Self::Savings(app) => ApplicationStatus::Savings(app.status),
            Self::Insurance(app) => ApplicationStatus::Insurance(app.status),
        }
    }

    #[must_use]
    pub const fn user_notified(&self) -> bool {
        match self {
            Self::Credit(app) => app.user_notified,
            Self::Savings(app) => app.user_notified,
            Self::Insurance(app) => app.user_notified,
        }
    }

    /// Headline amount: requested amount, initial deposit or coverage.
    #[must_use]
    pub const fn amount(&self) -> Option<Decimal> {
        match self {
            Self::Credit(app) => Some(app.requested_amount),
            Self::Savings(app) => Some(app.initial_deposit),
            Self::Insurance(app) => app.coverage_amount,
        }
    }

    #[must_use]
    pub fn product_id(&self) -> &str {
        match self {
            Self::Credit(app) => &app.credit_product_id,
            Self::Savings(app) => &app.savings_product_id,
            Self::Insurance(app) => &app.insurance_product_id,
        }
    }

    #[must_use]
    pub fn summary(&self) -> ApplicationSummary {
        let (submitted_at, updated_at) = match self {
            Self::Credit(app) => (app.submitted_at, app.updated_at),
            Self::Savings(app) => (app.submitted_at, app.updated_at),
            Self::Insurance(app) => (app.submitted_at, app.updated_at),
        };
        ApplicationSummary {
            id: self.id().to_string(),
            kind: self.kind(),
            product_id: self.product_id().to_string(),
            amount: self.amount(),
            status: self.status(),
            submitted_at,
            updated_at,
        }
    }

    /// Audit snapshot of the status column.
    #[must_use]
    pub fn status_snapshot(&self) -> Value {
        json!({ "status": self.status() })
    }
}

/// Row of the end user's application history.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ApplicationKind,
    pub product_id: String,
    pub amount: Option<Decimal>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Submissions
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreditApplicationRequest {
    pub credit_product_id: String,
    #[serde(default)]
    pub simulation_id: Option<String>,
    pub requested_amount: Decimal,
    pub duration_months: i32,
    pub purpose: String,
    pub monthly_income: Decimal,
    #[serde(default)]
    pub current_debts: Decimal,
    #[serde(default)]
    pub down_payment: Decimal,
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub employer_name: Option<String>,
    #[serde(default)]
    pub employment_duration_months: Option<i32>,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl CreditApplicationRequest {
    pub const MIN_PURPOSE_CHARS: usize = 10;

    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(self) -> Result<NewApplication, InvalidApplication> {
        let purpose = required("purpose", self.purpose)?;
        if purpose.chars().count() < Self::MIN_PURPOSE_CHARS {
            return Err(InvalidApplication(format!(
                "purpose must be at least {} characters",
                Self::MIN_PURPOSE_CHARS
            )));
        }
        if self.duration_months <= 0 {
            return Err(InvalidApplication(
                "duration_months must be greater than 0".to_string(),
            ));
        }
        if self.employment_duration_months.is_some_and(|m| m < 0) {
            return Err(InvalidApplication(
                "employment_duration_months must not be negative".to_string(),
            ));
        }

        Ok(NewApplication::Credit(NewCreditApplication {
            id: CreditApplicationId::generate(),
            credit_product_id: required("credit_product_id", self.credit_product_id)?,
            simulation_id: optional_text(self.simulation_id),
            requested_amount: positive("requested_amount", self.requested_amount)?,
            duration_months: self.duration_months,
            purpose,
            monthly_income: positive("monthly_income", self.monthly_income)?,
            current_debts: non_negative("current_debts", self.current_debts)?,
            down_payment: non_negative("down_payment", self.down_payment)?,
            employment_type: optional_text(self.employment_type),
            employer_name: optional_text(self.employer_name),
            employment_duration_months: self.employment_duration_months,
            documents: self.document_ids,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavingsApplicationRequest {
    pub savings_product_id: String,
    #[serde(default)]
    pub simulation_id: Option<String>,
    pub initial_deposit: Decimal,
    #[serde(default)]
    pub monthly_contribution: Option<Decimal>,
    #[serde(default)]
    pub savings_goal: Option<String>,
    #[serde(default)]
    pub target_amount: Option<Decimal>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl SavingsApplicationRequest {
    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(self) -> Result<NewApplication, InvalidApplication> {
        Ok(NewApplication::Savings(NewSavingsApplication {
            id: SavingsApplicationId::generate(),
            savings_product_id: required("savings_product_id", self.savings_product_id)?,
            simulation_id: optional_text(self.simulation_id),
            initial_deposit: positive("initial_deposit", self.initial_deposit)?,
            monthly_contribution: self
                .monthly_contribution
                .map(|v| non_negative("monthly_contribution", v))
                .transpose()?,
            savings_goal: optional_text(self.savings_goal),
            target_amount: self
                .target_amount
                .map(|v| positive("target_amount", v))
                .transpose()?,
            target_date: self.target_date,
            documents: self.document_ids,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceApplicationRequest {
    pub insurance_product_id: String,
    #[serde(default)]
    pub quote_id: Option<String>,
    pub insurance_type: String,
    #[serde(default)]
    pub coverage_amount: Option<Decimal>,
    #[serde(default)]
    pub beneficiaries: Vec<Metadata>,
    #[serde(default)]
    pub vehicle_info: Option<Metadata>,
    #[serde(default)]
    pub property_info: Option<Metadata>,
    #[serde(default)]
    pub health_info: Option<Metadata>,
    #[serde(default)]
    pub travel_info: Option<Metadata>,
    #[serde(default)]
    pub business_info: Option<Metadata>,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl InsuranceApplicationRequest {
    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(self) -> Result<NewApplication, InvalidApplication> {
        Ok(NewApplication::Insurance(NewInsuranceApplication {
            id: InsuranceApplicationId::generate(),
            insurance_product_id: required("insurance_product_id", self.insurance_product_id)?,
            quote_id: optional_text(self.quote_id),
            insurance_type: required("insurance_type", self.insurance_type)?,
            coverage_amount: self
                .coverage_amount
                .map(|v| positive("coverage_amount", v))
                .transpose()?,
            beneficiaries: self.beneficiaries,
            vehicle_info: self.vehicle_info,
            property_info: self.property_info,
            health_info: self.health_info,
            travel_info: self.travel_info,
            business_info: self.business_info,
            documents: self.document_ids,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct NewCreditApplication {
    pub id: CreditApplicationId,
    pub credit_product_id: String,
    pub simulation_id: Option<String>,
    pub requested_amount: Decimal,
    pub duration_months: i32,
    pub purpose: String,
    pub monthly_income: Decimal,
    pub current_debts: Decimal,
    pub down_payment: Decimal,
    pub employment_type: Option<String>,
    pub employer_name: Option<String>,
    pub employment_duration_months: Option<i32>,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewSavingsApplication {
    pub id: SavingsApplicationId,
    pub savings_product_id: String,
    pub simulation_id: Option<String>,
    pub initial_deposit: Decimal,
    pub monthly_contribution: Option<Decimal>,
    pub savings_goal: Option<String>,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<NaiveDate>,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewInsuranceApplication {
    pub id: InsuranceApplicationId,
    pub insurance_product_id: String,
    pub quote_id: Option<String>,
    pub insurance_type: String,
    pub coverage_amount: Option<Decimal>,
    pub beneficiaries: Vec<Metadata>,
    pub vehicle_info: Option<Metadata>,
    pub property_info: Option<Metadata>,
    pub health_info: Option<Metadata>,
    pub travel_info: Option<Metadata>,
    pub business_info: Option<Metadata>,
    pub documents: Vec<String>,
}

/// A validated submission. Always stored with status `pending`.
#[derive(Debug, Clone)]
pub enum NewApplication {
    Credit(NewCreditApplication),
    Savings(NewSavingsApplication),
    Insurance(NewInsuranceApplication),
}

impl NewApplication {
    #[must_use]
    pub const fn kind(&self) -> ApplicationKind {
        match self {
            Self::Credit(_) => ApplicationKind::Credit,
            Self::Savings(_) => ApplicationKind::Savings,
            Self::Insurance(_) => ApplicationKind::Insurance,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Credit(app) => app.id.as_str(),
            Self::Savings(app) => app.id.as_str(),
            Self::Insurance(app) => app.id.as_str(),
        }
    }
}

// =============================================================================
// Back-office processing
// =============================================================================

/// A status write plus optional annotations.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ApplicationStatus,
    pub processing_notes: Option<String>,
    pub assigned_to: Option<AdminUserId>,
    /// Stored as `bank_response` or `insurance_response` by kind.
    pub institution_response: Option<Metadata>,
}

/// Back-office listing filters.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl ApplicationFilter {
    #[must_use]
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        self.status.is_none_or(|status| status == record.status())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credit_request() -> CreditApplicationRequest {
        serde_json::from_value(json!({
            "credit_product_id": "bgfi_immo",
            "requested_amount": "15000000",
            "duration_months": 120,
            "purpose": "Purchase of a family home in Libreville",
            "monthly_income": 900000,
        }))
        .unwrap()
    }

    #[test]
    fn test_credit_request_defaults_and_validates() {
        let request = credit_request();
        assert_eq!(request.current_debts, Decimal::ZERO);
        let NewApplication::Credit(app) = request.validate().unwrap() else {
            panic!("expected a credit application");
        };
        assert!(app.id.as_str().starts_with("app_credit_"));
        assert!(app.documents.is_empty());
    }

    #[test]
    fn test_credit_purpose_too_short() {
        let mut request = credit_request();
        request.purpose = "house".to_string();
        let err = request.validate().unwrap_err();
        assert!(err.0.contains("purpose"));
    }

    #[test]
    fn test_credit_amount_must_be_positive() {
        let mut request = credit_request();
        request.requested_amount = Decimal::ZERO;
        assert_eq!(
            request.validate().unwrap_err().0,
            "requested_amount must be greater than 0"
        );
    }

    #[test]
    fn test_savings_optional_amounts_checked() {
        let request: SavingsApplicationRequest = serde_json::from_value(json!({
            "savings_product_id": "ugb_epargne",
            "initial_deposit": 50000,
            "monthly_contribution": -1,
        }))
        .unwrap();
        assert!(request.validate().unwrap_err().0.contains("monthly_contribution"));
    }

    #[test]
    fn test_insurance_requires_type() {
        let request: InsuranceApplicationRequest = serde_json::from_value(json!({
            "insurance_product_id": "ogar_auto",
            "insurance_type": "  ",
            "vehicle_info": {"plate": "GA-1234"},
        }))
        .unwrap();
        assert_eq!(request.validate().unwrap_err().0, "insurance_type is required");
    }

    #[test]
    fn test_filter_by_status() {
        let filter = ApplicationFilter {
            status: Some(ApplicationStatus::Credit(CreditStatus::Approved)),
            ..ApplicationFilter::default()
        };
        let now = Utc::now();
        let record = ApplicationRecord::Credit(CreditApplication {
            id: CreditApplicationId::new("app_credit_1"),
            user_id: UserId::new("user_1"),
            credit_product_id: "p".to_string(),
            simulation_id: None,
            requested_amount: Decimal::ONE,
            duration_months: 12,
            purpose: "renovation work".to_string(),
            monthly_income: Decimal::ONE,
            current_debts: Decimal::ZERO,
            down_payment: Decimal::ZERO,
            employment_type: None,
            employer_name: None,
            employment_duration_months: None,
            documents: Vec::new(),
            status: CreditStatus::Pending,
            bank_response: None,
            processing_notes: None,
            assigned_to: None,
            user_notified: false,
            last_notification_sent: None,
            submitted_at: now,
            updated_at: now,
        });
        assert!(!filter.matches(&record));
        assert!(ApplicationFilter::default().matches(&record));
        assert_eq!(record.summary().kind, ApplicationKind::Credit);
    }
}
