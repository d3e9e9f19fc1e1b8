//! Integration tests for application status sets and submissions.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use serde_json::json;

use bamboo_backoffice::models::NewApplication;
use bamboo_backoffice::models::application::{
    CreditApplicationRequest, InsuranceApplicationRequest, SavingsApplicationRequest,
};
use bamboo_backoffice::services::applications::StatusUpdateRequest;
use bamboo_core::{
    ApplicationKind, ApplicationStatus, CreditStatus, InsuranceStatus, SavingsStatus,
};

// =============================================================================
// Status sets
// =============================================================================

#[test]
fn test_every_kind_starts_pending() {
    for &kind in ApplicationKind::ALL {
        let initial = ApplicationStatus::initial(kind);
        assert_eq!(initial.kind(), kind);
        assert_eq!(initial.as_str(), "pending");
    }
}

#[test]
fn test_status_sets_are_kind_specific() {
    assert!(ApplicationStatus::parse(ApplicationKind::Credit, "completed").is_ok());
    assert!(ApplicationStatus::parse(ApplicationKind::Savings, "completed").is_err());

    assert!(ApplicationStatus::parse(ApplicationKind::Savings, "opened").is_ok());
    assert!(ApplicationStatus::parse(ApplicationKind::Insurance, "opened").is_err());

    assert!(ApplicationStatus::parse(ApplicationKind::Insurance, "medical_exam_required").is_ok());
    assert!(ApplicationStatus::parse(ApplicationKind::Credit, "medical_exam_required").is_err());
}

#[test]
fn test_nominal_flows() {
    assert!(CreditStatus::OnHold.is_nominal_transition(CreditStatus::UnderReview));
    assert!(!CreditStatus::Completed.is_nominal_transition(CreditStatus::Pending));
    assert!(CreditStatus::Rejected.is_nominal_transition(CreditStatus::Completed));
    assert!(!CreditStatus::OnHold.is_nominal_transition(CreditStatus::Approved));
    assert!(SavingsStatus::Approved.is_nominal_transition(SavingsStatus::Opened));
    assert!(!SavingsStatus::Pending.is_nominal_transition(SavingsStatus::Active));
    assert!(InsuranceStatus::MedicalExamRequired.is_nominal_transition(InsuranceStatus::Approved));

    // Statuses of different kinds never chain
    let credit = ApplicationStatus::Credit(CreditStatus::Pending);
    let savings = ApplicationStatus::Savings(SavingsStatus::UnderReview);
    assert!(!credit.is_nominal_transition(savings));
}

#[test]
fn test_status_update_resolves_against_kind() {
    let request = StatusUpdateRequest {
        status: " approved ".to_string(),
        processing_notes: Some("   ".to_string()),
        ..StatusUpdateRequest::default()
    };
    let change = request.into_change(ApplicationKind::Insurance).unwrap();
    assert_eq!(
        change.status,
        ApplicationStatus::Insurance(InsuranceStatus::Approved)
    );
    assert_eq!(change.processing_notes, None);

    let off_set = StatusUpdateRequest {
        status: "on_hold".to_string(),
        ..StatusUpdateRequest::default()
    };
    assert!(off_set.into_change(ApplicationKind::Savings).is_err());
}

// =============================================================================
// Submissions
// =============================================================================

#[test]
fn test_credit_submission_validation() {
    let request: CreditApplicationRequest = serde_json::from_value(json!({
        "credit_product_id": "bgfi_auto",
        "requested_amount": "8500000",
        "duration_months": 48,
        "purpose": "Used vehicle for commuting",
        "monthly_income": 650000,
        "employment_type": "  ",
    }))
    .unwrap();
    let NewApplication::Credit(credit) = request.validate().unwrap() else {
        panic!("expected a credit application");
    };
    assert_eq!(credit.employment_type, None);
    assert_eq!(credit.current_debts, Decimal::ZERO);

    let short_purpose: CreditApplicationRequest = serde_json::from_value(json!({
        "credit_product_id": "bgfi_auto",
        "requested_amount": "8500000",
        "duration_months": 48,
        "purpose": "car",
        "monthly_income": 650000,
    }))
    .unwrap();
    let err = short_purpose.validate().unwrap_err();
    assert!(err.to_string().contains("purpose"));
}

#[test]
fn test_savings_submission_requires_positive_deposit() {
    let request: SavingsApplicationRequest = serde_json::from_value(json!({
        "savings_product_id": "uba_epargne",
        "initial_deposit": 0,
    }))
    .unwrap();
    assert_eq!(
        request.validate().unwrap_err().to_string(),
        "initial_deposit must be greater than 0"
    );
}

#[test]
fn test_insurance_submission_requires_type() {
    let request: InsuranceApplicationRequest = serde_json::from_value(json!({
        "insurance_product_id": "ogar_auto",
        "insurance_type": "",
    }))
    .unwrap();
    assert_eq!(
        request.validate().unwrap_err().to_string(),
        "insurance_type is required"
    );
}
