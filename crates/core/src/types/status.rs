//! Status enums for applications, notifications and end-user accounts.
//!
//! Application statuses are closed sets: the database enum types reject
//! anything outside them. No ordering between statuses is enforced; any
//! member of the set may be written at any time. The `nominal_next` tables
//! describe the usual processing flow and are only used for diagnostics.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a member of a closed set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    /// What was being parsed (e.g. "credit application status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Defines a closed string enum with `ALL`, `as_str`, `Display` and `FromStr`.
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $pg:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(type_name = $pg, rename_all = "snake_case"))]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every member of the set, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire/database spelling of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(StatusParseError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

closed_set! {
    /// Credit application status.
    ///
    /// Nominal flow: `pending → under_review → {approved | rejected | on_hold} → completed`,
    /// with `on_hold` able to return to `under_review`.
    CreditStatus, "credit application status", "backoffice.credit_application_status" {
        Pending => "pending",
        UnderReview => "under_review",
        Approved => "approved",
        Rejected => "rejected",
        OnHold => "on_hold",
        Completed => "completed",
    }
}

closed_set! {
    /// Savings account application status.
    ///
    /// Nominal flow: `pending → under_review → {approved | rejected}`, then
    /// `approved → opened → active`.
    SavingsStatus, "savings application status", "backoffice.savings_application_status" {
        Pending => "pending",
        UnderReview => "under_review",
        Approved => "approved",
        Rejected => "rejected",
        Opened => "opened",
        Active => "active",
    }
}

closed_set! {
    /// Insurance application status.
    ///
    /// Nominal flow: `pending → under_review`, then either a medical exam
    /// (`medical_exam_required → approved | rejected`) or a direct decision,
    /// then `approved → active`.
    InsuranceStatus, "insurance application status", "backoffice.insurance_application_status" {
        Pending => "pending",
        UnderReview => "under_review",
        MedicalExamRequired => "medical_exam_required",
        Approved => "approved",
        Rejected => "rejected",
        Active => "active",
    }
}

closed_set! {
    /// Priority of an in-app notification.
    NotificationPriority, "notification priority", "backoffice.notification_priority" {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

closed_set! {
    /// Channel an end user registered with. Determines which contact field is
    /// mandatory and whether a password is required.
    RegistrationMethod, "registration method", "backoffice.registration_method" {
        Email => "email",
        Phone => "phone",
    }
}

closed_set! {
    /// Self-declared gender on an end-user profile.
    Gender, "gender", "backoffice.gender" {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

impl Default for NotificationPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// The three kinds of product application an end user can submit.
///
/// Not stored: each kind lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    Credit,
    Savings,
    Insurance,
}

impl std::fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationKind {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "savings" => Ok(Self::Savings),
            "insurance" => Ok(Self::Insurance),
            _ => Err(StatusParseError {
                kind: "application kind",
                value: s.to_owned(),
            }),
        }
    }
}

impl ApplicationKind {
    pub const ALL: &'static [Self] = &[Self::Credit, Self::Savings, Self::Insurance];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Savings => "savings",
            Self::Insurance => "insurance",
        }
    }

    /// Entity type recorded in the audit log and on notifications.
    #[must_use]
    pub const fn entity_type(self) -> &'static str {
        match self {
            Self::Credit => "credit_application",
            Self::Savings => "savings_application",
            Self::Insurance => "insurance_application",
        }
    }

    /// Human label used in notification titles.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Savings => "savings account",
            Self::Insurance => "insurance",
        }
    }
}

impl CreditStatus {
    /// Statuses that usually follow this one.
    #[must_use]
    pub const fn nominal_next(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::UnderReview],
            Self::UnderReview => &[Self::Approved, Self::Rejected, Self::OnHold],
            Self::OnHold => &[Self::UnderReview, Self::Completed],
            Self::Approved | Self::Rejected => &[Self::Completed],
            Self::Completed => &[],
        }
    }

    /// Whether `self → to` follows the nominal flow.
    #[must_use]
    pub fn is_nominal_transition(self, to: Self) -> bool {
        self.nominal_next().contains(&to)
    }
}

impl SavingsStatus {
    /// Statuses that usually follow this one.
    #[must_use]
    pub const fn nominal_next(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::UnderReview],
            Self::UnderReview => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Opened],
            Self::Opened => &[Self::Active],
            Self::Rejected | Self::Active => &[],
        }
    }

    /// Whether `self → to` follows the nominal flow.
    #[must_use]
    pub fn is_nominal_transition(self, to: Self) -> bool {
        self.nominal_next().contains(&to)
    }
}

impl InsuranceStatus {
    /// Statuses that usually follow this one.
    #[must_use]
    pub const fn nominal_next(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::UnderReview],
            Self::UnderReview => &[Self::MedicalExamRequired, Self::Approved, Self::Rejected],
            Self::MedicalExamRequired => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Active],
            Self::Rejected | Self::Active => &[],
        }
    }

    /// Whether `self → to` follows the nominal flow.
    #[must_use]
    pub fn is_nominal_transition(self, to: Self) -> bool {
        self.nominal_next().contains(&to)
    }
}

/// A status of any application kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ApplicationStatus {
    Credit(CreditStatus),
    Savings(SavingsStatus),
    Insurance(InsuranceStatus),
}

impl ApplicationStatus {
    /// Parse `value` against the status set of `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`StatusParseError`] when `value` is not in that kind's set.
    pub fn parse(kind: ApplicationKind, value: &str) -> Result<Self, StatusParseError> {
        Ok(match kind {
            ApplicationKind::Credit => Self::Credit(value.parse()?),
            ApplicationKind::Savings => Self::Savings(value.parse()?),
            ApplicationKind::Insurance => Self::Insurance(value.parse()?),
        })
    }

    /// Status every new application starts with.
    #[must_use]
    pub const fn initial(kind: ApplicationKind) -> Self {
        match kind {
            ApplicationKind::Credit => Self::Credit(CreditStatus::Pending),
            ApplicationKind::Savings => Self::Savings(SavingsStatus::Pending),
            ApplicationKind::Insurance => Self::Insurance(InsuranceStatus::Pending),
        }
    }

    #[must_use]
    pub const fn kind(self) -> ApplicationKind {
        match self {
            Self::Credit(_) => ApplicationKind::Credit,
            Self::Savings(_) => ApplicationKind::Savings,
            Self::Insurance(_) => ApplicationKind::Insurance,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit(status) => status.as_str(),
            Self::Savings(status) => status.as_str(),
            Self::Insurance(status) => status.as_str(),
        }
    }

    /// Whether `self → to` follows the nominal flow. Statuses of different
    /// kinds are never a nominal transition.
    #[must_use]
    pub fn is_nominal_transition(self, to: Self) -> bool {
        match (self, to) {
            (Self::Credit(from), Self::Credit(to)) => from.is_nominal_transition(to),
            (Self::Savings(from), Self::Savings(to)) => from.is_nominal_transition(to),
            (Self::Insurance(from), Self::Insurance(to)) => from.is_nominal_transition(to),
            _ => false,
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for status in CreditStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        for status in InsuranceStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_from_str_rejects_foreign_members() {
        // "opened" belongs to savings only
        assert!("opened".parse::<SavingsStatus>().is_ok());
        let err = "opened".parse::<CreditStatus>().unwrap_err();
        assert_eq!(err.kind, "credit application status");
        assert_eq!(err.value, "opened");
        assert!("medical_exam_required".parse::<CreditStatus>().is_err());
        assert!("PENDING".parse::<CreditStatus>().is_err());
    }

    #[test]
    fn test_set_sizes() {
        assert_eq!(CreditStatus::ALL.len(), 6);
        assert_eq!(SavingsStatus::ALL.len(), 6);
        assert_eq!(InsuranceStatus::ALL.len(), 6);
    }

    #[test]
    fn test_nominal_flow_credit() {
        assert!(CreditStatus::Pending.is_nominal_transition(CreditStatus::UnderReview));
        assert!(CreditStatus::OnHold.is_nominal_transition(CreditStatus::UnderReview));
        assert!(CreditStatus::Approved.is_nominal_transition(CreditStatus::Completed));
        assert!(!CreditStatus::Pending.is_nominal_transition(CreditStatus::Completed));
    }

    #[test]
    fn test_nominal_flow_credit_closing() {
        assert!(CreditStatus::Rejected.is_nominal_transition(CreditStatus::Completed));
        assert!(CreditStatus::OnHold.is_nominal_transition(CreditStatus::Completed));
        assert!(!CreditStatus::OnHold.is_nominal_transition(CreditStatus::Approved));
        assert!(!CreditStatus::OnHold.is_nominal_transition(CreditStatus::Rejected));
        assert!(CreditStatus::Completed.nominal_next().is_empty());
    }

    #[test]
    fn test_nominal_flow_insurance_exam_branch() {
        let exam = InsuranceStatus::MedicalExamRequired;
        assert!(InsuranceStatus::UnderReview.is_nominal_transition(exam));
        assert!(exam.is_nominal_transition(InsuranceStatus::Approved));
        assert!(!exam.is_nominal_transition(InsuranceStatus::Active));
    }

    #[test]
    fn test_nominal_flow_savings_opening() {
        assert!(SavingsStatus::Approved.is_nominal_transition(SavingsStatus::Opened));
        assert!(SavingsStatus::Opened.is_nominal_transition(SavingsStatus::Active));
        assert!(SavingsStatus::Active.nominal_next().is_empty());
    }

    #[test]
    fn test_application_kind_entity_type() {
        assert_eq!(ApplicationKind::Credit.entity_type(), "credit_application");
        assert_eq!("savings".parse::<ApplicationKind>().unwrap(), ApplicationKind::Savings);
    }

    #[test]
    fn test_application_status_parse_per_kind() {
        let status = ApplicationStatus::parse(ApplicationKind::Insurance, "medical_exam_required")
            .unwrap();
        assert_eq!(status.kind(), ApplicationKind::Insurance);
        assert!(ApplicationStatus::parse(ApplicationKind::Credit, "medical_exam_required").is_err());
        assert!(ApplicationStatus::parse(ApplicationKind::Savings, "approved").is_ok());
    }

    #[test]
    fn test_application_status_initial_is_pending() {
        for kind in ApplicationKind::ALL {
            assert_eq!(ApplicationStatus::initial(*kind).as_str(), "pending");
        }
    }

    #[test]
    fn test_pending_to_completed_is_off_flow_but_representable() {
        let from = ApplicationStatus::initial(ApplicationKind::Credit);
        let to = ApplicationStatus::parse(ApplicationKind::Credit, "completed").unwrap();
        assert!(!from.is_nominal_transition(to));
    }

    #[test]
    fn test_notification_priority_default() {
        assert_eq!(NotificationPriority::default(), NotificationPriority::Normal);
    }
}
