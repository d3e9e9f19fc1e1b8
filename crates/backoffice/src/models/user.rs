//! End-user account types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bamboo_core::{Email, Gender, Metadata, PhoneNumber, RegistrationMethod, UserId};

/// An end user (domain type). Serializes to the public profile shape.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profession: Option<String>,
    pub monthly_income: Option<Decimal>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub registration_method: RegistrationMethod,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub preferences: Metadata,
}

/// Which contact channel a lookup or verification targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Email(Email),
    Phone(PhoneNumber),
}

impl Contact {
    #[must_use]
    pub const fn method(&self) -> RegistrationMethod {
        match self {
            Self::Email(_) => RegistrationMethod::Email,
            Self::Phone(_) => RegistrationMethod::Phone,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(email) => email.as_str(),
            Self::Phone(phone) => phone.as_str(),
        }
    }
}

/// A validated registration ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub email: Option<Email>,
    pub phone: Option<PhoneNumber>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profession: Option<String>,
    pub monthly_income: Option<Decimal>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub password_hash: Option<String>,
    pub registration_method: RegistrationMethod,
    pub preferences: Metadata,
}

/// Profile fields an end user may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profession: Option<String>,
    pub monthly_income: Option<Decimal>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub preferences: Option<Metadata>,
}

/// A one-time code stored on the user row, bound to the channel it was
/// sent on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub code: String,
    pub channel: RegistrationMethod,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    /// Whether `candidate` matches, arrives on the issuing channel and the
    /// code has not expired.
    #[must_use]
    pub fn accepts(&self, contact: &Contact, candidate: &str, now: DateTime<Utc>) -> bool {
        contact.method() == self.channel && now < self.expires_at && self.code == candidate.trim()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn email() -> Contact {
        Contact::Email(Email::parse("awa@example.ga").unwrap())
    }

    #[test]
    fn test_verification_code_accepts_until_expiry() {
        let now = Utc::now();
        let code = VerificationCode {
            code: "482913".to_string(),
            channel: RegistrationMethod::Email,
            expires_at: now + Duration::minutes(15),
        };
        assert!(code.accepts(&email(), "482913", now));
        assert!(code.accepts(&email(), " 482913 ", now));
        assert!(!code.accepts(&email(), "482914", now));
        assert!(!code.accepts(&email(), "482913", now + Duration::minutes(15)));
    }

    #[test]
    fn test_verification_code_rejects_other_channel() {
        let now = Utc::now();
        let code = VerificationCode {
            code: "482913".to_string(),
            channel: RegistrationMethod::Email,
            expires_at: now + Duration::minutes(15),
        };
        let phone = Contact::Phone(PhoneNumber::parse("06 12 34 56").unwrap());
        assert!(!code.accepts(&phone, "482913", now));
    }
}
