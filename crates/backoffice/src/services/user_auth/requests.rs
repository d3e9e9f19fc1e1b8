//! End-user request bodies and their validation.
//!
//! Contact fields arrive as plain strings and are parsed here so every
//! rejection carries the same shape of message.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use bamboo_core::{Email, Gender, Metadata, PhoneNumber, RegistrationMethod, UserId};

use super::AuthError;
use crate::models::{Contact, NewUser, ProfileChanges};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const NAME_LEN: (usize, usize) = (2, 100);
pub const CODE_LEN: (usize, usize) = (4, 10);

fn name(field: &str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    let len = value.chars().count();
    let (min, max) = NAME_LEN;
    if len < min || len > max {
        return Err(AuthError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn password(value: &str) -> Result<(), AuthError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn income(value: Option<Decimal>) -> Result<Option<Decimal>, AuthError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(AuthError::Validation(
            "monthly_income must not be negative".to_string(),
        )),
        other => Ok(other),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_email(raw: Option<&str>) -> Result<Option<Email>, AuthError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Email::parse(v).map_err(|e| AuthError::Validation(format!("invalid email: {e}"))))
        .transpose()
}

fn parse_phone(raw: Option<&str>) -> Result<Option<PhoneNumber>, AuthError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            PhoneNumber::parse(v).map_err(|e| AuthError::Validation(format!("invalid phone: {e}")))
        })
        .transpose()
}

/// Resolve an `{email?, phone?}` pair to one contact, email first.
///
/// # Errors
///
/// Returns `AuthError::Validation` if neither is present or the present one
/// does not parse.
pub fn contact(email: Option<&str>, phone: Option<&str>) -> Result<Contact, AuthError> {
    if let Some(email) = parse_email(email)? {
        return Ok(Contact::Email(email));
    }
    if let Some(phone) = parse_phone(phone)? {
        return Ok(Contact::Phone(phone));
    }
    Err(AuthError::Validation(
        "email or phone is required".to_string(),
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub registration_method: RegistrationMethod,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub preferences: Metadata,
}

/// A registration that passed validation; the password is not yet hashed.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub user: NewUser,
    pub password: Option<String>,
}

impl ValidRegistration {
    /// Channel the verification code goes to.
    #[must_use]
    pub fn channel(&self) -> Option<Contact> {
        match self.user.registration_method {
            RegistrationMethod::Email => self.user.email.clone().map(Contact::Email),
            RegistrationMethod::Phone => self.user.phone.clone().map(Contact::Phone),
        }
    }
}

impl RegistrationRequest {
    /// Check the registration rules.
    ///
    /// Registering by email requires an email and a password. Registering by
    /// phone requires a phone; the password is optional.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` naming the first offending field.
    pub fn validate(self) -> Result<ValidRegistration, AuthError> {
        let email = parse_email(self.email.as_deref())?;
        let phone = parse_phone(self.phone.as_deref())?;
        let password_value = self.password.filter(|p| !p.is_empty());

        match self.registration_method {
            RegistrationMethod::Email => {
                if email.is_none() {
                    return Err(AuthError::Validation(
                        "email is required for email registration".to_string(),
                    ));
                }
                if password_value.is_none() {
                    return Err(AuthError::Validation(
                        "password is required for email registration".to_string(),
                    ));
                }
            }
            RegistrationMethod::Phone => {
                if phone.is_none() {
                    return Err(AuthError::Validation(
                        "phone is required for phone registration".to_string(),
                    ));
                }
            }
        }
        if let Some(p) = password_value.as_deref() {
            password(p)?;
        }

        Ok(ValidRegistration {
            user: NewUser {
                id: UserId::generate(),
                email,
                phone,
                first_name: name("first_name", &self.first_name)?,
                last_name: name("last_name", &self.last_name)?,
                date_of_birth: self.date_of_birth,
                gender: self.gender,
                profession: blank_to_none(self.profession),
                monthly_income: income(self.monthly_income)?,
                city: blank_to_none(self.city),
                address: blank_to_none(self.address),
                password_hash: None,
                registration_method: self.registration_method,
                preferences: self.preferences,
            },
            password: password_value,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
    #[serde(default)]
    pub device_info: Metadata,
}

impl LoginRequest {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` when neither channel is present; no
    /// lookup happens in that case.
    pub fn contact(&self) -> Result<Contact, AuthError> {
        if self.password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }
        contact(self.email.as_deref(), self.phone.as_deref())
    }
}

/// `{email?, phone?}` body for resend and reset requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ContactRequest {
    /// # Errors
    ///
    /// See [`contact`].
    pub fn contact(&self) -> Result<Contact, AuthError> {
        contact(self.email.as_deref(), self.phone.as_deref())
    }
}

fn code(value: &str) -> Result<&str, AuthError> {
    let value = value.trim();
    let (min, max) = CODE_LEN;
    if value.len() < min || value.len() > max {
        return Err(AuthError::Validation(format!(
            "code must be between {min} and {max} characters"
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub contact: ContactRequest,
    pub code: String,
}

impl VerifyRequest {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a missing contact or malformed code.
    pub fn validate(&self) -> Result<(Contact, &str), AuthError> {
        Ok((self.contact.contact()?, code(&self.code)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetConfirm {
    #[serde(flatten)]
    pub contact: ContactRequest,
    pub code: String,
    pub new_password: String,
}

impl PasswordResetConfirm {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a missing contact, malformed code
    /// or short password.
    pub fn validate(&self) -> Result<(Contact, &str), AuthError> {
        password(&self.new_password)?;
        Ok((self.contact.contact()?, code(&self.code)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the new password is too short.
    pub fn validate(&self) -> Result<(), AuthError> {
        password(&self.new_password)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdateRequest {
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

impl ProfileUpdateRequest {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for out-of-range names or income.
    pub fn validate(self) -> Result<ProfileChanges, AuthError> {
        Ok(ProfileChanges {
            first_name: self
                .first_name
                .as_deref()
                .map(|v| name("first_name", v))
                .transpose()?,
            last_name: self
                .last_name
                .as_deref()
                .map(|v| name("last_name", v))
                .transpose()?,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            profession: blank_to_none(self.profession),
            monthly_income: income(self.monthly_income)?,
            city: blank_to_none(self.city),
            address: blank_to_none(self.address),
            preferences: self.preferences,
        })
    }
}

/// Body of `POST /api/users/me/contact`: one new channel plus the current
/// password as confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct AddContactRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

impl AddContactRequest {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` unless exactly one channel is given
    /// and it parses.
    pub fn contact(&self) -> Result<Contact, AuthError> {
        let email = parse_email(self.email.as_deref())?;
        let phone = parse_phone(self.phone.as_deref())?;
        match (email, phone) {
            (Some(email), None) => Ok(Contact::Email(email)),
            (None, Some(phone)) => Ok(Contact::Phone(phone)),
            (Some(_), Some(_)) => Err(AuthError::Validation(
                "add one contact at a time".to_string(),
            )),
            (None, None) => Err(AuthError::Validation(
                "email or phone is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkReadRequest {
    pub notification_ids: Vec<bamboo_core::NotificationId>,
}
