//! Phone numbers in Gabonese international form.
//!
//! End users register and log in with local numbers written in many ways
//! (`06 12 34 56`, `6123456`, `+241 612 34 56`). Every number is stored and
//! looked up in one canonical `+241…` form.
//!
//! Only the national trunk `0` of a bare local number is dropped. A `0` kept
//! after the country code survives, so `06 12 34 56` and `+241 06 12 34 56`
//! normalize to different strings and can belong to two different accounts.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Country calling code every stored number starts with.
pub const COUNTRY_PREFIX: &str = "+241";

/// Normalize a phone number to the canonical `+241…` form.
///
/// Whitespace, dashes, dots and parentheses are removed, then:
/// - `+241…` is kept as is
/// - `241…` gains a leading `+`
/// - a leading national `0` is replaced by `+241`
/// - anything else is prefixed with `+241`
///
/// Empty input (after stripping) stays empty. The function is idempotent:
/// the output contains no separators and always starts with `+241`, so a
/// second pass changes nothing.
///
/// ```
/// use bamboo_core::normalize_phone;
///
/// assert_eq!(normalize_phone("06 12 34 56"), "+2416123456");
/// assert_eq!(normalize_phone("24106123456"), "+24106123456");
/// assert_eq!(normalize_phone("+241 06-12-34-56"), "+24106123456");
/// assert_eq!(normalize_phone(&normalize_phone("0612")), normalize_phone("0612"));
/// ```
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')'))
        .collect();

    if compact.is_empty() || compact.starts_with(COUNTRY_PREFIX) {
        return compact;
    }

    if let Some(rest) = compact.strip_prefix("241") {
        return format!("{COUNTRY_PREFIX}{rest}");
    }

    if let Some(rest) = compact.strip_prefix('0') {
        return format!("{COUNTRY_PREFIX}{rest}");
    }

    format!("{COUNTRY_PREFIX}{compact}")
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Nothing left after removing separators.
    #[error("phone number cannot be empty")]
    Empty,
    /// Something other than digits follows the country prefix.
    #[error("phone number may only contain digits after the country code")]
    InvalidCharacters,
    /// The subscriber part is too short or too long.
    #[error("phone number must have between {min} and {max} digits after the country code")]
    InvalidLength {
        /// Minimum subscriber digits.
        min: usize,
        /// Maximum subscriber digits.
        max: usize,
    },
}

/// A validated phone number in canonical `+241…` form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum digits after the country code.
    pub const MIN_DIGITS: usize = 6;
    /// Maximum digits after the country code.
    pub const MAX_DIGITS: usize = 10;

    /// Normalize and validate a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] if the normalized number is empty, contains
    /// non-digits after `+241`, or has an implausible length.
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let normalized = normalize_phone(raw);
        let subscriber = normalized
            .strip_prefix(COUNTRY_PREFIX)
            .ok_or(PhoneError::Empty)?;

        if !subscriber.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacters);
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&subscriber.len()) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the canonical number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the number and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhoneNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhoneNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhoneNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "0",
        "06123456",
        "06 12 34 56",
        "6123456",
        "241",
        "2416123456",
        "+241",
        "+2416123456",
        "+241 06.12.34.56",
        "(+241) 06-12-34-56",
        "+33612345678",
        "0241",
        "00241",
        "abc",
        "+",
        "+241+241",
    ];

    #[test]
    fn test_normalize_rules() {
        assert_eq!(normalize_phone("06123456"), "+2416123456");
        assert_eq!(normalize_phone("6123456"), "+2416123456");
        assert_eq!(normalize_phone("2416123456"), "+2416123456");
        assert_eq!(normalize_phone("+2416123456"), "+2416123456");
        assert_eq!(normalize_phone("  "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize_phone(sample);
            assert_eq!(normalize_phone(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn test_normalized_output_is_empty_or_prefixed() {
        for sample in SAMPLES {
            let out = normalize_phone(sample);
            assert!(out.is_empty() || out.starts_with(COUNTRY_PREFIX), "input: {sample:?}");
        }
    }

    #[test]
    fn test_parse_valid() {
        let phone = PhoneNumber::parse("06 12 34 56").unwrap();
        assert_eq!(phone.as_str(), "+2416123456");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PhoneNumber::parse(" - "), Err(PhoneError::Empty));
        assert_eq!(PhoneNumber::parse("06-ab-34"), Err(PhoneError::InvalidCharacters));
        assert!(matches!(
            PhoneNumber::parse("0612"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_trunk_zero_after_country_code_is_kept() {
        let local = PhoneNumber::parse("06 12 34 56").unwrap();
        let international = PhoneNumber::parse("+241 06 12 34 56").unwrap();
        assert_eq!(local.as_str(), "+2416123456");
        assert_eq!(international.as_str(), "+24106123456");
        assert_ne!(local, international);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let phone: PhoneNumber = serde_json::from_str("\"241 06 12 34 56\"").unwrap();
        assert_eq!(phone.as_str(), "+24106123456");
    }
}
