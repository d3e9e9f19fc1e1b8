//! Integration tests for contact normalization (phone numbers and emails).

#![allow(clippy::unwrap_used)]

use bamboo_core::{Email, PhoneError, PhoneNumber, normalize_phone};

#[test]
fn test_phone_normalization_is_idempotent() {
    for raw in [
        "06 12 34 56",
        "061234567",
        "24106123456",
        "+241 06-12-34-56",
        "(0) 74.12.34.56",
        "7412",
        "0",
        "+",
        "",
        "   ",
        "abc",
    ] {
        let once = normalize_phone(raw);
        assert_eq!(normalize_phone(&once), once, "{raw:?}");
    }
}

#[test]
fn test_local_spellings_share_one_canonical_form() {
    let canonical = PhoneNumber::parse("06 12 34 56").unwrap();
    assert_eq!(canonical.as_str(), "+2416123456");
    assert_eq!(PhoneNumber::parse("6123456").unwrap(), canonical);
    assert_eq!(PhoneNumber::parse("2416123456").unwrap(), canonical);
    assert_eq!(PhoneNumber::parse("+241 612-34-56").unwrap(), canonical);
}

#[test]
fn test_implausible_phone_numbers_are_rejected() {
    assert_eq!(PhoneNumber::parse(" - "), Err(PhoneError::Empty));
    assert_eq!(
        PhoneNumber::parse("06 12 AB"),
        Err(PhoneError::InvalidCharacters)
    );
    assert!(matches!(
        PhoneNumber::parse("0612"),
        Err(PhoneError::InvalidLength { .. })
    ));
}

#[test]
fn test_email_lookups_are_case_insensitive() {
    let email: Email = "  Awa.Ndong@Example.GA ".parse().unwrap();
    assert_eq!(email.as_str(), "awa.ndong@example.ga");
    assert_eq!(email.domain(), "example.ga");
}
