//! Contact normalization, password policy, and password hashing helpers.

use anyhow::{anyhow, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use regex::Regex;

use crate::otp::Channel;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Normalize a phone number: strip formatting, keep digits and at most one
/// leading `+`. `"+1 (555) 000-1111"` becomes `"+15550001111"`.
pub(super) fn normalize_phone(phone: &str) -> String {
    let mut out = String::with_capacity(phone.len());
    for (index, ch) in phone.trim().chars().enumerate() {
        if ch.is_ascii_digit() || (ch == '+' && index == 0) {
            out.push(ch);
        }
    }
    out
}

/// E.164-ish shape check on already-normalized input.
pub(super) fn valid_phone(phone_normalized: &str) -> bool {
    Regex::new(r"^\+?[0-9]{7,15}$").is_ok_and(|regex| regex.is_match(phone_normalized))
}

/// Normalize a raw contact and decide which channel it belongs to.
///
/// Anything containing `@` is treated as an email; everything else as a
/// phone number. Returns the normalized contact alongside the channel, or
/// `None` when the input fits neither shape.
pub(super) fn normalize_contact(raw: &str) -> Option<(String, Channel)> {
    if raw.contains('@') {
        let email = normalize_email(raw);
        valid_email(&email).then_some((email, Channel::Email))
    } else {
        let phone = normalize_phone(raw);
        valid_phone(&phone).then_some((phone, Channel::Phone))
    }
}

/// Password policy: 8 to 72 characters, no spaces, at least one lowercase
/// letter, one uppercase letter, and one digit.
pub(super) fn valid_password(password: &str) -> bool {
    let length = password.chars().count();
    if !(8..=72).contains(&length) || password.contains(' ') {
        return false;
    }
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Hash a password for storage using Argon2id with a random salt.
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a password against a stored Argon2 hash.
pub(super) fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Pull the bearer token out of an Authorization header value.
pub(super) fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn normalize_phone_strips_formatting() {
        assert_eq!(normalize_phone("+1 (555) 000-1111"), "+15550001111");
        assert_eq!(normalize_phone("555 000 1111"), "5550001111");
    }

    #[test]
    fn normalize_phone_keeps_only_leading_plus() {
        assert_eq!(normalize_phone("+15+55"), "+1555");
        assert_eq!(normalize_phone("15+55"), "1555");
    }

    #[test]
    fn valid_phone_bounds_length() {
        assert!(valid_phone("+15550001111"));
        assert!(valid_phone("5550001"));
        assert!(!valid_phone("123456"));
        assert!(!valid_phone("+1234567890123456"));
        assert!(!valid_phone("+"));
    }

    #[test]
    fn normalize_contact_classifies_by_shape() {
        assert_eq!(
            normalize_contact(" Alice@Example.COM "),
            Some(("alice@example.com".to_string(), Channel::Email))
        );
        assert_eq!(
            normalize_contact("+1 (555) 000-1111"),
            Some(("+15550001111".to_string(), Channel::Phone))
        );
        assert_eq!(normalize_contact("not a contact"), None);
        assert_eq!(normalize_contact("@"), None);
    }

    #[test]
    fn valid_password_enforces_policy() {
        assert!(valid_password("Sup3rSecret"));
        assert!(!valid_password("short1A"));
        assert!(!valid_password("has space1A"));
        assert!(!valid_password("nouppercase1"));
        assert!(!valid_password("NOLOWERCASE1"));
        assert!(!valid_password("NoDigitsHere"));
        let too_long = format!("A1{}", "a".repeat(71));
        assert!(!valid_password(&too_long));
    }

    #[test]
    fn hash_and_verify_password_round_trip() -> Result<()> {
        let hash = hash_password("Sup3rSecret")?;
        assert!(verify_password("Sup3rSecret", &hash)?);
        assert!(!verify_password("WrongPass1", &hash)?);
        Ok(())
    }

    #[test]
    fn verify_password_rejects_malformed_hash() {
        assert!(verify_password("Sup3rSecret", "not-a-phc-string").is_err());
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
