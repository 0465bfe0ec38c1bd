//! The issuance/verification state machine.

use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};

use super::code::{code_matches, generate_code, generate_salt, hash_code};
use super::models::{Channel, Purpose};
use super::repo;

/// Result of issuing a code. The plaintext leaves this module only toward
/// the delivery collaborator, or the response when debug echo is enabled.
#[derive(Debug)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at_unix: i64,
}

/// Why a verification attempt was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No row for the pair. Indistinguishable from a long-gone expired one
    /// so callers cannot probe which contacts hold active codes.
    NotFoundOrExpired,
    /// The row existed but its expiry had passed; it was removed.
    Expired,
    /// Hash mismatch; attempts were bumped and the row survives.
    InvalidCode,
    /// Hash mismatch that hit the attempt limit; the row was removed.
    TooManyAttempts,
}

impl DenyReason {
    /// Stable reason code for response bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFoundOrExpired => "not_found_or_expired",
            Self::Expired => "expired",
            Self::InvalidCode => "invalid_code",
            Self::TooManyAttempts => "too_many_attempts",
        }
    }
}

/// Outcome of a verification attempt.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// The code matched; the row was deleted and its payload handed back.
    Verified { payload_json: Option<String> },
    Denied(DenyReason),
}

/// Issue (or re-issue) a code for `(purpose, contact)`.
///
/// The upsert makes the previous code for the pair unusable and resets the
/// attempt counter. The database write is authoritative: delivery happens
/// after and its failure does not undo issuance.
///
/// # Errors
/// Returns an error if salt generation or the database write fails.
pub async fn issue(
    pool: &PgPool,
    purpose: Purpose,
    contact: &str,
    channel: Channel,
    payload_json: Option<&str>,
    ttl_seconds: i64,
) -> Result<IssuedCode> {
    let code = generate_code();
    let salt = generate_salt()?;
    let code_hash = hash_code(&code, &salt);

    let expires_at_unix = repo::upsert_request(
        pool,
        purpose,
        contact,
        channel,
        &code_hash,
        &salt,
        payload_json,
        ttl_seconds,
    )
    .await?;

    Ok(IssuedCode {
        code,
        expires_at_unix,
    })
}

/// Run one verification attempt inside the caller's transaction.
///
/// The row lock taken here serializes concurrent attempts for the same
/// pair: two simultaneous wrong codes bump attempts by exactly two, and a
/// success cannot overlap a limit-exceeded deletion.
///
/// The caller must COMMIT the transaction on every `Denied` outcome — the
/// attempt bump or deletion has to stick even though the request failed.
/// On `Verified` the row deletion is part of the transaction, so
/// purpose-specific finalization (creating the user, updating a password)
/// can run before the same commit and roll everything back on failure.
///
/// # Errors
/// Returns an error on database failure; domain denials are `Ok(Denied)`.
pub async fn verify_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    purpose: Purpose,
    contact: &str,
    submitted_code: &str,
    max_attempts: i32,
) -> Result<VerifyOutcome> {
    let Some(row) = repo::lock_request(tx, purpose, contact).await? else {
        return Ok(VerifyOutcome::Denied(DenyReason::NotFoundOrExpired));
    };

    if row.expired {
        repo::delete_request(tx, row.id).await?;
        return Ok(VerifyOutcome::Denied(DenyReason::Expired));
    }

    if !code_matches(submitted_code, &row.code_salt, &row.code_hash) {
        let attempts = row.attempts + 1;
        if attempts >= max_attempts {
            repo::delete_request(tx, row.id).await?;
            return Ok(VerifyOutcome::Denied(DenyReason::TooManyAttempts));
        }
        repo::set_attempts(tx, row.id, attempts).await?;
        return Ok(VerifyOutcome::Denied(DenyReason::InvalidCode));
    }

    // Single use: a matching code always consumes the row.
    repo::delete_request(tx, row.id).await?;
    Ok(VerifyOutcome::Verified {
        payload_json: row.payload_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_reasons_have_stable_codes() {
        assert_eq!(
            DenyReason::NotFoundOrExpired.as_str(),
            "not_found_or_expired"
        );
        assert_eq!(DenyReason::Expired.as_str(), "expired");
        assert_eq!(DenyReason::InvalidCode.as_str(), "invalid_code");
        assert_eq!(DenyReason::TooManyAttempts.as_str(), "too_many_attempts");
    }
}
