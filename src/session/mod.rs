//! Stateless session credentials.
//!
//! After a successful authentication the server mints an HS256 JWT carrying
//! the subject id and a few display claims. Nothing is stored server-side;
//! verification is a pure function of the token and the shared secret, with
//! its own expiry independent of any verification code.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionClaims {
    /// Subject: the user's UUID as a string.
    pub sub: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Identity snapshot embedded in a freshly minted token. The consuming side
/// must still map `sub` to a current user row — the row may be gone.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

pub struct SessionSigner {
    secret: SecretString,
    ttl_seconds: i64,
}

impl SessionSigner {
    #[must_use]
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Self {
        Self {
            secret,
            ttl_seconds,
        }
    }

    /// Mint a signed, time-bound credential for the identity.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue(&self, identity: &SessionIdentity) -> Result<String> {
        let now = now_unix_seconds();
        let claims = SessionClaims {
            sub: identity.user_id.to_string(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            name: identity.name.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .context("failed to sign session token")
    }

    /// Decode and validate a credential: signature and expiry.
    ///
    /// # Errors
    /// Returns an error for a malformed, tampered, or expired token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .context("invalid session token")?;
        Ok(data.claims)
    }
}

pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
