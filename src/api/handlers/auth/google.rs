//! Google ID token verification against the tokeninfo endpoint.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const VERIFY_TIMEOUT_SECONDS: u64 = 10;

/// Claims returned by tokeninfo. All values come back as strings,
/// including booleans.
#[derive(Deserialize, Debug)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

/// A verified Google identity, ready for account lookup.
#[derive(Debug)]
pub(super) struct GoogleIdentity {
    pub(super) sub: String,
    pub(super) email: String,
    pub(super) name: Option<String>,
}

pub struct GoogleVerifier {
    client: Client,
    client_id: String,
}

impl GoogleVerifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(client_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(VERIFY_TIMEOUT_SECONDS))
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build google verifier HTTP client")?;
        Ok(Self { client, client_id })
    }

    /// Validate an ID token and extract the identity.
    ///
    /// Google checks the signature and expiry; we check the audience and
    /// require a verified email so accounts cannot be claimed through an
    /// unverified address.
    ///
    /// # Errors
    /// Returns an error for network failures, rejected tokens, audience
    /// mismatch, or missing/unverified email.
    pub(super) async fn verify(&self, id_token: &str) -> Result<GoogleIdentity> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .context("tokeninfo request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("tokeninfo rejected token: {status}"));
        }

        let info: TokenInfo = response
            .json()
            .await
            .context("failed to decode tokeninfo response")?;

        if info.aud != self.client_id {
            return Err(anyhow!("token audience mismatch"));
        }
        if info.email_verified.as_deref() != Some("true") {
            return Err(anyhow!("google email not verified"));
        }
        let email = info
            .email
            .filter(|email| !email.is_empty())
            .context("tokeninfo response missing email")?;

        Ok(GoogleIdentity {
            sub: info.sub,
            email: email.trim().to_lowercase(),
            name: info.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn tokeninfo_booleans_arrive_as_strings() -> Result<()> {
        let info: TokenInfo = serde_json::from_str(
            r#"{"aud":"client-id","sub":"12345","email":"Alice@Example.com","email_verified":"true","name":"Alice"}"#,
        )?;
        assert_eq!(info.aud, "client-id");
        assert_eq!(info.email_verified.as_deref(), Some("true"));
        Ok(())
    }

    #[test]
    fn tokeninfo_tolerates_missing_optional_claims() -> Result<()> {
        let info: TokenInfo = serde_json::from_str(r#"{"aud":"client-id","sub":"12345"}"#)?;
        assert_eq!(info.email, None);
        assert_eq!(info.email_verified, None);
        assert_eq!(info.name, None);
        Ok(())
    }
}
