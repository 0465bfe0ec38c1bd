//! Out-of-band code delivery.
//!
//! Delivery providers are external collaborators: they accept a destination
//! and a rendered message and either succeed or fail. SMS goes through the
//! Twilio REST API, email through a generic JSON relay; both fall back to a
//! sender that logs the message and returns `Ok` for local development.
//! Every outbound call runs on a client with a bounded timeout so a stuck
//! provider cannot hold the issuing request open.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::otp::{Channel, Purpose};

const SEND_TIMEOUT_SECONDS: u64 = 10;

/// How a code left the building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to a real provider which acknowledged it.
    Sent,
    /// Logged only (dev backends).
    Logged,
}

/// SMS backend selection.
pub enum SmsBackend {
    /// Log the message instead of sending (local dev).
    Log,
    Twilio {
        account_sid: String,
        auth_token: SecretString,
        from: String,
    },
}

/// Email backend selection.
pub enum EmailBackend {
    /// Log the message instead of sending (local dev).
    Log,
    /// POST `{to, subject, text}` to a relay endpoint.
    Http {
        url: String,
        token: Option<SecretString>,
    },
}

pub struct Delivery {
    client: Client,
    sms: SmsBackend,
    email: EmailBackend,
}

impl Delivery {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(sms: SmsBackend, email: EmailBackend) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECONDS))
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build delivery HTTP client")?;
        Ok(Self { client, sms, email })
    }

    /// Deliver a verification code over the channel the contact implies.
    ///
    /// # Errors
    /// Returns an error when the provider rejects the message or the call
    /// times out. Issuance is already persisted by then; the caller decides
    /// whether that is a hard failure or a debug-mode soft one.
    pub async fn send_code(
        &self,
        channel: Channel,
        to: &str,
        purpose: Purpose,
        code: &str,
        ttl_seconds: i64,
    ) -> Result<DeliveryOutcome> {
        let message = render_message(purpose, code, ttl_seconds);
        match channel {
            Channel::Phone => self.send_sms(to, &message).await,
            Channel::Email => self.send_email(to, &message).await,
        }
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<DeliveryOutcome> {
        match &self.sms {
            SmsBackend::Log => {
                info!(to = %to, body = %body, "sms delivery stub");
                Ok(DeliveryOutcome::Logged)
            }
            SmsBackend::Twilio {
                account_sid,
                auth_token,
                from,
            } => {
                let url = format!(
                    "https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json"
                );
                let response = self
                    .client
                    .post(&url)
                    .basic_auth(account_sid, Some(auth_token.expose_secret()))
                    .form(&[("From", from.as_str()), ("To", to), ("Body", body)])
                    .send()
                    .await
                    .context("twilio request failed")?;
                let status = response.status();
                if !status.is_success() {
                    return Err(anyhow!("twilio rejected message: {status}"));
                }
                Ok(DeliveryOutcome::Sent)
            }
        }
    }

    async fn send_email(&self, to: &str, text: &str) -> Result<DeliveryOutcome> {
        match &self.email {
            EmailBackend::Log => {
                info!(to = %to, text = %text, "email delivery stub");
                Ok(DeliveryOutcome::Logged)
            }
            EmailBackend::Http { url, token } => {
                let mut request = self.client.post(url).json(&json!({
                    "to": to,
                    "subject": "Your verification code",
                    "text": text,
                }));
                if let Some(token) = token {
                    request = request.bearer_auth(token.expose_secret());
                }
                let response = request.send().await.context("email relay request failed")?;
                let status = response.status();
                if !status.is_success() {
                    return Err(anyhow!("email relay rejected message: {status}"));
                }
                Ok(DeliveryOutcome::Sent)
            }
        }
    }
}

/// Message text per purpose, matching what customers already receive.
fn render_message(purpose: Purpose, code: &str, ttl_seconds: i64) -> String {
    let minutes = (ttl_seconds / 60).max(1);
    match purpose {
        Purpose::Reset => {
            format!("Vetrina: your password reset code is {code}. Expires in {minutes} min.")
        }
        Purpose::Register | Purpose::Verify => {
            format!("Vetrina: your verification code is {code}. Expires in {minutes} min.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_message_mentions_reset() {
        let text = render_message(Purpose::Reset, "123456", 600);
        assert!(text.contains("password reset code is 123456"));
        assert!(text.contains("10 min"));
    }

    #[test]
    fn register_and_verify_share_wording() {
        let register = render_message(Purpose::Register, "000042", 900);
        let verify = render_message(Purpose::Verify, "000042", 900);
        assert_eq!(register, verify);
        assert!(register.contains("verification code is 000042"));
    }

    #[test]
    fn sub_minute_ttl_rounds_up_to_one() {
        let text = render_message(Purpose::Register, "111111", 30);
        assert!(text.contains("1 min"));
    }

    #[tokio::test]
    async fn log_backends_report_logged() -> Result<()> {
        let delivery = Delivery::new(SmsBackend::Log, EmailBackend::Log)?;
        let outcome = delivery
            .send_code(
                Channel::Phone,
                "+15550001111",
                Purpose::Register,
                "123456",
                600,
            )
            .await?;
        assert_eq!(outcome, DeliveryOutcome::Logged);
        let outcome = delivery
            .send_code(
                Channel::Email,
                "alice@example.com",
                Purpose::Reset,
                "123456",
                600,
            )
            .await?;
        assert_eq!(outcome, DeliveryOutcome::Logged);
        Ok(())
    }
}
