use crate::api::delivery::{Delivery, EmailBackend, SmsBackend};
use crate::api::{self, handlers::auth};
use crate::session::SessionSigner;
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub otp_ttl_seconds: i64,
    pub otp_max_attempts: i32,
    pub debug_return_code: bool,
    pub google_client_id: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<SecretString>,
    pub twilio_from: Option<String>,
    pub email_relay_url: Option<String>,
    pub email_relay_token: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if delivery or Google setup fails, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = auth::AuthConfig::new(args.frontend_base_url)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_otp_max_attempts(args.otp_max_attempts)
        .with_debug_return_code(args.debug_return_code);

    let session = SessionSigner::new(args.session_secret, args.session_ttl_seconds);

    let sms = match (args.twilio_account_sid, args.twilio_auth_token, args.twilio_from) {
        (Some(account_sid), Some(auth_token), Some(from)) => SmsBackend::Twilio {
            account_sid,
            auth_token,
            from,
        },
        _ => {
            info!("Twilio not configured; SMS codes will be logged");
            SmsBackend::Log
        }
    };
    let email = match args.email_relay_url {
        Some(url) => EmailBackend::Http {
            url,
            token: args.email_relay_token,
        },
        None => {
            info!("Email relay not configured; email codes will be logged");
            EmailBackend::Log
        }
    };
    let delivery = Delivery::new(sms, email)?;

    let google = match args.google_client_id {
        Some(client_id) => Some(auth::GoogleVerifier::new(client_id)?),
        None => None,
    };

    api::new(args.port, args.dsn, auth_config, session, delivery, google).await
}
