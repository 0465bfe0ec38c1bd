//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server.

use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let session_secret = matches
        .get_one::<String>("session-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --session-secret")?;

    let twilio_auth_token = matches
        .get_one::<String>("twilio-auth-token")
        .cloned()
        .map(SecretString::from);
    let email_relay_token = matches
        .get_one::<String>("email-relay-token")
        .cloned()
        .map(SecretString::from);

    Ok(Action::Server(Box::new(Args {
        port,
        dsn,
        frontend_base_url: matches
            .get_one::<String>("frontend-base-url")
            .cloned()
            .context("missing required argument: --frontend-base-url")?,
        session_secret,
        session_ttl_seconds: matches
            .get_one::<i64>("session-ttl-seconds")
            .copied()
            .unwrap_or(604_800),
        otp_ttl_seconds: matches
            .get_one::<i64>("otp-ttl-seconds")
            .copied()
            .unwrap_or(600),
        otp_max_attempts: matches
            .get_one::<i32>("otp-max-attempts")
            .copied()
            .unwrap_or(5),
        debug_return_code: matches.get_flag("debug-return-code"),
        google_client_id: matches.get_one::<String>("google-client-id").cloned(),
        twilio_account_sid: matches.get_one::<String>("twilio-account-sid").cloned(),
        twilio_auth_token,
        twilio_from: matches.get_one::<String>("twilio-from").cloned(),
        email_relay_url: matches.get_one::<String>("email-relay-url").cloned(),
        email_relay_token,
    })))
}
