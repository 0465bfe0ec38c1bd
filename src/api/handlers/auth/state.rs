//! Auth state and configuration shared by the handlers.

use crate::api::delivery::Delivery;
use crate::session::SessionSigner;

use super::google::GoogleVerifier;

const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_OTP_MAX_ATTEMPTS: i32 = 5;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    otp_ttl_seconds: i64,
    otp_max_attempts: i32,
    debug_return_code: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            otp_max_attempts: DEFAULT_OTP_MAX_ATTEMPTS,
            debug_return_code: false,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_max_attempts(mut self, attempts: i32) -> Self {
        self.otp_max_attempts = attempts;
        self
    }

    /// Echo issued codes in responses and downgrade delivery failures.
    /// Never enable outside development environments.
    #[must_use]
    pub fn with_debug_return_code(mut self, enabled: bool) -> Self {
        self.debug_return_code = enabled;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    pub(super) fn otp_max_attempts(&self) -> i32 {
        self.otp_max_attempts
    }

    pub(super) fn debug_return_code(&self) -> bool {
        self.debug_return_code
    }
}

pub struct AuthState {
    config: AuthConfig,
    session: SessionSigner,
    delivery: Delivery,
    google: Option<GoogleVerifier>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        session: SessionSigner,
        delivery: Delivery,
        google: Option<GoogleVerifier>,
    ) -> Self {
        Self {
            config,
            session,
            delivery,
            google,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn session(&self) -> &SessionSigner {
        &self.session
    }

    pub(super) fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    pub(super) fn google(&self) -> Option<&GoogleVerifier> {
        self.google.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::delivery::{EmailBackend, SmsBackend};
    use anyhow::Result;
    use secrecy::SecretString;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://shop.example.com".to_string());

        assert_eq!(config.frontend_base_url(), "https://shop.example.com");
        assert_eq!(config.otp_ttl_seconds(), super::DEFAULT_OTP_TTL_SECONDS);
        assert_eq!(config.otp_max_attempts(), super::DEFAULT_OTP_MAX_ATTEMPTS);
        assert!(!config.debug_return_code());

        let config = config
            .with_otp_ttl_seconds(120)
            .with_otp_max_attempts(3)
            .with_debug_return_code(true);

        assert_eq!(config.otp_ttl_seconds(), 120);
        assert_eq!(config.otp_max_attempts(), 3);
        assert!(config.debug_return_code());
    }

    #[test]
    fn auth_state_constructs_without_google() -> Result<()> {
        let config = AuthConfig::new("https://shop.example.com".to_string());
        let session = SessionSigner::new(SecretString::from("test-secret"), 3600);
        let delivery = Delivery::new(SmsBackend::Log, EmailBackend::Log)?;
        let state = AuthState::new(config, session, delivery, None);
        assert!(state.google().is_none());
        Ok(())
    }
}
