//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::otp::Purpose;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerificationStartRequest {
    pub purpose: Purpose,
    /// Email address or phone number; the channel is derived from its shape.
    pub contact: String,
    /// Display name, required for `register`.
    pub name: Option<String>,
    /// Plaintext password, required for `register` and consumed by `reset`'s
    /// finish call instead.
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerificationStartResponse {
    pub expires_at: i64,
    /// Issued code, echoed only when debug echo is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
    /// Set when delivery failed but debug echo kept the request alive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerificationFinishRequest {
    pub purpose: Purpose,
    pub contact: String,
    pub code: String,
    /// New password, required for `reset`.
    pub new_password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub contact: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn verification_start_request_round_trips() -> Result<()> {
        let request: VerificationStartRequest = serde_json::from_str(
            r#"{"purpose":"register","contact":"alice@example.com","name":"Alice","password":"Sup3rSecret"}"#,
        )?;
        assert_eq!(request.purpose, Purpose::Register);
        assert_eq!(request.contact, "alice@example.com");
        assert_eq!(request.name.as_deref(), Some("Alice"));
        Ok(())
    }

    #[test]
    fn verification_start_request_optionals_default_to_none() -> Result<()> {
        let request: VerificationStartRequest =
            serde_json::from_str(r#"{"purpose":"reset","contact":"alice@example.com"}"#)?;
        assert_eq!(request.purpose, Purpose::Reset);
        assert_eq!(request.name, None);
        assert_eq!(request.password, None);
        Ok(())
    }

    #[test]
    fn start_response_omits_absent_debug_fields() -> Result<()> {
        let response = VerificationStartResponse {
            expires_at: 1_700_000_000,
            debug_code: None,
            delivery_error: None,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("debug_code").is_none());
        assert!(value.get("delivery_error").is_none());
        let expires = value
            .get("expires_at")
            .and_then(serde_json::Value::as_i64)
            .context("missing expires_at")?;
        assert_eq!(expires, 1_700_000_000);
        Ok(())
    }

    #[test]
    fn session_response_round_trips() -> Result<()> {
        let response = SessionResponse {
            token: "jwt".to_string(),
            user: UserResponse {
                user_id: "id".to_string(),
                name: Some("Alice".to_string()),
                email: Some("alice@example.com".to_string()),
                phone: None,
            },
        };
        let value = serde_json::to_value(&response)?;
        let decoded: SessionResponse = serde_json::from_value(value)?;
        assert_eq!(decoded.user.email.as_deref(), Some("alice@example.com"));
        Ok(())
    }
}
