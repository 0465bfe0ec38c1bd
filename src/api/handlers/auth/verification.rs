//! Verification code endpoints.
//!
//! One pair of endpoints drives all three code-based workflows. The purpose
//! field selects what a successful verification finalizes: creating an
//! account, attaching a contact to an existing one, or replacing a password.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::delivery::DeliveryOutcome;
use crate::otp::{self, DenyReason, Purpose, VerifyOutcome};

use super::login::session_response;
use super::state::AuthState;
use super::storage::{
    attach_contact_in_tx, create_user_in_tx, lookup_user_by_contact, lookup_user_by_id,
    update_password_in_tx, AttachOutcome, CreateOutcome,
};
use super::types::{
    ErrorResponse, VerificationFinishRequest, VerificationStartRequest, VerificationStartResponse,
};
use super::utils::{hash_password, normalize_contact, valid_password};
use super::{require_session, user_response};

/// Payload stored with a `register` request and replayed at finish time.
#[derive(Serialize, Deserialize, Debug)]
struct RegisterPayload {
    name: String,
    password_hash: String,
}

/// Payload stored with a `verify` request.
#[derive(Serialize, Deserialize, Debug)]
struct VerifyPayload {
    user_id: Uuid,
}

fn bad_request(error: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal_error".to_string(),
        }),
    )
        .into_response()
}

/// Issue a verification code for a `(purpose, contact)` pair.
#[utoipa::path(
    post,
    path = "/v1/auth/verification/start",
    request_body = VerificationStartRequest,
    responses(
        (status = 200, description = "Code issued", body = VerificationStartResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Missing session for verify purpose", body = ErrorResponse),
        (status = 409, description = "Contact already in use", body = ErrorResponse),
        (status = 502, description = "Code delivery failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verification_start(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerificationStartRequest>>,
) -> impl IntoResponse {
    let request: VerificationStartRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("missing_payload"),
    };

    let Some((contact, channel)) = normalize_contact(&request.contact) else {
        return bad_request("invalid_contact");
    };

    // The stored payload captures everything finish needs; a later start for
    // the same pair replaces it wholesale.
    let payload_json = match request.purpose {
        Purpose::Register => {
            let name = request
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty());
            let Some(name) = name else {
                return bad_request("missing_name");
            };
            let Some(password) = request.password.as_deref() else {
                return bad_request("missing_password");
            };
            if !valid_password(password) {
                return bad_request("invalid_password");
            }

            match lookup_user_by_contact(&pool, channel, &contact).await {
                Ok(Some(_)) => {
                    return (
                        StatusCode::CONFLICT,
                        Json(ErrorResponse {
                            error: "contact_in_use".to_string(),
                        }),
                    )
                        .into_response();
                }
                Ok(None) => {}
                Err(err) => {
                    error!("Failed to check contact availability: {err}");
                    return internal_error();
                }
            }

            let password_hash = match hash_password(password) {
                Ok(hash) => hash,
                Err(err) => {
                    error!("Failed to hash password: {err}");
                    return internal_error();
                }
            };
            let payload = RegisterPayload {
                name: name.to_string(),
                password_hash,
            };
            match serde_json::to_string(&payload) {
                Ok(json) => Some(json),
                Err(err) => {
                    error!("Failed to encode register payload: {err}");
                    return internal_error();
                }
            }
        }
        Purpose::Verify => {
            let claims = match require_session(&headers, &auth_state) {
                Ok(claims) => claims,
                Err(status) => return status.into_response(),
            };
            let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
                return StatusCode::UNAUTHORIZED.into_response();
            };

            match lookup_user_by_contact(&pool, channel, &contact).await {
                Ok(Some(owner)) if owner.user_id != user_id => {
                    return (
                        StatusCode::CONFLICT,
                        Json(ErrorResponse {
                            error: "contact_in_use".to_string(),
                        }),
                    )
                        .into_response();
                }
                Ok(_) => {}
                Err(err) => {
                    error!("Failed to check contact availability: {err}");
                    return internal_error();
                }
            }

            match serde_json::to_string(&VerifyPayload { user_id }) {
                Ok(json) => Some(json),
                Err(err) => {
                    error!("Failed to encode verify payload: {err}");
                    return internal_error();
                }
            }
        }
        Purpose::Reset => {
            // Opaque on purpose: when no account owns the contact we answer
            // as if a code went out, without issuing or delivering one.
            match lookup_user_by_contact(&pool, channel, &contact).await {
                Ok(Some(_)) => None,
                Ok(None) => {
                    let ttl = auth_state.config().otp_ttl_seconds();
                    return (
                        StatusCode::OK,
                        Json(VerificationStartResponse {
                            expires_at: crate::session::now_unix_seconds() + ttl,
                            debug_code: None,
                            delivery_error: None,
                        }),
                    )
                        .into_response();
                }
                Err(err) => {
                    error!("Failed to check reset contact: {err}");
                    return internal_error();
                }
            }
        }
    };

    let issued = match otp::service::issue(
        &pool,
        request.purpose,
        &contact,
        channel,
        payload_json.as_deref(),
        auth_state.config().otp_ttl_seconds(),
    )
    .await
    {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to issue verification code: {err}");
            return internal_error();
        }
    };

    let debug = auth_state.config().debug_return_code();
    let delivered = auth_state
        .delivery()
        .send_code(
            channel,
            &contact,
            request.purpose,
            &issued.code,
            auth_state.config().otp_ttl_seconds(),
        )
        .await;

    match delivered {
        Ok(DeliveryOutcome::Sent | DeliveryOutcome::Logged) => {
            info!(
                purpose = request.purpose.as_str(),
                channel = channel.as_str(),
                "verification code issued"
            );
            (
                StatusCode::OK,
                Json(VerificationStartResponse {
                    expires_at: issued.expires_at_unix,
                    debug_code: debug.then(|| issued.code.clone()),
                    delivery_error: None,
                }),
            )
                .into_response()
        }
        Err(err) if debug => {
            // The code is already persisted and usable; surface the failure
            // but keep the request alive for local testing.
            warn!("Code delivery failed (debug echo active): {err}");
            (
                StatusCode::OK,
                Json(VerificationStartResponse {
                    expires_at: issued.expires_at_unix,
                    debug_code: Some(issued.code.clone()),
                    delivery_error: Some("delivery_failed".to_string()),
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Code delivery failed: {err}");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: "delivery_failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Submit a code and finalize the workflow it was issued for.
#[utoipa::path(
    post,
    path = "/v1/auth/verification/finish",
    request_body = VerificationFinishRequest,
    responses(
        (status = 200, description = "Verified; body depends on purpose"),
        (status = 400, description = "Invalid payload or code", body = ErrorResponse),
        (status = 409, description = "Contact already in use", body = ErrorResponse),
        (status = 429, description = "Attempt limit reached", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verification_finish(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerificationFinishRequest>>,
) -> impl IntoResponse {
    let request: VerificationFinishRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("missing_payload"),
    };

    let Some((contact, channel)) = normalize_contact(&request.contact) else {
        return bad_request("invalid_contact");
    };

    let code = request.code.trim();
    if code.is_empty() {
        return bad_request("missing_code");
    }

    // Validate reset input before touching the state machine so a bad new
    // password does not consume the single-use code.
    let new_password_hash = match request.purpose {
        Purpose::Reset => {
            let Some(new_password) = request.new_password.as_deref() else {
                return bad_request("missing_new_password");
            };
            if !valid_password(new_password) {
                return bad_request("invalid_password");
            }
            match hash_password(new_password) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    error!("Failed to hash new password: {err}");
                    return internal_error();
                }
            }
        }
        Purpose::Register | Purpose::Verify => None,
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start verification transaction: {err}");
            return internal_error();
        }
    };

    let outcome = match otp::service::verify_in_tx(
        &mut tx,
        request.purpose,
        &contact,
        code,
        auth_state.config().otp_max_attempts(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Verification attempt failed: {err}");
            let _ = tx.rollback().await;
            return internal_error();
        }
    };

    let payload_json = match outcome {
        VerifyOutcome::Verified { payload_json } => payload_json,
        VerifyOutcome::Denied(reason) => {
            // Attempt bumps and deletions must stick even though the
            // request is denied.
            if let Err(err) = tx.commit().await {
                error!("Failed to commit denied verification: {err}");
                return internal_error();
            }
            let status = match reason {
                DenyReason::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                DenyReason::NotFoundOrExpired | DenyReason::Expired | DenyReason::InvalidCode => {
                    StatusCode::BAD_REQUEST
                }
            };
            return (
                status,
                Json(ErrorResponse {
                    error: reason.as_str().to_string(),
                }),
            )
                .into_response();
        }
    };

    match request.purpose {
        Purpose::Register => {
            let payload: RegisterPayload = match payload_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
            {
                Ok(Some(payload)) => payload,
                Ok(None) | Err(_) => {
                    error!("Register verification carried no usable payload");
                    let _ = tx.rollback().await;
                    return internal_error();
                }
            };

            let created = match create_user_in_tx(
                &mut tx,
                channel,
                &contact,
                &payload.name,
                &payload.password_hash,
            )
            .await
            {
                Ok(created) => created,
                Err(err) => {
                    error!("Failed to create account: {err}");
                    let _ = tx.rollback().await;
                    return internal_error();
                }
            };

            match created {
                CreateOutcome::Created(user_id) => {
                    if let Err(err) = tx.commit().await {
                        error!("Failed to commit registration: {err}");
                        return internal_error();
                    }
                    info!(channel = channel.as_str(), "account created");
                    finish_with_session(&pool, &auth_state, user_id).await
                }
                CreateOutcome::Conflict => {
                    // Roll back so the unconsumed code survives for a retry
                    // with a different contact state.
                    let _ = tx.rollback().await;
                    (
                        StatusCode::CONFLICT,
                        Json(ErrorResponse {
                            error: "contact_in_use".to_string(),
                        }),
                    )
                        .into_response()
                }
            }
        }
        Purpose::Verify => {
            let payload: VerifyPayload = match payload_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
            {
                Ok(Some(payload)) => payload,
                Ok(None) | Err(_) => {
                    error!("Verify verification carried no usable payload");
                    let _ = tx.rollback().await;
                    return internal_error();
                }
            };

            let attached =
                match attach_contact_in_tx(&mut tx, payload.user_id, channel, &contact).await {
                    Ok(attached) => attached,
                    Err(err) => {
                        error!("Failed to attach contact: {err}");
                        let _ = tx.rollback().await;
                        return internal_error();
                    }
                };

            match attached {
                AttachOutcome::Attached => {
                    if let Err(err) = tx.commit().await {
                        error!("Failed to commit contact attachment: {err}");
                        return internal_error();
                    }
                    match lookup_user_by_id(&pool, payload.user_id).await {
                        Ok(Some(user)) => {
                            (StatusCode::OK, Json(user_response(&user))).into_response()
                        }
                        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
                        Err(err) => {
                            error!("Failed to reload user after attach: {err}");
                            internal_error()
                        }
                    }
                }
                AttachOutcome::Conflict => {
                    let _ = tx.rollback().await;
                    (
                        StatusCode::CONFLICT,
                        Json(ErrorResponse {
                            error: "contact_in_use".to_string(),
                        }),
                    )
                        .into_response()
                }
                AttachOutcome::UserMissing => {
                    let _ = tx.rollback().await;
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }
        }
        Purpose::Reset => {
            // Checked above; reset always carries a hash by this point.
            let Some(password_hash) = new_password_hash else {
                let _ = tx.rollback().await;
                return internal_error();
            };

            let updated =
                match update_password_in_tx(&mut tx, channel, &contact, &password_hash).await {
                    Ok(updated) => updated,
                    Err(err) => {
                        error!("Failed to update password: {err}");
                        let _ = tx.rollback().await;
                        return internal_error();
                    }
                };

            match updated {
                Some(user) => {
                    if let Err(err) = tx.commit().await {
                        error!("Failed to commit password reset: {err}");
                        return internal_error();
                    }
                    info!(channel = channel.as_str(), "password reset");
                    match session_response(&auth_state, &user) {
                        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
                        Err(err) => {
                            error!("Failed to mint session after reset: {err}");
                            internal_error()
                        }
                    }
                }
                None => {
                    // The account vanished between start and finish. The code
                    // was consumed; report it the same way as a missing one.
                    if let Err(err) = tx.commit().await {
                        error!("Failed to commit orphaned reset: {err}");
                        return internal_error();
                    }
                    bad_request(DenyReason::NotFoundOrExpired.as_str())
                }
            }
        }
    }
}

async fn finish_with_session(
    pool: &PgPool,
    auth_state: &AuthState,
    user_id: Uuid,
) -> axum::response::Response {
    let user = match lookup_user_by_id(pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to load user for session: {err}");
            return internal_error();
        }
    };
    match session_response(auth_state, &user) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            error!("Failed to mint session: {err}");
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::super::storage::{
        create_user_in_tx, lookup_user_by_id, update_password_in_tx, CreateOutcome,
    };
    use super::super::utils::{hash_password, verify_password};
    use super::{verification_finish, verification_start, RegisterPayload, VerifyPayload};
    use crate::api::delivery::{Delivery, EmailBackend, SmsBackend};
    use crate::otp::{self, Channel, Purpose, VerifyOutcome};
    use crate::session::SessionSigner;
    use anyhow::{Context, Result};
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use std::sync::Arc;
    use uuid::Uuid;

    use super::super::types::{VerificationFinishRequest, VerificationStartRequest};

    /// DB-backed tests run only against `VETRINA_TEST_DSN`.
    async fn test_pool() -> Result<Option<PgPool>> {
        let Ok(dsn) = std::env::var("VETRINA_TEST_DSN") else {
            return Ok(None);
        };
        let pool = PgPoolOptions::new().max_connections(5).connect(&dsn).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Some(pool))
    }

    fn unique_email() -> String {
        format!("finish-{}@example.com", Uuid::new_v4().simple())
    }

    fn auth_state() -> Result<Arc<AuthState>> {
        let config = AuthConfig::new("https://shop.example.com".to_string());
        let session = SessionSigner::new(SecretString::from("test-secret"), 3600);
        let delivery = Delivery::new(SmsBackend::Log, EmailBackend::Log)?;
        Ok(Arc::new(AuthState::new(config, session, delivery, None)))
    }

    #[tokio::test]
    async fn start_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verification_start(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()?),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn start_invalid_contact() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verification_start(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(VerificationStartRequest {
                purpose: Purpose::Register,
                contact: "not a contact".to_string(),
                name: Some("Alice".to_string()),
                password: Some("Sup3rSecret".to_string()),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn start_register_requires_name_and_password() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verification_start(
            HeaderMap::new(),
            Extension(pool.clone()),
            Extension(auth_state()?),
            Some(Json(VerificationStartRequest {
                purpose: Purpose::Register,
                contact: "alice@example.com".to_string(),
                name: None,
                password: Some("Sup3rSecret".to_string()),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = verification_start(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(VerificationStartRequest {
                purpose: Purpose::Register,
                contact: "alice@example.com".to_string(),
                name: Some("Alice".to_string()),
                password: Some("weak".to_string()),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn start_verify_requires_session() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verification_start(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(VerificationStartRequest {
                purpose: Purpose::Verify,
                contact: "+15550001111".to_string(),
                name: None,
                password: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn finish_missing_code() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verification_finish(
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(VerificationFinishRequest {
                purpose: Purpose::Register,
                contact: "alice@example.com".to_string(),
                code: "  ".to_string(),
                new_password: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn finish_reset_validates_new_password_first() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verification_finish(
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(VerificationFinishRequest {
                purpose: Purpose::Reset,
                contact: "alice@example.com".to_string(),
                code: "123456".to_string(),
                new_password: Some("weak".to_string()),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[test]
    fn verify_payload_round_trips_with_uuid() -> Result<()> {
        let payload = VerifyPayload {
            user_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&payload)?;
        let decoded: VerifyPayload = serde_json::from_str(&json)?;
        assert_eq!(decoded.user_id, payload.user_id);
        Ok(())
    }

    #[tokio::test]
    async fn register_finalizes_inside_verify_transaction() -> Result<()> {
        let Some(pool) = test_pool().await? else {
            return Ok(());
        };
        let contact = unique_email();

        let payload = serde_json::to_string(&RegisterPayload {
            name: "Alice".to_string(),
            password_hash: hash_password("Sup3rSecret")?,
        })?;
        let issued = otp::service::issue(
            &pool,
            Purpose::Register,
            &contact,
            Channel::Email,
            Some(&payload),
            600,
        )
        .await?;

        let mut tx = pool.begin().await?;
        let outcome =
            otp::service::verify_in_tx(&mut tx, Purpose::Register, &contact, &issued.code, 5)
                .await?;
        let VerifyOutcome::Verified { payload_json } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        let stored: RegisterPayload =
            serde_json::from_str(payload_json.as_deref().context("missing payload")?)?;
        let created = create_user_in_tx(
            &mut tx,
            Channel::Email,
            &contact,
            &stored.name,
            &stored.password_hash,
        )
        .await?;
        let CreateOutcome::Created(user_id) = created else {
            panic!("expected user creation, got {created:?}");
        };
        tx.commit().await?;

        let user = lookup_user_by_id(&pool, user_id)
            .await?
            .context("created user missing")?;
        assert_eq!(user.email.as_deref(), Some(contact.as_str()));
        assert_eq!(user.name.as_deref(), Some("Alice"));
        Ok(())
    }

    #[tokio::test]
    async fn register_conflict_rolls_back_and_restores_code() -> Result<()> {
        let Some(pool) = test_pool().await? else {
            return Ok(());
        };
        let contact = unique_email();

        // Seed an account that already owns the contact.
        let mut seed = pool.begin().await?;
        let seeded = create_user_in_tx(
            &mut seed,
            Channel::Email,
            &contact,
            "Existing",
            &hash_password("Sup3rSecret")?,
        )
        .await?;
        assert!(matches!(seeded, CreateOutcome::Created(_)));
        seed.commit().await?;

        let payload = serde_json::to_string(&RegisterPayload {
            name: "Late".to_string(),
            password_hash: hash_password("An0therSecret")?,
        })?;
        let issued = otp::service::issue(
            &pool,
            Purpose::Register,
            &contact,
            Channel::Email,
            Some(&payload),
            600,
        )
        .await?;

        let mut tx = pool.begin().await?;
        let outcome =
            otp::service::verify_in_tx(&mut tx, Purpose::Register, &contact, &issued.code, 5)
                .await?;
        assert!(matches!(outcome, VerifyOutcome::Verified { .. }));
        let created = create_user_in_tx(
            &mut tx,
            Channel::Email,
            &contact,
            "Late",
            &hash_password("An0therSecret")?,
        )
        .await?;
        assert!(matches!(created, CreateOutcome::Conflict));
        tx.rollback().await?;

        // The rollback must restore the consumed code.
        let mut retry = pool.begin().await?;
        let outcome =
            otp::service::verify_in_tx(&mut retry, Purpose::Register, &contact, &issued.code, 5)
                .await?;
        assert!(matches!(outcome, VerifyOutcome::Verified { .. }));
        retry.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn reset_updates_password_inside_verify_transaction() -> Result<()> {
        let Some(pool) = test_pool().await? else {
            return Ok(());
        };
        let contact = unique_email();

        let mut seed = pool.begin().await?;
        let seeded = create_user_in_tx(
            &mut seed,
            Channel::Email,
            &contact,
            "Alice",
            &hash_password("OldSecret1")?,
        )
        .await?;
        assert!(matches!(seeded, CreateOutcome::Created(_)));
        seed.commit().await?;

        let issued =
            otp::service::issue(&pool, Purpose::Reset, &contact, Channel::Email, None, 600).await?;

        let mut tx = pool.begin().await?;
        let outcome =
            otp::service::verify_in_tx(&mut tx, Purpose::Reset, &contact, &issued.code, 5).await?;
        assert!(matches!(outcome, VerifyOutcome::Verified { .. }));
        let updated =
            update_password_in_tx(&mut tx, Channel::Email, &contact, &hash_password("NewSecret1")?)
                .await?
                .context("account vanished during reset")?;
        tx.commit().await?;

        let stored_hash = lookup_user_by_id(&pool, updated.user_id)
            .await?
            .context("reset user missing")?
            .password_hash
            .context("password hash missing")?;
        assert!(verify_password("NewSecret1", &stored_hash)?);
        assert!(!verify_password("OldSecret1", &stored_hash)?);
        Ok(())
    }
}
