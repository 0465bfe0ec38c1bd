//! Password and Google sign-in endpoints.

use anyhow::Result;
use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::session::SessionIdentity;

use super::state::AuthState;
use super::storage::{lookup_user_by_contact, upsert_google_user, UserRecord};
use super::types::{ErrorResponse, GoogleLoginRequest, LoginRequest, SessionResponse};
use super::user_response;
use super::utils::{normalize_contact, verify_password};

/// Mint a session token for an account and shape the login response.
pub(super) fn session_response(
    auth_state: &AuthState,
    user: &UserRecord,
) -> Result<SessionResponse> {
    let identity = SessionIdentity {
        user_id: user.user_id,
        email: user.email.clone(),
        phone: user.phone.clone(),
        name: user.name.clone(),
    };
    let token = auth_state.session().issue(&identity)?;
    Ok(SessionResponse {
        token,
        user: user_response(user),
    })
}

fn invalid_credentials() -> axum::response::Response {
    // One answer for unknown contact, wrong password, and password-less
    // accounts, so login cannot be used to probe which contacts exist.
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "invalid_credentials".to_string(),
        }),
    )
        .into_response()
}

/// Authenticate with a contact and password.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = SessionResponse),
        (status = 400, description = "Missing payload", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "missing_payload".to_string(),
                }),
            )
                .into_response();
        }
    };

    let Some((contact, channel)) = normalize_contact(&request.contact) else {
        return invalid_credentials();
    };

    let user = match lookup_user_by_contact(&pool, channel, &contact).await {
        Ok(Some(user)) => user,
        Ok(None) => return invalid_credentials(),
        Err(err) => {
            error!("Failed to lookup user for login: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                }),
            )
                .into_response();
        }
    };

    let Some(stored_hash) = user.password_hash.as_deref() else {
        return invalid_credentials();
    };

    match verify_password(&request.password, stored_hash) {
        Ok(true) => {}
        Ok(false) => return invalid_credentials(),
        Err(err) => {
            error!("Failed to verify password: {err}");
            return invalid_credentials();
        }
    }

    match session_response(&auth_state, &user) {
        Ok(response) => {
            info!(channel = channel.as_str(), "login succeeded");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to mint login session: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Authenticate with a Google ID token.
#[utoipa::path(
    post,
    path = "/v1/auth/login/google",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = SessionResponse),
        (status = 400, description = "Missing payload", body = ErrorResponse),
        (status = 401, description = "Token rejected", body = ErrorResponse),
        (status = 503, description = "Google sign-in not configured", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_google(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<GoogleLoginRequest>>,
) -> impl IntoResponse {
    let request: GoogleLoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "missing_payload".to_string(),
                }),
            )
                .into_response();
        }
    };

    let Some(verifier) = auth_state.google() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "google_login_disabled".to_string(),
            }),
        )
            .into_response();
    };

    let identity = match verifier.verify(request.id_token.trim()).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!("Google token rejected: {err}");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "invalid_google_token".to_string(),
                }),
            )
                .into_response();
        }
    };

    let user = match upsert_google_user(
        &pool,
        &identity.sub,
        &identity.email,
        identity.name.as_deref(),
    )
    .await
    {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to upsert google user: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                }),
            )
                .into_response();
        }
    };

    match session_response(&auth_state, &user) {
        Ok(response) => {
            info!("google login succeeded");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to mint google login session: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                }),
            )
                .into_response()
        }
    }
}
