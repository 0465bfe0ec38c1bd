//! Auth handlers and supporting modules.
//!
//! All three code-based workflows (registration, contact verification,
//! password reset) share one issuance/verification state machine; the
//! endpoints here wire it to accounts, sessions, and delivery.

pub(crate) mod google;
pub(crate) mod login;
mod state;
mod storage;
pub(crate) mod types;
mod utils;
pub(crate) mod verification;

pub use google::GoogleVerifier;
pub use state::{AuthConfig, AuthState};
pub(crate) use storage::{lookup_user_by_id, UserRecord};

use axum::http::{HeaderMap, StatusCode};

use crate::session::SessionClaims;

use self::types::UserResponse;

/// Resolve the session claims from a bearer token, or the 401 to return.
pub(super) fn require_session(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<SessionClaims, StatusCode> {
    let token = utils::bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    auth_state
        .session()
        .verify(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

pub(super) fn user_response(user: &UserRecord) -> UserResponse {
    UserResponse {
        user_id: user.user_id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
    }
}
