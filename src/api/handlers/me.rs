//! Authenticated profile endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::auth::types::UserResponse;
use super::auth::{lookup_user_by_id, require_session, user_response, AuthState};

/// Return the account behind the presented session token.
///
/// The token carries an identity snapshot, but the row is authoritative:
/// a token for a deleted account gets a 401, not stale claims.
#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Authenticated user profile", body = UserResponse),
        (status = 401, description = "Missing or invalid session token")
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_session(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(status) => return status.into_response(),
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match lookup_user_by_id(&pool, user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user_response(&user))).into_response(),
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to fetch profile: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
