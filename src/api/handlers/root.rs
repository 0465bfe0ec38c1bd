use axum::{http::StatusCode, response::IntoResponse};

/// Undocumented liveness root; load balancers hit this before anything else.
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, env!("CARGO_PKG_NAME"))
}
