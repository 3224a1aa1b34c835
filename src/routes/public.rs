use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: the liveness probe and the two flows that
/// hand one out.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /status
        // Liveness probe; answers `{"status":"OK"}` while the process is serving.
        .route("/status", get(handlers::get_status))
        // POST /api/v1/auth/login
        // Email + password in, employee + token out.
        .route("/api/v1/auth/login", post(handlers::login))
        // POST /api/v1/auth/signup
        // Self-registration with the configured default role.
        .route("/api/v1/auth/signup", post(handlers::signup))
}
