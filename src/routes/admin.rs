use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Mutations only the Admin role may perform, mounted under `/api/v1` next to the
/// authenticated routes. Paths that also have read methods are merged into the same route.
///
/// Access Control:
/// Authentication comes from the shared `auth_middleware` layer. The Admin check itself is
/// the access policy's, evaluated in each handler before the payload is validated.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /employees
        // Creates an employee with an explicit role and division.
        .route("/employees", post(handlers::create_employee))
        // POST /roles, PUT/DELETE /roles/{id}
        .route("/roles", post(handlers::create_role))
        .route(
            "/roles/{id}",
            put(handlers::update_role).delete(handlers::delete_role),
        )
        // POST /divisions, PUT/DELETE /divisions/{id}
        .route("/divisions", post(handlers::create_division))
        .route(
            "/divisions/{id}",
            put(handlers::update_division).delete(handlers::delete_division),
        )
}
