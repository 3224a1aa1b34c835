use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Everything any signed-in employee can reach, mounted under `/api/v1`.
///
/// The router is wrapped in the `auth_middleware` layer, so every request here already carries
/// a verified `AuthUser`. Employee update and delete are further restricted to the caller's own
/// record (unless Admin) by the access policy in the handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Employees ---
        // GET /employees?page=&page_size=&search=
        // Paginated directory, searchable by full name or email.
        .route("/employees", get(handlers::list_employees))
        // GET/PUT/DELETE /employees/{id}
        // Read any employee; self-service update and delete.
        .route(
            "/employees/{id}",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        // --- Roles & Divisions (read-only here) ---
        .route("/roles", get(handlers::list_roles))
        .route("/roles/{id}", get(handlers::get_role))
        .route("/divisions", get(handlers::list_divisions))
        .route("/divisions/{id}", get(handlers::get_division))
}
