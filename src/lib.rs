use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core components.
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod password;
pub mod policy;
pub mod repository;
pub mod seed;
pub mod service;

// HTTP surface.
pub mod handlers;
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenCodec;
pub use clock::{Clock, ClockState, MockClock, SystemClock};
pub use config::AppConfig;
pub use error::AppError;
pub use policy::AccessPolicy;
pub use repository::{InMemoryStore, PostgresStore, Stores};
pub use service::ResourceService;

use models::{Division, Employee, Role};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json` and browsable
/// through Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_status, handlers::login, handlers::signup,
        handlers::list_employees, handlers::get_employee, handlers::create_employee,
        handlers::update_employee, handlers::delete_employee,
        handlers::list_roles, handlers::get_role, handlers::create_role,
        handlers::update_role, handlers::delete_role,
        handlers::list_divisions, handlers::get_division, handlers::create_division,
        handlers::update_division, handlers::delete_division,
    ),
    components(
        schemas(
            models::Employee, models::Role, models::Division, models::NamedRef,
            models::Timestamps, models::EntityStatus, models::NamedPayload, models::NamedPatch,
            models::CreateEmployeeRequest, models::UpdateEmployeeRequest,
            models::SignupRequest, models::LoginRequest, models::AuthResponse, models::Meta,
            pagination::PageInfo, handlers::StatusResponse,
        )
    ),
    tags(
        (name = "hr-directory", description = "Employee, role and division directory API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every request: one orchestrator per resource type,
/// the token codec, the access policy and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    pub employees: ResourceService<Employee>,
    pub roles: ResourceService<Role>,
    pub divisions: ResourceService<Division>,
    pub tokens: TokenCodec,
    pub policy: AccessPolicy,
    pub config: AppConfig,
}

impl AppState {
    /// Wires services, codec and policy from the configuration. One clock drives token expiry
    /// and entity timestamps alike.
    pub fn new(config: AppConfig, stores: Stores, clock: ClockState) -> Self {
        Self {
            employees: ResourceService::new(stores.employees, clock.clone()),
            roles: ResourceService::new(stores.roles, clock.clone()),
            divisions: ResourceService::new(stores.divisions, clock.clone()),
            tokens: TokenCodec::from_config(&config, clock),
            policy: AccessPolicy::new(config.admin_role_id),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for TokenCodec {
    fn from_ref(app_state: &AppState) -> TokenCodec {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AccessPolicy {
    fn from_ref(app_state: &AppState) -> AccessPolicy {
        app_state.policy
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless it carries a valid bearer token. Runs before body
/// extraction, so an anonymous caller never gets a validation error instead.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles all routes, the auth layer, the observability stack and CORS around `state`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api/v1", protected)
        .fallback(handlers::route_not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with the `x-request-id` so every log line of the request
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
