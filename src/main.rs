use hr_directory::{
    AppState, InMemoryStore, PostgresStore, Stores, SystemClock,
    clock::ClockState,
    config::{AppConfig, Env},
    create_router, seed,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, selects the store backend, seeds demo data
/// locally and serves the HTTP API.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise crate debug + request summaries.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hr_directory=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Store selection: Postgres when DATABASE_URL is set, in-memory otherwise.
    let stores = match config.db_url.as_deref() {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let store = PostgresStore::new(pool);
            store
                .migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            tracing::info!("Using Postgres store");
            Stores::from_backend(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the non-durable in-memory store");
            Stores::from_backend(Arc::new(InMemoryStore::new()))
        }
    };

    // 4. State assembly
    let clock: ClockState = Arc::new(SystemClock);
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, stores, clock);

    // LOCAL-ONLY: default roles, divisions and demo employees.
    if app_state.config.env == Env::Local {
        seed::seed(&app_state.roles, &app_state.divisions, &app_state.employees)
            .await
            .expect("FATAL: Failed to seed demo data.");
    }

    // 5. Router and server startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
