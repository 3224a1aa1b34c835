use std::env;

/// AppConfig
///
/// Holds the process-wide configuration. Loaded once at startup and never mutated afterwards;
/// handlers and services receive it (or the pieces they need) through the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and demo seeding.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Symmetric secret used to sign and verify identity tokens (HS256).
    pub jwt_secret: String,
    // Lifetime of an issued token, in seconds.
    pub jwt_ttl_secs: i64,
    // Role id that grants the Admin access role.
    pub admin_role_id: i64,
    // Role id assigned to employees created through self-registration.
    pub default_role_id: i64,
}

/// Env
///
/// Defines the runtime context: pretty logs and demo data locally, JSON logs and
/// mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const LOCAL_JWT_SECRET: &str = "hr-directory-local-secret-value";
pub const DEFAULT_JWT_TTL_SECS: i64 = 3600;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// Safe, non-panicking values for tests. Uses the in-memory store.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            bind_addr: "127.0.0.1:0".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_ttl_secs: DEFAULT_JWT_TTL_SECS,
            admin_role_id: 1,
            default_role_id: 2,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics when a variable required in production (`JWT_SECRET`, `DATABASE_URL`) is missing,
    /// or when a numeric variable cannot be parsed. The process must not start half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()).as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.")
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL must be set in production."),
            ),
            Env::Local => env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
        };

        Self {
            env,
            db_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            jwt_ttl_secs: parse_var("JWT_TTL_SECONDS", DEFAULT_JWT_TTL_SECS),
            admin_role_id: parse_var("ADMIN_ROLE_ID", 1),
            default_role_id: parse_var("DEFAULT_ROLE_ID", 2),
        }
    }
}

fn parse_var(key: &str, fallback: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {key} must be an integer, got {raw:?}")),
        Err(_) => fallback,
    }
}
