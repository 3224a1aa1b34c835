use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    clock::ClockState,
    config::AppConfig,
    error::{AppError, AuthError},
};

/// The only algorithm this service signs with or accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Reads the `alg` a token's header declares without trusting it.
///
/// `None` means the header is not a base64url JSON object with a string `alg`.
fn declared_algorithm(token: &str) -> Option<String> {
    let header = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(header).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("alg")?.as_str().map(str::to_string)
}

/// Claims
///
/// Payload embedded in every identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the employee id.
    pub sub: i64,
    pub email: String,
    pub role_id: i64,
    pub division_id: i64,
    /// Issued At (iat), unix seconds.
    pub iat: i64,
    /// Expiration Time (exp), unix seconds. The token is invalid from this instant on.
    pub exp: i64,
}

/// AuthUser
///
/// The verified identity assertion of a request. Immutable and discarded with the request;
/// nothing is kept server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role_id: i64,
    pub division_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// TokenCodec
///
/// Issues and verifies HS256-signed, expiring identity tokens. The secret and TTL are fixed
/// at construction; verification is pure and needs no synchronization.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: ClockState,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration, clock: ClockState) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            clock,
        }
    }

    pub fn from_config(config: &AppConfig, clock: ClockState) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::seconds(config.jwt_ttl_secs),
            clock,
        )
    }

    /// issue
    ///
    /// Signs a token for the given identity, expiring `ttl` after the current clock time.
    pub fn issue(
        &self,
        subject_id: i64,
        email: &str,
        role_id: i64,
        division_id: i64,
    ) -> Result<String, AppError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject_id,
            email: email.to_string(),
            role_id,
            division_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
    }

    /// verify
    ///
    /// Checks signature and algorithm first, then expiry against the injected clock.
    /// Expiry is a closed bound: `now >= exp` is already expired. There is no not-before check.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        // Foreign algorithms jsonwebtoken cannot even name (e.g. "none") are still substitutions.
        if declared_algorithm(token).is_some_and(|alg| alg != "HS256") {
            return Err(AuthError::SignatureInvalid);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Expiry is evaluated below with our own clock and without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Err(match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        AuthError::SignatureInvalid
                    }
                    _ => AuthError::MalformedToken,
                });
            }
        };

        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(AuthError::MalformedToken)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::MalformedToken)?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role_id: claims.role_id,
            division_id: claims.division_id,
            issued_at,
            expires_at,
        })
    }

    /// verify_bearer
    ///
    /// Verifies the raw `Authorization` header value. Absent means no credential; anything
    /// other than the `Bearer` scheme is malformed.
    pub fn verify_bearer(&self, header_value: Option<&str>) -> Result<AuthUser, AuthError> {
        let value = header_value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MalformedToken)?;

        self.verify(token)
    }
}

/// AuthUser Extractor Implementation
///
/// Resolves the identity for any protected handler from the `Authorization: Bearer` header.
/// Rejects with the matching `AuthError` (401) before the handler runs.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenCodec: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = TokenCodec::from_ref(state);

        let header_value = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedToken)?),
            None => None,
        };

        Ok(codec.verify_bearer(header_value)?)
    }
}
