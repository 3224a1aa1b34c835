use axum::{
    extract::FromRequestParts,
    http::{Request, header},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hr_directory::{
    AppError, MockClock, TokenCodec,
    auth::{AuthUser, Claims},
    clock::ClockState,
    error::AuthError,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::sync::Arc;

const SECRET: &[u8] = b"auth-test-secret";
const TTL_SECS: i64 = 3600;

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap()
}

fn codec_with_clock() -> (TokenCodec, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new(start()));
    let codec = TokenCodec::new(
        SECRET,
        Duration::seconds(TTL_SECS),
        clock.clone() as ClockState,
    );
    (codec, clock)
}

fn raw_token(algorithm: Algorithm, secret: &[u8], exp: i64) -> String {
    let claims = Claims {
        sub: 5,
        email: "someone@example.com".to_string(),
        role_id: 1,
        division_id: 2,
        iat: start().timestamp(),
        exp,
    };
    encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

// --- Codec ---

#[test]
fn test_issue_then_verify_returns_identity_fields() {
    let (codec, _) = codec_with_clock();

    let token = codec.issue(42, "vincent@example.com", 1, 3).unwrap();
    let user = codec.verify(&token).unwrap();

    assert_eq!(user.id, 42);
    assert_eq!(user.email, "vincent@example.com");
    assert_eq!(user.role_id, 1);
    assert_eq!(user.division_id, 3);
    assert_eq!(user.issued_at, start());
    assert_eq!(user.expires_at, start() + Duration::seconds(TTL_SECS));
}

#[test]
fn test_token_valid_one_second_before_expiry() {
    let (codec, clock) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 2, 1).unwrap();

    clock.advance(Duration::seconds(TTL_SECS - 1));
    assert!(codec.verify(&token).is_ok());
}

#[test]
fn test_token_expired_exactly_at_expiry_instant() {
    let (codec, clock) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 2, 1).unwrap();

    clock.advance(Duration::seconds(TTL_SECS));
    assert_eq!(codec.verify(&token), Err(AuthError::Expired));
}

#[test]
fn test_token_expired_after_ttl() {
    let (codec, clock) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 2, 1).unwrap();

    clock.advance(Duration::days(2));
    assert_eq!(codec.verify(&token), Err(AuthError::Expired));
}

#[test]
fn test_future_dated_issuance_is_accepted() {
    let (codec, clock) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 2, 1).unwrap();

    // Verifier clock behind the issuer: there is no not-before check.
    clock.set(start() - Duration::minutes(10));
    assert!(codec.verify(&token).is_ok());
}

#[test]
fn test_different_secret_is_signature_invalid() {
    let (codec, _) = codec_with_clock();
    let exp = (start() + Duration::hours(1)).timestamp();
    let forged = raw_token(Algorithm::HS256, b"some-other-secret", exp);

    assert_eq!(codec.verify(&forged), Err(AuthError::SignatureInvalid));
}

#[test]
fn test_different_algorithm_is_signature_invalid() {
    let (codec, _) = codec_with_clock();
    let exp = (start() + Duration::hours(1)).timestamp();
    let token = raw_token(Algorithm::HS384, SECRET, exp);

    assert_eq!(codec.verify(&token), Err(AuthError::SignatureInvalid));
}

#[test]
fn test_unsigned_none_token_is_signature_invalid() {
    let (codec, _) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 1, 1).unwrap();
    let payload = token.split('.').nth(1).unwrap();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

    let unsigned = format!("{header}.{payload}.");
    assert_eq!(codec.verify(&unsigned), Err(AuthError::SignatureInvalid));
}

#[test]
fn test_header_without_json_is_malformed() {
    let (codec, _) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 1, 1).unwrap();
    let payload = token.split('.').nth(1).unwrap();
    let header = URL_SAFE_NO_PAD.encode(b"alg=none");

    let garbled = format!("{header}.{payload}.");
    assert_eq!(codec.verify(&garbled), Err(AuthError::MalformedToken));
}

#[test]
fn test_tampered_payload_is_signature_invalid() {
    let (codec, _) = codec_with_clock();
    let token = codec.issue(1, "a@example.com", 2, 1).unwrap();
    let other = codec.issue(99, "admin@example.com", 1, 1).unwrap();

    // Graft the second payload onto the first signature.
    let parts: Vec<&str> = token.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

    assert_eq!(codec.verify(&spliced), Err(AuthError::SignatureInvalid));
}

#[test]
fn test_garbage_is_malformed() {
    let (codec, _) = codec_with_clock();
    assert_eq!(codec.verify("not-a-token"), Err(AuthError::MalformedToken));
    assert_eq!(codec.verify("a.b.c"), Err(AuthError::MalformedToken));
}

#[test]
fn test_empty_token_is_missing_credential() {
    let (codec, _) = codec_with_clock();
    assert_eq!(codec.verify(""), Err(AuthError::MissingCredential));
    assert_eq!(codec.verify("   "), Err(AuthError::MissingCredential));
}

#[test]
fn test_verify_bearer_header_shapes() {
    let (codec, _) = codec_with_clock();
    let token = codec.issue(7, "b@example.com", 2, 1).unwrap();

    assert_eq!(
        codec.verify_bearer(None),
        Err(AuthError::MissingCredential)
    );
    assert_eq!(
        codec.verify_bearer(Some("  ")),
        Err(AuthError::MissingCredential)
    );
    assert_eq!(
        codec.verify_bearer(Some(&format!("Basic {token}"))),
        Err(AuthError::MalformedToken)
    );
    assert_eq!(
        codec.verify_bearer(Some(&token)),
        Err(AuthError::MalformedToken)
    );
    assert_eq!(
        codec.verify_bearer(Some(&format!("Bearer {token}"))).unwrap().id,
        7
    );
}

// --- Extractor ---

async fn extract(codec: &TokenCodec, authorization: Option<&str>) -> Result<AuthUser, AppError> {
    let mut builder = Request::builder().uri("/api/v1/employees");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();
    AuthUser::from_request_parts(&mut parts, codec).await
}

#[tokio::test]
async fn test_extractor_resolves_bearer_identity() {
    let (codec, _) = codec_with_clock();
    let token = codec.issue(11, "c@example.com", 2, 3).unwrap();

    let user = extract(&codec, Some(&format!("Bearer {token}")))
        .await
        .unwrap();
    assert_eq!(user.id, 11);
    assert_eq!(user.division_id, 3);
}

#[tokio::test]
async fn test_extractor_rejects_missing_header() {
    let (codec, _) = codec_with_clock();

    let err = extract(&codec, None).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(AuthError::MissingCredential)));
    assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extractor_rejects_expired_token() {
    let (codec, clock) = codec_with_clock();
    let token = codec.issue(11, "c@example.com", 2, 3).unwrap();
    clock.advance(Duration::seconds(TTL_SECS + 1));

    let err = extract(&codec, Some(&format!("Bearer {token}")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(AuthError::Expired)));
}
