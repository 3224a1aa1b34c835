use axum::{http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use hr_directory::{
    AppError,
    error::{AuthError, StoreError},
    models::{
        ApiResponse, CreateEmployeeRequest, Employee, EntityStatus, NamedPatch, NamedPayload,
        NamedRef, Role, SignupRequest, Timestamps, UpdateEmployeeRequest,
    },
    pagination::Window,
};
use serde_json::{Value, json};
use validator::Validate;

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap()
}

fn employee() -> Employee {
    Employee {
        id: 2,
        fullname: "Devon C. Thomas".to_string(),
        email: "devoncthomas@superrito.com".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        role_id: 2,
        division_id: 1,
        role: Some(NamedRef {
            id: 2,
            name: "User".to_string(),
        }),
        division: Some(NamedRef {
            id: 1,
            name: "Finance".to_string(),
        }),
        timestamps: Timestamps::new(t0()),
    }
}

async fn body_json(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// --- Serialization ---

#[test]
fn test_employee_json_hides_password_hash() {
    let value = serde_json::to_value(employee()).unwrap();
    assert!(value.get("password_hash").is_none());
    assert_eq!(value["email"], "devoncthomas@superrito.com");
}

#[test]
fn test_timestamps_are_flattened() {
    let value = serde_json::to_value(employee()).unwrap();
    assert!(value["created_at"].is_string());
    assert!(value["updated_at"].is_string());
    assert!(value["deleted_at"].is_null());
    assert!(value.get("timestamps").is_none());
}

#[test]
fn test_entity_status_follows_deleted_at() {
    let mut timestamps = Timestamps::new(t0());
    assert_eq!(timestamps.status(), EntityStatus::Active);
    timestamps.deleted_at = Some(t0());
    assert_eq!(timestamps.status(), EntityStatus::Deleted);
    assert!(!timestamps.is_active());
}

#[test]
fn test_success_envelope_shape() {
    let role = Role {
        id: 1,
        name: "Admin".to_string(),
        timestamps: Timestamps::new(t0()),
    };
    let single = serde_json::to_value(ApiResponse::ok("Get role success", role.clone())).unwrap();
    assert_eq!(single["meta"]["success"], true);
    assert_eq!(single["meta"]["message"], "Get role success");
    assert!(single["meta"]["info"].is_null());
    assert_eq!(single["data"]["name"], "Admin");

    let info = Window::default().page_info(1);
    let page = serde_json::to_value(ApiResponse::page("Get roles success", vec![role], info)).unwrap();
    assert_eq!(
        page["meta"]["info"],
        json!({
            "page": 1,
            "page_size": 10,
            "count": 1,
            "total_pages": 1,
            "more_records": false
        })
    );
}

// --- Payload validation ---

#[test]
fn test_named_payload_requires_a_name() {
    assert!(NamedPayload { name: "Finance".into() }.validate().is_ok());
    assert!(NamedPayload { name: String::new() }.validate().is_err());
    assert!(NamedPatch::default().validate().is_ok());
    assert!(NamedPatch { name: Some(String::new()) }.validate().is_err());
}

#[test]
fn test_create_employee_request_rules() {
    let valid = CreateEmployeeRequest {
        fullname: "New Hire".into(),
        email: "new@example.com".into(),
        password: "long-enough".into(),
        role_id: 2,
        division_id: 1,
    };
    assert!(valid.validate().is_ok());

    let bad_email = CreateEmployeeRequest {
        email: "nope".into(),
        ..valid.clone()
    };
    assert!(bad_email.validate().is_err());

    let short_password = CreateEmployeeRequest {
        password: "short".into(),
        ..valid
    };
    assert!(short_password.validate().is_err());
}

#[test]
fn test_update_employee_request_checks_only_present_fields() {
    assert!(UpdateEmployeeRequest::default().validate().is_ok());
    let bad = UpdateEmployeeRequest {
        email: Some("nope".into()),
        ..UpdateEmployeeRequest::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn test_signup_request_deserializes_without_role() {
    let request: SignupRequest = serde_json::from_value(json!({
        "fullname": "Fresh Face",
        "email": "fresh@example.com",
        "password": "sufficiently-long",
        "division_id": 2,
        "role_id": 1
    }))
    .unwrap();
    assert!(request.validate().is_ok());
    assert_eq!(request.division_id, 2);
}

// --- Error mapping ---

#[test]
fn test_store_errors_map_to_app_errors() {
    assert!(matches!(
        AppError::from(StoreError::NotFound("role 1".into())),
        AppError::NotFound
    ));
    assert!(matches!(
        AppError::from(StoreError::Conflict("dup".into())),
        AppError::Duplicate(_)
    ));
    assert!(matches!(
        AppError::from(StoreError::InvalidReference("role 9".into())),
        AppError::Validation(_)
    ));
    assert!(matches!(
        AppError::from(StoreError::Unexpected(anyhow::anyhow!("boom"))),
        AppError::Internal(_)
    ));
}

#[tokio::test]
async fn test_error_statuses_and_codes() {
    let cases = [
        (AppError::Auth(AuthError::Expired), StatusCode::UNAUTHORIZED, "unauthorized"),
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized"),
        (
            AppError::InvalidPagination("page".into()),
            StatusCode::BAD_REQUEST,
            "bad_request",
        ),
        (AppError::InvalidCredentials, StatusCode::BAD_REQUEST, "bad_request"),
        (AppError::NotFound, StatusCode::NOT_FOUND, "not_found"),
        (AppError::Duplicate("x".into()), StatusCode::CONFLICT, "duplicate"),
    ];
    for (err, status, code) in cases {
        let (actual_status, body) = body_json(err).await;
        assert_eq!(actual_status, status);
        assert_eq!(body["error"], code);
        assert_eq!(body["meta"]["success"], false);
    }
}

#[tokio::test]
async fn test_identity_failures_share_one_message() {
    let (_, expired) = body_json(AppError::Auth(AuthError::Expired)).await;
    let (_, forged) = body_json(AppError::Auth(AuthError::SignatureInvalid)).await;
    let (_, denied) = body_json(AppError::Unauthorized).await;
    assert_eq!(expired, forged);
    assert_eq!(expired, denied);
}

#[tokio::test]
async fn test_internal_error_does_not_leak_detail() {
    let (status, body) =
        body_json(AppError::Internal(anyhow::anyhow!("password=hunter2 at db:5432"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "server_error");
    assert!(!body.to_string().contains("hunter2"));
}
