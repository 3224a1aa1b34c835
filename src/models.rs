use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

use crate::pagination::PageInfo;

// --- Resource Abstraction ---

/// The three resource types managed by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Employee,
    Role,
    Division,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Employee => "employee",
            ResourceKind::Role => "role",
            ResourceKind::Division => "division",
        }
    }
}

/// Resource
///
/// The shape shared by Employee, Role and Division: a store-assigned id, a natural key
/// that must be unique among active rows, and audit timestamps.
pub trait Resource: Clone + Send + Sync + Serialize + 'static {
    /// Payload for `create`.
    type Create: Send + Sync + 'static;
    /// Partial-update payload; unset fields are left untouched.
    type Patch: Send + Sync + 'static;

    const KIND: ResourceKind;

    fn id(&self) -> i64;
    fn natural_key(&self) -> &str;
    fn timestamps(&self) -> &Timestamps;

    fn create_key(new: &Self::Create) -> &str;
    /// The new natural key, when the patch changes it.
    fn patch_key(patch: &Self::Patch) -> Option<&str>;
}

/// Active/Deleted status derived from the deletion timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EntityStatus {
    Active,
    Deleted,
}

/// Timestamps
///
/// Audit columns carried by every resource. A set `deleted_at` marks the row soft-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Timestamps {
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn status(&self) -> EntityStatus {
        match self.deleted_at {
            Some(_) => EntityStatus::Deleted,
            None => EntityStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == EntityStatus::Active
    }
}

// --- Core Entities ---

/// Role
///
/// A job role; its natural key is `name`. Role id 1 ("Admin") grants administrative access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub timestamps: Timestamps,
}

/// Division
///
/// An organisational division; its natural key is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Division {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub timestamps: Timestamps,
}

/// NamedRef
///
/// Denormalized `{id, name}` of a role or division, embedded in employee responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

/// Employee
///
/// A directory entry; its natural key is `email`. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Employee {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role_id: i64,
    pub division_id: i64,
    // Loaded via JOIN; `None` if the referenced row is gone.
    pub role: Option<NamedRef>,
    pub division: Option<NamedRef>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

// --- Store Payloads ---

/// Create payload shared by Role and Division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct NamedPayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Partial update shared by Role and Division.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct NamedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

/// Emails are the login key and compare case-insensitively, so they are stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Store-level employee insert. Built from `CreateEmployeeRequest` once the password is hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
    pub division_id: i64,
}

/// Store-level employee patch. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeePatch {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: Option<i64>,
    pub division_id: Option<i64>,
}

impl Resource for Role {
    type Create = NamedPayload;
    type Patch = NamedPatch;
    const KIND: ResourceKind = ResourceKind::Role;

    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> &str {
        &self.name
    }
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
    fn create_key(new: &NamedPayload) -> &str {
        &new.name
    }
    fn patch_key(patch: &NamedPatch) -> Option<&str> {
        patch.name.as_deref()
    }
}

impl Resource for Division {
    type Create = NamedPayload;
    type Patch = NamedPatch;
    const KIND: ResourceKind = ResourceKind::Division;

    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> &str {
        &self.name
    }
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
    fn create_key(new: &NamedPayload) -> &str {
        &new.name
    }
    fn patch_key(patch: &NamedPatch) -> Option<&str> {
        patch.name.as_deref()
    }
}

impl Resource for Employee {
    type Create = NewEmployee;
    type Patch = EmployeePatch;
    const KIND: ResourceKind = ResourceKind::Employee;

    fn id(&self) -> i64 {
        self.id
    }
    fn natural_key(&self) -> &str {
        &self.email
    }
    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
    fn create_key(new: &NewEmployee) -> &str {
        &new.email
    }
    fn patch_key(patch: &EmployeePatch) -> Option<&str> {
        patch.email.as_deref()
    }
}

/// NamedResource
///
/// Role and Division are the same shape over different tables; stores implement them once
/// through this trait.
pub trait NamedResource: Resource<Create = NamedPayload, Patch = NamedPatch> {
    /// Backing table name. A compile-time constant, never user input.
    const TABLE: &'static str;

    fn from_parts(id: i64, name: String, timestamps: Timestamps) -> Self;
    fn set_name(&mut self, name: String);
    fn timestamps_mut(&mut self) -> &mut Timestamps;
}

impl NamedResource for Role {
    const TABLE: &'static str = "roles";

    fn from_parts(id: i64, name: String, timestamps: Timestamps) -> Self {
        Role {
            id,
            name,
            timestamps,
        }
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

impl NamedResource for Division {
    const TABLE: &'static str = "divisions";

    fn from_parts(id: i64, name: String, timestamps: Timestamps) -> Self {
        Division {
            id,
            name,
            timestamps,
        }
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateEmployeeRequest
///
/// Admin payload for `POST /employees`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 255))]
    pub fullname: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role_id: i64,
    pub division_id: i64,
}

/// UpdateEmployeeRequest
///
/// Partial update for `PUT /employees/{id}`. Only provided fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct UpdateEmployeeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 8))]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division_id: Option<i64>,
}

/// SignupRequest
///
/// Public self-registration. The role is always the configured default role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 255))]
    pub fullname: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub division_id: i64,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

// --- Response Schemas (Output) ---

/// AuthResponse
///
/// Returned by login and signup: the employee plus a freshly issued token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub employee: Employee,
    pub jwt: String,
}

/// Meta
///
/// Envelope header. `info` is present on list responses only.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Meta {
    pub success: bool,
    pub message: String,
    pub info: Option<PageInfo>,
}

/// ApiResponse
///
/// Uniform success envelope wrapping any payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub meta: Meta,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            meta: Meta {
                success: true,
                message: message.into(),
                info: None,
            },
            data,
        }
    }

    pub fn page(message: impl Into<String>, data: T, info: PageInfo) -> Self {
        Self {
            meta: Meta {
                success: true,
                message: message.into(),
                info: Some(info),
            },
            data,
        }
    }
}
