use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{
        ApiResponse, AuthResponse, CreateEmployeeRequest, Division, Employee, EmployeePatch,
        LoginRequest, NamedPatch, NamedPayload, NewEmployee, Resource, Role, SignupRequest,
        UpdateEmployeeRequest, normalize_email,
    },
    pagination::{PageQuery, Window},
    password,
    policy::{AccessPolicy, AccessRole, Action, Operation},
    service::ResourceService,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

type Envelope<T> = Json<ApiResponse<T>>;

// --- Health & Fallback ---

/// Body of the health check.
#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

/// get_status
///
/// [Public Route] Liveness probe for load balancers and monitoring.
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Service is up", body = StatusResponse))
)]
pub async fn get_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}

/// Any path no router matched.
pub async fn route_not_found() -> AppError {
    AppError::NotFound
}

// --- Authentication ---

fn auth_response(state: &AppState, employee: Employee) -> Result<AuthResponse, AppError> {
    let jwt = state.tokens.issue(
        employee.id,
        &employee.email,
        employee.role_id,
        employee.division_id,
    )?;
    Ok(AuthResponse { employee, jwt })
}

/// login
///
/// [Public Route] Exchanges email and password for a signed identity token.
/// Unknown email and wrong password fail identically.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid payload or credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Envelope<AuthResponse>, AppError> {
    payload.validate()?;

    let employee = state
        .employees
        .find_by_key(&normalize_email(&payload.email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let stored = employee.password_hash.clone();
    let plain = payload.password;
    let matches = tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password check task failed: {e}")))?;
    if !matches {
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(employee_id = employee.id, "login succeeded");
    Ok(Json(ApiResponse::ok(
        "Login success",
        auth_response(&state, employee)?,
    )))
}

/// signup
///
/// [Public Route] Self-registration. The new employee always gets the configured default role.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid payload or unknown division"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Envelope<AuthResponse>), AppError> {
    payload.validate()?;

    let new = NewEmployee {
        fullname: payload.fullname,
        email: normalize_email(&payload.email),
        password_hash: password::hash_off_thread(payload.password).await?,
        role_id: state.config.default_role_id,
        division_id: payload.division_id,
    };
    let employee = state.employees.create(new).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Signup success",
            auth_response(&state, employee)?,
        )),
    ))
}

// --- Shared Resource Lifecycle ---

async fn list_resources<R: Resource>(
    service: &ResourceService<R>,
    policy: &AccessPolicy,
    user: &AuthUser,
    query: &PageQuery,
) -> Result<Envelope<Vec<R>>, AppError> {
    policy.enforce(user, Operation::new(R::KIND, Action::List), None)?;
    let window = Window::from_query(query)?;
    let page = service.find_all(&window).await?;
    Ok(Json(ApiResponse::page(
        format!("Get {}s success", R::KIND.as_str()),
        page.data,
        page.info,
    )))
}

async fn get_resource<R: Resource>(
    service: &ResourceService<R>,
    policy: &AccessPolicy,
    user: &AuthUser,
    id: i64,
) -> Result<Envelope<R>, AppError> {
    policy.enforce(user, Operation::new(R::KIND, Action::Read), Some(id))?;
    let entity = service.find_by_id(id).await?;
    Ok(Json(ApiResponse::ok(
        format!("Get {} success", R::KIND.as_str()),
        entity,
    )))
}

async fn delete_resource<R: Resource>(
    service: &ResourceService<R>,
    policy: &AccessPolicy,
    user: &AuthUser,
    id: i64,
) -> Result<Envelope<R>, AppError> {
    policy.enforce(user, Operation::new(R::KIND, Action::Delete), Some(id))?;
    let entity = service.delete_by_id(id).await?;
    Ok(Json(ApiResponse::ok(
        format!("Delete {} success", R::KIND.as_str()),
        entity,
    )))
}

async fn create_named<R: Resource<Create = NamedPayload>>(
    service: &ResourceService<R>,
    policy: &AccessPolicy,
    user: &AuthUser,
    payload: NamedPayload,
) -> Result<(StatusCode, Envelope<R>), AppError> {
    policy.enforce(user, Operation::new(R::KIND, Action::Create), None)?;
    payload.validate()?;
    let entity = service.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("Create {} success", R::KIND.as_str()),
            entity,
        )),
    ))
}

async fn update_named<R: Resource<Patch = NamedPatch>>(
    service: &ResourceService<R>,
    policy: &AccessPolicy,
    user: &AuthUser,
    id: i64,
    patch: NamedPatch,
) -> Result<Envelope<R>, AppError> {
    policy.enforce(user, Operation::new(R::KIND, Action::Update), Some(id))?;
    patch.validate()?;
    let entity = service.update_by_id(id, patch).await?;
    Ok(Json(ApiResponse::ok(
        format!("Update {} success", R::KIND.as_str()),
        entity,
    )))
}

// --- Employees ---

/// list_employees
///
/// [Authenticated Route] Paginated employee directory, searchable by full name or email.
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(PageQuery),
    responses(
        (status = 200, description = "Employee page", body = [Employee]),
        (status = 400, description = "Invalid pagination"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_employees(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Envelope<Vec<Employee>>, AppError> {
    list_resources(&state.employees, &state.policy, &user, &query).await
}

/// get_employee
///
/// [Authenticated Route] One active employee with its role and division.
#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 404, description = "Not found or deleted")
    )
)]
pub async fn get_employee(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<Employee>, AppError> {
    get_resource(&state.employees, &state.policy, &user, id).await
}

/// create_employee
///
/// [Admin Route] Creates an employee with an explicit role and division.
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Created", body = Employee),
        (status = 401, description = "Not an admin"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_employee(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Envelope<Employee>), AppError> {
    state.policy.enforce(
        &user,
        Operation::new(Employee::KIND, Action::Create),
        None,
    )?;
    payload.validate()?;

    let new = NewEmployee {
        fullname: payload.fullname,
        email: normalize_email(&payload.email),
        password_hash: password::hash_off_thread(payload.password).await?,
        role_id: payload.role_id,
        division_id: payload.division_id,
    };
    let employee = state.employees.create(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Create employee success", employee)),
    ))
}

/// update_employee
///
/// [Authenticated Route] Partial update. Admins may edit anyone; other employees only
/// themselves, and never their own role.
#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}",
    params(("id" = i64, Path, description = "Employee id")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Updated", body = Employee),
        (status = 401, description = "Not permitted"),
        (status = 404, description = "Not found or deleted"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_employee(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Envelope<Employee>, AppError> {
    state.policy.enforce(
        &user,
        Operation::new(Employee::KIND, Action::Update),
        Some(id),
    )?;
    if payload.role_id.is_some() && state.policy.role_of(&user) != AccessRole::Admin {
        tracing::debug!(user_id = user.id, "self-service role change denied");
        return Err(AppError::Unauthorized);
    }
    payload.validate()?;

    let password_hash = match payload.password {
        Some(plain) => Some(password::hash_off_thread(plain).await?),
        None => None,
    };
    let patch = EmployeePatch {
        fullname: payload.fullname,
        email: payload.email.as_deref().map(normalize_email),
        password_hash,
        role_id: payload.role_id,
        division_id: payload.division_id,
    };
    let employee = state.employees.update_by_id(id, patch).await?;
    Ok(Json(ApiResponse::ok("Update employee success", employee)))
}

/// delete_employee
///
/// [Authenticated Route] Soft delete. Admins may delete anyone; other employees only themselves.
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Deleted, with audit timestamps", body = Employee),
        (status = 401, description = "Not permitted"),
        (status = 404, description = "Not found or already deleted")
    )
)]
pub async fn delete_employee(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<Employee>, AppError> {
    delete_resource(&state.employees, &state.policy, &user, id).await
}

// --- Roles ---

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    params(PageQuery),
    responses((status = 200, description = "Role page", body = [Role]))
)]
pub async fn list_roles(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Envelope<Vec<Role>>, AppError> {
    list_resources(&state.roles, &state.policy, &user, &query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Not found or deleted")
    )
)]
pub async fn get_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<Role>, AppError> {
    get_resource(&state.roles, &state.policy, &user, id).await
}

/// create_role
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/v1/roles",
    request_body = NamedPayload,
    responses(
        (status = 201, description = "Created", body = Role),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_role(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NamedPayload>,
) -> Result<(StatusCode, Envelope<Role>), AppError> {
    create_named(&state.roles, &state.policy, &user, payload).await
}

/// update_role
///
/// [Admin Route]
#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    request_body = NamedPatch,
    responses((status = 200, description = "Updated", body = Role))
)]
pub async fn update_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<NamedPatch>,
) -> Result<Envelope<Role>, AppError> {
    update_named(&state.roles, &state.policy, &user, id, patch).await
}

/// delete_role
///
/// [Admin Route]
#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    responses((status = 200, description = "Deleted", body = Role))
)]
pub async fn delete_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<Role>, AppError> {
    delete_resource(&state.roles, &state.policy, &user, id).await
}

// --- Divisions ---

#[utoipa::path(
    get,
    path = "/api/v1/divisions",
    params(PageQuery),
    responses((status = 200, description = "Division page", body = [Division]))
)]
pub async fn list_divisions(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Envelope<Vec<Division>>, AppError> {
    list_resources(&state.divisions, &state.policy, &user, &query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/divisions/{id}",
    params(("id" = i64, Path, description = "Division id")),
    responses(
        (status = 200, description = "Division", body = Division),
        (status = 404, description = "Not found or deleted")
    )
)]
pub async fn get_division(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<Division>, AppError> {
    get_resource(&state.divisions, &state.policy, &user, id).await
}

/// create_division
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/v1/divisions",
    request_body = NamedPayload,
    responses(
        (status = 201, description = "Created", body = Division),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_division(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NamedPayload>,
) -> Result<(StatusCode, Envelope<Division>), AppError> {
    create_named(&state.divisions, &state.policy, &user, payload).await
}

/// update_division
///
/// [Admin Route]
#[utoipa::path(
    put,
    path = "/api/v1/divisions/{id}",
    params(("id" = i64, Path, description = "Division id")),
    request_body = NamedPatch,
    responses((status = 200, description = "Updated", body = Division))
)]
pub async fn update_division(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<NamedPatch>,
) -> Result<Envelope<Division>, AppError> {
    update_named(&state.divisions, &state.policy, &user, id, patch).await
}

/// delete_division
///
/// [Admin Route]
#[utoipa::path(
    delete,
    path = "/api/v1/divisions/{id}",
    params(("id" = i64, Path, description = "Division id")),
    responses((status = 200, description = "Deleted", body = Division))
)]
pub async fn delete_division(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<Division>, AppError> {
    delete_resource(&state.divisions, &state.policy, &user, id).await
}
