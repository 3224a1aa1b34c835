use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, postgres::PgRow, query_builder::QueryBuilder};

use super::ResourceStore;
use crate::{
    error::{StoreError, StoreResult},
    models::{Employee, EmployeePatch, NamedRef, NamedResource, NewEmployee, Timestamps},
    pagination::Window,
};

/// PostgresStore
///
/// `ResourceStore` backed by PostgreSQL. Natural-key uniqueness is enforced by partial unique
/// indexes (`WHERE deleted_at IS NULL`), so a soft-deleted key can be reused and a racing
/// duplicate insert surfaces as `StoreError::Conflict`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Escapes LIKE metacharacters and wraps the term for a "contains" match.
/// Used together with `ESCAPE '\'`.
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn not_found(kind: &str, id: i64) -> StoreError {
    StoreError::NotFound(format!("{kind} {id}"))
}

// --- Roles & Divisions ---

fn push_named_filter(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(search) = search {
        builder.push(" AND LOWER(name) LIKE ");
        builder.push_bind(like_pattern(search));
        builder.push(" ESCAPE '\\'");
    }
}

#[async_trait]
impl<R> ResourceStore<R> for PostgresStore
where
    R: NamedResource + for<'r> FromRow<'r, PgRow> + Unpin,
{
    async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL",
            R::TABLE
        ));
        push_named_filter(&mut builder, search);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn find_page(&self, window: &Window) -> StoreResult<Vec<R>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT id, name, created_at, updated_at, deleted_at FROM {} WHERE deleted_at IS NULL",
            R::TABLE
        ));
        push_named_filter(&mut builder, window.search());
        builder.push(" ORDER BY id LIMIT ");
        builder.push_bind(to_i64(window.limit()));
        builder.push(" OFFSET ");
        builder.push_bind(to_i64(window.offset()));

        Ok(builder.build_query_as::<R>().fetch_all(&self.pool).await?)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<R>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at, deleted_at FROM {} \
             WHERE id = $1 AND deleted_at IS NULL",
            R::TABLE
        );
        Ok(sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<R>> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at, deleted_at FROM {} \
             WHERE name = $1 AND deleted_at IS NULL",
            R::TABLE
        );
        Ok(sqlx::query_as::<_, R>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, new: R::Create, now: DateTime<Utc>) -> StoreResult<R> {
        let sql = format!(
            "INSERT INTO {} (name, created_at, updated_at) VALUES ($1, $2, $2) \
             RETURNING id, name, created_at, updated_at, deleted_at",
            R::TABLE
        );
        Ok(sqlx::query_as::<_, R>(&sql)
            .bind(new.name)
            .bind(now)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: i64, patch: R::Patch, now: DateTime<Utc>) -> StoreResult<R> {
        // COALESCE keeps the current value for fields absent from the patch.
        let sql = format!(
            "UPDATE {} SET name = COALESCE($2, name), updated_at = $3 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, name, created_at, updated_at, deleted_at",
            R::TABLE
        );
        sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(R::KIND.as_str(), id))
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> StoreResult<R> {
        let sql = format!(
            "UPDATE {} SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, name, created_at, updated_at, deleted_at",
            R::TABLE
        );
        sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(R::KIND.as_str(), id))
    }
}

// --- Employees ---

/// Flat employee row as selected with its role and division joined in.
#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: i64,
    fullname: String,
    email: String,
    password_hash: String,
    role_id: i64,
    division_id: i64,
    role_name: Option<String>,
    division_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            fullname: row.fullname,
            email: row.email,
            password_hash: row.password_hash,
            role_id: row.role_id,
            division_id: row.division_id,
            role: row.role_name.map(|name| NamedRef {
                id: row.role_id,
                name,
            }),
            division: row.division_name.map(|name| NamedRef {
                id: row.division_id,
                name,
            }),
            timestamps: Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
                deleted_at: row.deleted_at,
            },
        }
    }
}

const EMPLOYEE_COLUMNS: &str = "e.id, e.fullname, e.email, e.password_hash, e.role_id, \
     e.division_id, r.name AS role_name, d.name AS division_name, \
     e.created_at, e.updated_at, e.deleted_at";

const EMPLOYEE_JOINS: &str =
    "LEFT JOIN roles r ON r.id = e.role_id LEFT JOIN divisions d ON d.id = e.division_id";

fn push_employee_filter(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(search) = search {
        let pattern = like_pattern(search);
        builder.push(" AND (LOWER(e.fullname) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR LOWER(e.email) LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
}

/// Wraps a data-modifying statement aliased `e` in a CTE and joins the denormalized names.
fn employee_cte(statement: &str) -> String {
    format!("WITH e AS ({statement}) SELECT {EMPLOYEE_COLUMNS} FROM e {EMPLOYEE_JOINS}")
}

#[async_trait]
impl ResourceStore<Employee> for PostgresStore {
    async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM employees e WHERE e.deleted_at IS NULL");
        push_employee_filter(&mut builder, search);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn find_page(&self, window: &Window) -> StoreResult<Vec<Employee>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees e {EMPLOYEE_JOINS} WHERE e.deleted_at IS NULL"
        ));
        push_employee_filter(&mut builder, window.search());
        builder.push(" ORDER BY e.id LIMIT ");
        builder.push_bind(to_i64(window.limit()));
        builder.push(" OFFSET ");
        builder.push_bind(to_i64(window.offset()));

        let rows = builder
            .build_query_as::<EmployeeRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Employee>> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees e {EMPLOYEE_JOINS} \
             WHERE e.id = $1 AND e.deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Employee>> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees e {EMPLOYEE_JOINS} \
             WHERE e.email = $1 AND e.deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn insert(&self, new: NewEmployee, now: DateTime<Utc>) -> StoreResult<Employee> {
        let sql = employee_cte(
            "INSERT INTO employees \
             (fullname, email, password_hash, role_id, division_id, created_at, updated_at) \
             SELECT $1, $2, $3, $4, $5, $6, $6 \
             WHERE EXISTS (SELECT 1 FROM roles WHERE id = $4 AND deleted_at IS NULL) \
               AND EXISTS (SELECT 1 FROM divisions WHERE id = $5 AND deleted_at IS NULL) \
             RETURNING *",
        );
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(new.fullname)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.role_id)
            .bind(new.division_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::from)
            .ok_or_else(|| {
                StoreError::InvalidReference(format!(
                    "role {} or division {} does not exist",
                    new.role_id, new.division_id
                ))
            })
    }

    async fn update(
        &self,
        id: i64,
        patch: EmployeePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        let sql = employee_cte(
            "UPDATE employees SET \
                fullname = COALESCE($2, fullname), \
                email = COALESCE($3, email), \
                password_hash = COALESCE($4, password_hash), \
                role_id = COALESCE($5, role_id), \
                division_id = COALESCE($6, division_id), \
                updated_at = $7 \
             WHERE id = $1 AND deleted_at IS NULL \
               AND ($5::BIGINT IS NULL OR EXISTS \
                    (SELECT 1 FROM roles WHERE id = $5 AND deleted_at IS NULL)) \
               AND ($6::BIGINT IS NULL OR EXISTS \
                    (SELECT 1 FROM divisions WHERE id = $6 AND deleted_at IS NULL)) \
             RETURNING *",
        );
        let (role_id, division_id) = (patch.role_id, patch.division_id);
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .bind(patch.fullname)
            .bind(patch.email)
            .bind(patch.password_hash)
            .bind(role_id)
            .bind(division_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = row {
            return Ok(row.into());
        }

        // No row: either the employee is gone or a reference failed the guard.
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM employees WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            Err(StoreError::InvalidReference(format!(
                "role {role_id:?} or division {division_id:?} does not exist"
            )))
        } else {
            Err(not_found("employee", id))
        }
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> StoreResult<Employee> {
        let sql = employee_cte(
            "UPDATE employees SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        );
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::from)
            .ok_or_else(|| not_found("employee", id))
    }
}
