//! In-memory implementation of the directory store.
//!
//! Backs local development and the test suite. Each table is a `BTreeMap` keyed by id behind a
//! `tokio::sync::RwLock`, so iteration order is id order. Uniqueness and reference checks run
//! under the same write lock as the mutation they guard, which makes them a real backstop
//! against racing creates.
//!
//! Every mutation happens within a single lock acquisition with no await in between, so a
//! cancelled call either fully applies or does not run.
//!
//! Lock order, when more than one table is needed: employees, roles, divisions.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::ResourceStore;
use crate::{
    error::{StoreError, StoreResult},
    models::{
        Division, Employee, EmployeePatch, NamedRef, NamedResource, NewEmployee, Resource, Role,
        Timestamps,
    },
    pagination::{Window, matches_search},
};

/// One table: rows by id plus the next id to hand out. Ids are never reused.
#[derive(Debug)]
pub struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Resource> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn active(&self) -> impl Iterator<Item = &T> {
        self.rows.values().filter(|row| row.timestamps().is_active())
    }

    fn active_by_id(&self, id: i64) -> Option<&T> {
        self.rows.get(&id).filter(|row| row.timestamps().is_active())
    }

    fn active_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows
            .get_mut(&id)
            .filter(|row| row.timestamps().is_active())
    }

    /// True if an active row other than `except` already holds `key`.
    fn key_taken(&self, key: &str, except: Option<i64>) -> bool {
        self.active()
            .any(|row| row.natural_key() == key && Some(row.id()) != except)
    }
}

/// InMemoryStore
///
/// Non-durable store for all three resource types. Cheap to construct; state is lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    employees: RwLock<Table<Employee>>,
    roles: RwLock<Table<Role>>,
    divisions: RwLock<Table<Division>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Gives the generic Role/Division implementation access to the matching table.
pub trait MemoryTable: NamedResource {
    fn table(store: &InMemoryStore) -> &RwLock<Table<Self>>;
}

impl MemoryTable for Role {
    fn table(store: &InMemoryStore) -> &RwLock<Table<Self>> {
        &store.roles
    }
}

impl MemoryTable for Division {
    fn table(store: &InMemoryStore) -> &RwLock<Table<Self>> {
        &store.divisions
    }
}

fn not_found(kind: &str, id: i64) -> StoreError {
    StoreError::NotFound(format!("{kind} {id}"))
}

fn conflict(kind: &str, key: &str) -> StoreError {
    StoreError::Conflict(format!("{kind} {key:?} already exists"))
}

#[async_trait]
impl<R: MemoryTable> ResourceStore<R> for InMemoryStore {
    async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let table = R::table(self).read().await;
        let count = table
            .active()
            .filter(|row| search.is_none_or(|needle| matches_search(needle, row.natural_key())))
            .count();
        Ok(count as u64)
    }

    async fn find_page(&self, window: &Window) -> StoreResult<Vec<R>> {
        let table = R::table(self).read().await;
        let rows = table
            .active()
            .filter(|row| {
                window
                    .search()
                    .is_none_or(|needle| matches_search(needle, row.natural_key()))
            })
            .skip(usize::try_from(window.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit()).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<R>> {
        Ok(R::table(self).read().await.active_by_id(id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<R>> {
        let table = R::table(self).read().await;
        Ok(table.active().find(|row| row.natural_key() == key).cloned())
    }

    async fn insert(&self, new: R::Create, now: DateTime<Utc>) -> StoreResult<R> {
        let mut table = R::table(self).write().await;
        if table.key_taken(&new.name, None) {
            return Err(conflict(R::KIND.as_str(), &new.name));
        }
        let id = table.allocate_id();
        let row = R::from_parts(id, new.name, Timestamps::new(now));
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, patch: R::Patch, now: DateTime<Utc>) -> StoreResult<R> {
        let mut table = R::table(self).write().await;
        if let Some(name) = patch.name.as_deref() {
            if table.key_taken(name, Some(id)) {
                return Err(conflict(R::KIND.as_str(), name));
            }
        }
        let row = table
            .active_mut(id)
            .ok_or_else(|| not_found(R::KIND.as_str(), id))?;
        if let Some(name) = patch.name {
            row.set_name(name);
        }
        row.timestamps_mut().updated_at = now;
        Ok(row.clone())
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> StoreResult<R> {
        let mut table = R::table(self).write().await;
        let row = table
            .active_mut(id)
            .ok_or_else(|| not_found(R::KIND.as_str(), id))?;
        row.timestamps_mut().deleted_at = Some(now);
        Ok(row.clone())
    }
}

// --- Employees ---

fn employee_matches(needle: &str, employee: &Employee) -> bool {
    matches_search(needle, &employee.fullname) || matches_search(needle, &employee.email)
}

fn named_ref<T: NamedResource>(table: &Table<T>, id: i64) -> Option<NamedRef> {
    table.rows.get(&id).map(|row| NamedRef {
        id: row.id(),
        name: row.natural_key().to_string(),
    })
}

/// Fills the denormalized role and division of an employee row.
fn with_refs(
    mut employee: Employee,
    roles: &Table<Role>,
    divisions: &Table<Division>,
) -> Employee {
    employee.role = named_ref(roles, employee.role_id);
    employee.division = named_ref(divisions, employee.division_id);
    employee
}

fn check_references(
    roles: &Table<Role>,
    divisions: &Table<Division>,
    role_id: Option<i64>,
    division_id: Option<i64>,
) -> StoreResult<()> {
    if let Some(role_id) = role_id {
        if roles.active_by_id(role_id).is_none() {
            return Err(StoreError::InvalidReference(format!(
                "role {role_id} does not exist"
            )));
        }
    }
    if let Some(division_id) = division_id {
        if divisions.active_by_id(division_id).is_none() {
            return Err(StoreError::InvalidReference(format!(
                "division {division_id} does not exist"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ResourceStore<Employee> for InMemoryStore {
    async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let employees = self.employees.read().await;
        let count = employees
            .active()
            .filter(|e| search.is_none_or(|needle| employee_matches(needle, e)))
            .count();
        Ok(count as u64)
    }

    async fn find_page(&self, window: &Window) -> StoreResult<Vec<Employee>> {
        let employees = self.employees.read().await;
        let roles = self.roles.read().await;
        let divisions = self.divisions.read().await;
        let rows = employees
            .active()
            .filter(|e| window.search().is_none_or(|needle| employee_matches(needle, e)))
            .skip(usize::try_from(window.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit()).unwrap_or(usize::MAX))
            .map(|e| with_refs(e.clone(), &roles, &divisions))
            .collect();
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Employee>> {
        let employees = self.employees.read().await;
        let roles = self.roles.read().await;
        let divisions = self.divisions.read().await;
        Ok(employees
            .active_by_id(id)
            .map(|e| with_refs(e.clone(), &roles, &divisions)))
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Employee>> {
        let employees = self.employees.read().await;
        let roles = self.roles.read().await;
        let divisions = self.divisions.read().await;
        Ok(employees
            .active()
            .find(|e| e.email == key)
            .map(|e| with_refs(e.clone(), &roles, &divisions)))
    }

    async fn insert(&self, new: NewEmployee, now: DateTime<Utc>) -> StoreResult<Employee> {
        let mut employees = self.employees.write().await;
        let roles = self.roles.read().await;
        let divisions = self.divisions.read().await;

        if employees.key_taken(&new.email, None) {
            return Err(conflict("employee", &new.email));
        }
        check_references(&roles, &divisions, Some(new.role_id), Some(new.division_id))?;

        let id = employees.allocate_id();
        let row = Employee {
            id,
            fullname: new.fullname,
            email: new.email,
            password_hash: new.password_hash,
            role_id: new.role_id,
            division_id: new.division_id,
            role: None,
            division: None,
            timestamps: Timestamps::new(now),
        };
        employees.rows.insert(id, row.clone());
        Ok(with_refs(row, &roles, &divisions))
    }

    async fn update(
        &self,
        id: i64,
        patch: EmployeePatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        let mut employees = self.employees.write().await;
        let roles = self.roles.read().await;
        let divisions = self.divisions.read().await;

        if employees.active_by_id(id).is_none() {
            return Err(not_found("employee", id));
        }
        if let Some(email) = patch.email.as_deref() {
            if employees.key_taken(email, Some(id)) {
                return Err(conflict("employee", email));
            }
        }
        check_references(&roles, &divisions, patch.role_id, patch.division_id)?;

        let row = employees
            .active_mut(id)
            .ok_or_else(|| not_found("employee", id))?;
        if let Some(fullname) = patch.fullname {
            row.fullname = fullname;
        }
        if let Some(email) = patch.email {
            row.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            row.password_hash = password_hash;
        }
        if let Some(role_id) = patch.role_id {
            row.role_id = role_id;
        }
        if let Some(division_id) = patch.division_id {
            row.division_id = division_id;
        }
        row.timestamps.updated_at = now;
        Ok(with_refs(row.clone(), &roles, &divisions))
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> StoreResult<Employee> {
        let mut employees = self.employees.write().await;
        let roles = self.roles.read().await;
        let divisions = self.divisions.read().await;

        let row = employees
            .active_mut(id)
            .ok_or_else(|| not_found("employee", id))?;
        row.timestamps.deleted_at = Some(now);
        Ok(with_refs(row.clone(), &roles, &divisions))
    }
}
