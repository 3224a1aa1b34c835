use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    error::StoreResult,
    models::{Division, Employee, Resource, Role},
    pagination::Window,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// ResourceStore
///
/// Persistence contract for one resource type. Every read is scoped to active
/// (not soft-deleted) rows, and `search` is an already lower-cased substring filter.
///
/// `insert` and `update` must enforce natural-key uniqueness among active rows themselves;
/// the orchestrator's pre-check is not a lock and two racing creates can both pass it.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Number of active rows matching the optional filter.
    async fn count(&self, search: Option<&str>) -> StoreResult<u64>;

    /// One window of active rows, ordered by id.
    async fn find_page(&self, window: &Window) -> StoreResult<Vec<R>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<R>>;

    /// Active row holding the given natural key, if any.
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<R>>;

    /// Inserts a new row stamped with `now`. `Conflict` on a natural-key collision.
    async fn insert(&self, new: R::Create, now: DateTime<Utc>) -> StoreResult<R>;

    /// Applies the set fields of `patch` and returns the reloaded row.
    /// `NotFound` when the row is absent or soft-deleted.
    async fn update(&self, id: i64, patch: R::Patch, now: DateTime<Utc>) -> StoreResult<R>;

    /// Marks the row deleted at `now` and returns it. `NotFound` when already gone.
    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> StoreResult<R>;
}

/// Shared handle to a store for one resource type.
pub type StoreState<R> = Arc<dyn ResourceStore<R>>;

/// Stores
///
/// The three per-resource handles, usually backed by the same underlying store.
#[derive(Clone)]
pub struct Stores {
    pub employees: StoreState<Employee>,
    pub roles: StoreState<Role>,
    pub divisions: StoreState<Division>,
}

impl Stores {
    /// Uses one backend for all three resource types.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ResourceStore<Employee> + ResourceStore<Role> + ResourceStore<Division> + 'static,
    {
        Self {
            employees: backend.clone(),
            roles: backend.clone(),
            divisions: backend,
        }
    }
}
