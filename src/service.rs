use crate::{
    clock::ClockState,
    error::{AppError, StoreError},
    models::Resource,
    pagination::{Paginated, Window},
    repository::StoreState,
};

/// ResourceService
///
/// The uniform CRUD lifecycle shared by employees, roles and divisions:
/// `Active --update--> Active`, `Active --delete--> Deleted` (terminal).
///
/// Holds no locks across store calls. The natural-key pre-check in `create` and `update_by_id`
/// and the following write are separate store operations, so a racing write can still pass the
/// pre-check; the store's own uniqueness enforcement then surfaces as `Duplicate`.
pub struct ResourceService<R: Resource> {
    store: StoreState<R>,
    clock: ClockState,
}

impl<R: Resource> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<R: Resource> ResourceService<R> {
    pub fn new(store: StoreState<R>, clock: ClockState) -> Self {
        Self { store, clock }
    }

    /// find_all
    ///
    /// One window of active rows plus the metadata computed from the total matching count.
    pub async fn find_all(&self, window: &Window) -> Result<Paginated<R>, AppError> {
        let total = self
            .store
            .count(window.search())
            .await
            .map_err(store_failure::<R>)?;
        let data = self
            .store
            .find_page(window)
            .await
            .map_err(store_failure::<R>)?;

        Ok(Paginated {
            data,
            info: window.page_info(total),
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<R, AppError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(store_failure::<R>)?
            .ok_or(AppError::NotFound)
    }

    /// Active row holding the given natural key, if any.
    pub async fn find_by_key(&self, key: &str) -> Result<Option<R>, AppError> {
        self.store.find_by_key(key).await.map_err(store_failure::<R>)
    }

    /// create
    ///
    /// Rejects a natural key already held by an active row with `Duplicate`, without writing.
    pub async fn create(&self, new: R::Create) -> Result<R, AppError> {
        let key = R::create_key(&new);
        if self.find_by_key(key).await?.is_some() {
            return Err(AppError::Duplicate(format!(
                "{} {key:?} already exists",
                R::KIND.as_str()
            )));
        }

        let created = self
            .store
            .insert(new, self.clock.now())
            .await
            .map_err(store_failure::<R>)?;
        tracing::info!(kind = R::KIND.as_str(), id = created.id(), "created");
        Ok(created)
    }

    /// update_by_id
    ///
    /// Applies only the fields set in `patch` and returns the reloaded row, associations included.
    pub async fn update_by_id(&self, id: i64, patch: R::Patch) -> Result<R, AppError> {
        self.find_by_id(id).await?;

        if let Some(key) = R::patch_key(&patch) {
            if let Some(holder) = self.find_by_key(key).await? {
                if holder.id() != id {
                    return Err(AppError::Duplicate(format!(
                        "{} {key:?} already exists",
                        R::KIND.as_str()
                    )));
                }
            }
        }

        let updated = self
            .store
            .update(id, patch, self.clock.now())
            .await
            .map_err(store_failure::<R>)?;
        tracing::info!(kind = R::KIND.as_str(), id, "updated");
        Ok(updated)
    }

    /// delete_by_id
    ///
    /// Soft-deletes the row and returns it with its audit timestamps.
    pub async fn delete_by_id(&self, id: i64) -> Result<R, AppError> {
        self.find_by_id(id).await?;

        let deleted = self
            .store
            .soft_delete(id, self.clock.now())
            .await
            .map_err(store_failure::<R>)?;
        tracing::info!(kind = R::KIND.as_str(), id, "deleted");
        Ok(deleted)
    }
}

fn store_failure<R: Resource>(err: StoreError) -> AppError {
    // Internal failures are logged once, when the response is rendered.
    if let StoreError::Conflict(detail) = &err {
        tracing::debug!(kind = R::KIND.as_str(), "store rejected duplicate: {detail}");
    }
    AppError::from(err)
}
