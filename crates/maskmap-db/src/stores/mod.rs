//! Postgres-backed catalog over the `stores` table.

mod read;
mod types;
mod write;

use maskmap_core::{Availability, Coordinate, NearbyStore, StoreRecord};
use sqlx::PgPool;

use crate::catalog::CatalogStore;
use crate::CatalogError;

pub use types::StoreRow;

/// [`CatalogStore`] implementation on a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogStore for PgCatalogStore {
    async fn insert_many(&self, stores: &[StoreRecord]) -> Result<u64, CatalogError> {
        let inserted = write::insert_stores(&self.pool, stores).await?;
        tracing::debug!(offered = stores.len(), inserted, "stores inserted");
        Ok(inserted)
    }

    async fn delete_all_availability(&self) -> Result<u64, CatalogError> {
        Ok(write::clear_all_availability(&self.pool).await?)
    }

    async fn merge_availability(
        &self,
        store_id: &str,
        availability: &Availability,
    ) -> Result<bool, CatalogError> {
        Ok(write::update_availability(&self.pool, store_id, availability).await?)
    }

    async fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(!read::any_store_exists(&self.pool).await?)
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        let count = read::count_stores(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, CatalogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        read::list_nearest_stores(&self.pool, origin, limit)
            .await?
            .into_iter()
            .map(NearbyStore::try_from)
            .collect()
    }
}
