//! Nearest-store lookups against the catalog.

use maskmap_core::{Coordinate, NearbyStore};
use maskmap_db::CatalogStore;

use crate::catalog::Catalog;
use crate::error::QueryError;

/// Read-only view of the catalog. Never takes the write gate, so queries run
/// concurrently with a sync and observe either side of each individual write.
pub struct NearestStoreQuery<S> {
    catalog: Catalog<S>,
}

impl<S> Clone for NearestStoreQuery<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
        }
    }
}

impl<S: CatalogStore> NearestStoreQuery<S> {
    #[must_use]
    pub fn new(catalog: Catalog<S>) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    /// Returns up to `limit` stores ordered by ascending distance from
    /// `origin`, ties broken by ascending store id.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Storage`] if the catalog cannot be read.
    pub async fn nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, QueryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stores = self.catalog.store().query_nearest(origin, limit).await?;
        tracing::debug!(%origin, limit, returned = stores.len(), "nearest-store query");
        Ok(stores)
    }
}
