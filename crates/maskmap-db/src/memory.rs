//! In-process catalog backed by an ordered map.
//!
//! Used by tests and by the CLI's `--in-memory` mode. Ordering and tie-break
//! rules match [`crate::PgCatalogStore`].

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use maskmap_core::{Availability, Coordinate, NearbyStore, StoreRecord};

use crate::catalog::CatalogStore;
use crate::CatalogError;

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    stores: RwLock<BTreeMap<String, StoreRecord>>,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of one store, for inspection.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] if the map lock is poisoned.
    pub fn get(&self, store_id: &str) -> Result<Option<StoreRecord>, CatalogError> {
        Ok(self.read()?.get(store_id).cloned())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoreRecord>>, CatalogError> {
        self.stores
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoreRecord>>, CatalogError> {
        self.stores
            .write()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))
    }
}

impl CatalogStore for MemoryCatalogStore {
    async fn insert_many(&self, stores: &[StoreRecord]) -> Result<u64, CatalogError> {
        let mut map = self.write()?;
        let mut inserted = 0u64;
        for store in stores {
            if !map.contains_key(&store.id) {
                map.insert(store.id.clone(), store.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn delete_all_availability(&self) -> Result<u64, CatalogError> {
        let mut map = self.write()?;
        let mut cleared = 0u64;
        for store in map.values_mut() {
            if store.availability.take().is_some() {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn merge_availability(
        &self,
        store_id: &str,
        availability: &Availability,
    ) -> Result<bool, CatalogError> {
        let mut map = self.write()?;
        match map.get_mut(store_id) {
            Some(store) => {
                store.availability = Some(availability.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(self.read()?.is_empty())
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        Ok(self.read()?.len() as u64)
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, CatalogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let map = self.read()?;
        let mut nearby: Vec<NearbyStore> = map
            .values()
            .map(|store| NearbyStore {
                distance_km: origin.distance_km(&store.location),
                store: store.clone(),
            })
            .collect();
        drop(map);

        nearby.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.store.id.cmp(&b.store.id))
        });
        nearby.truncate(limit);
        Ok(nearby)
    }
}
