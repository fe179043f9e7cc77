//! Display-side capping and memoization of nearest-store results.

use std::sync::{Arc, Mutex, PoisonError};

use maskmap_core::{AppConfig, Availability, Coordinate, NearbyStore};
use maskmap_db::CatalogStore;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::QueryError;
use crate::query::NearestStoreQuery;

/// Combined adult and child count below which a store is shown as low.
pub const LOW_STOCK_THRESHOLD: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// No sync has reported this store.
    Unknown,
    Empty,
    Low,
    Available,
}

impl StockLevel {
    #[must_use]
    pub fn from_availability(availability: Option<&Availability>) -> Self {
        let Some(a) = availability else {
            return StockLevel::Unknown;
        };
        let total = u64::from(a.adult_mask_count) + u64::from(a.child_mask_count);
        if total == 0 {
            StockLevel::Empty
        } else if total < u64::from(LOW_STOCK_THRESHOLD) {
            StockLevel::Low
        } else {
            StockLevel::Available
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockLevel::Unknown => "unknown",
            StockLevel::Empty => "empty",
            StockLevel::Low => "low",
            StockLevel::Available => "available",
        }
    }
}

impl std::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store ready to be drawn on a map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub adult_mask_count: Option<u32>,
    pub child_mask_count: Option<u32>,
    pub updated_at: Option<String>,
    pub distance_km: f64,
    pub stock: StockLevel,
}

impl From<NearbyStore> for Marker {
    fn from(nearby: NearbyStore) -> Self {
        let store = nearby.store;
        let stock = StockLevel::from_availability(store.availability.as_ref());
        let (adult, child, updated_at) = match store.availability {
            Some(a) => (
                Some(a.adult_mask_count),
                Some(a.child_mask_count),
                Some(a.updated_at),
            ),
            None => (None, None, None),
        };
        Marker {
            id: store.id,
            name: store.name,
            address: store.address,
            latitude: store.location.latitude(),
            longitude: store.location.longitude(),
            adult_mask_count: adult,
            child_mask_count: child,
            updated_at,
            distance_km: nearby.distance_km,
            stock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    lat_bucket: i64,
    lon_bucket: i64,
    generation: u64,
}

struct Memo {
    key: CacheKey,
    markers: Arc<[Marker]>,
}

/// Caps nearest-store results at `max_marker_amount` and remembers the last
/// set computed.
///
/// The memo is keyed by the query point's grid cell and the catalog
/// generation, so any completed sync or bootstrap makes it miss.
pub struct MarkerCache<S> {
    query: NearestStoreQuery<S>,
    max_marker_amount: usize,
    bucket_degrees: f64,
    memo: Mutex<Option<Memo>>,
}

impl<S: CatalogStore> MarkerCache<S> {
    /// `bucket_degrees` must be finite and positive; anything else disables
    /// memoization.
    #[must_use]
    pub fn new(catalog: Catalog<S>, max_marker_amount: usize, bucket_degrees: f64) -> Self {
        Self {
            query: NearestStoreQuery::new(catalog),
            max_marker_amount,
            bucket_degrees,
            memo: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_config(catalog: Catalog<S>, config: &AppConfig) -> Self {
        Self::new(
            catalog,
            config.max_marker_amount,
            config.marker_bucket_degrees,
        )
    }

    #[must_use]
    pub fn max_marker_amount(&self) -> usize {
        self.max_marker_amount
    }

    /// Markers for the stores nearest `point`, at most `max_marker_amount`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Storage`] if the catalog cannot be read.
    pub async fn get_markers(&self, point: Coordinate) -> Result<Arc<[Marker]>, QueryError> {
        // Read before querying: a sync landing mid-query leaves the memo
        // keyed to the old generation, so the next lookup recomputes.
        let generation = self.query.catalog().generation();
        let key = self.key_for(point, generation);

        if let Some(key) = key {
            if let Some(markers) = self.lookup(key) {
                tracing::debug!(%point, "marker cache hit");
                return Ok(markers);
            }
        }

        let mut markers: Vec<Marker> = self
            .query
            .nearest(point, self.max_marker_amount)
            .await?
            .into_iter()
            .map(Marker::from)
            .collect();
        markers.truncate(self.max_marker_amount);
        let markers: Arc<[Marker]> = markers.into();
        tracing::debug!(%point, markers = markers.len(), generation, "marker cache miss");

        if let Some(key) = key {
            *self.lock_memo() = Some(Memo {
                key,
                markers: Arc::clone(&markers),
            });
        }
        Ok(markers)
    }

    /// Drops the memoized marker set.
    pub fn invalidate(&self) {
        *self.lock_memo() = None;
    }

    fn lookup(&self, key: CacheKey) -> Option<Arc<[Marker]>> {
        self.lock_memo()
            .as_ref()
            .filter(|memo| memo.key == key)
            .map(|memo| Arc::clone(&memo.markers))
    }

    // The memo is only ever replaced wholesale, so a poisoned lock still holds
    // a consistent value.
    fn lock_memo(&self) -> std::sync::MutexGuard<'_, Option<Memo>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Buckets so fine that the index leaves `i64` range would saturate and
    // alias distant points, so those lookups go unmemoized.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn key_for(&self, point: Coordinate, generation: u64) -> Option<CacheKey> {
        if !(self.bucket_degrees.is_finite() && self.bucket_degrees > 0.0) {
            return None;
        }
        let bucket = |degrees: f64| {
            let index = (degrees / self.bucket_degrees).floor();
            (index.is_finite() && index.abs() < i64::MAX as f64).then_some(index as i64)
        };
        Some(CacheKey {
            lat_bucket: bucket(point.latitude())?,
            lon_bucket: bucket(point.longitude())?,
            generation,
        })
    }
}

#[cfg(test)]
#[path = "marker_cache_test.rs"]
mod tests;
