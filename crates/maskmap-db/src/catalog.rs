//! The storage contract the sync and query pipeline is written against.

use std::future::Future;

use maskmap_core::{Availability, Coordinate, NearbyStore, StoreRecord};

use crate::CatalogError;

/// Persisted collection of stores with a nearest-store query primitive.
///
/// Implementations own the records; callers read and write only through
/// these methods. Spatial ordering lives here rather than in the caller so
/// that the pipeline does not depend on a particular storage engine.
pub trait CatalogStore: Send + Sync + 'static {
    /// Inserts stores whose id is not already present.
    ///
    /// Returns the number of rows actually inserted; existing ids are left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on storage failure.
    fn insert_many(
        &self,
        stores: &[StoreRecord],
    ) -> impl Future<Output = Result<u64, CatalogError>> + Send;

    /// Clears the availability of every store.
    ///
    /// Returns the number of stores that had availability before the wipe.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on storage failure.
    fn delete_all_availability(&self) -> impl Future<Output = Result<u64, CatalogError>> + Send;

    /// Replaces the availability of `store_id`.
    ///
    /// Returns `false` when no store with that id exists; nothing is inserted
    /// in that case.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on storage failure.
    fn merge_availability(
        &self,
        store_id: &str,
        availability: &Availability,
    ) -> impl Future<Output = Result<bool, CatalogError>> + Send;

    /// # Errors
    ///
    /// Returns [`CatalogError`] on storage failure.
    fn is_empty(&self) -> impl Future<Output = Result<bool, CatalogError>> + Send;

    /// # Errors
    ///
    /// Returns [`CatalogError`] on storage failure.
    fn count(&self) -> impl Future<Output = Result<u64, CatalogError>> + Send;

    /// Returns at most `limit` stores ordered by ascending great-circle
    /// distance from `origin`, ties broken by ascending id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on storage failure.
    fn query_nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<NearbyStore>, CatalogError>> + Send;
}
