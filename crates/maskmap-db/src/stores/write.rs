//! Write operations for the `stores` table.

use maskmap_core::{Availability, StoreRecord};
use sqlx::PgPool;

/// Insert stores that are not yet in the catalog.
///
/// Uses a single `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT DO NOTHING`
/// so the whole snapshot is written in one round-trip and re-running a
/// bootstrap never overwrites an existing store. Returns the number of rows
/// inserted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub(super) async fn insert_stores(
    pool: &PgPool,
    stores: &[StoreRecord],
) -> Result<u64, sqlx::Error> {
    if stores.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut ids: Vec<String> = Vec::with_capacity(stores.len());
    let mut names: Vec<String> = Vec::with_capacity(stores.len());
    let mut addresses: Vec<String> = Vec::with_capacity(stores.len());
    let mut latitudes: Vec<f64> = Vec::with_capacity(stores.len());
    let mut longitudes: Vec<f64> = Vec::with_capacity(stores.len());
    let mut adult_counts: Vec<Option<i64>> = Vec::with_capacity(stores.len());
    let mut child_counts: Vec<Option<i64>> = Vec::with_capacity(stores.len());
    let mut updated_ats: Vec<Option<String>> = Vec::with_capacity(stores.len());

    for store in stores {
        ids.push(store.id.clone());
        names.push(store.name.clone());
        addresses.push(store.address.clone());
        latitudes.push(store.location.latitude());
        longitudes.push(store.location.longitude());
        let availability = store.availability.as_ref();
        adult_counts.push(availability.map(|a| i64::from(a.adult_mask_count)));
        child_counts.push(availability.map(|a| i64::from(a.child_mask_count)));
        updated_ats.push(availability.map(|a| a.updated_at.clone()));
    }

    let rows_affected = sqlx::query(
        "INSERT INTO stores \
             (id, name, address, latitude, longitude, \
              adult_mask_count, child_mask_count, availability_updated_at) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::float8[], $5::float8[], \
              $6::int8[], $7::int8[], $8::text[]) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&adult_counts)
    .bind(&child_counts)
    .bind(&updated_ats)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Null out availability on every store that has it.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub(super) async fn clear_all_availability(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let rows_affected = sqlx::query(
        "UPDATE stores \
         SET adult_mask_count = NULL, \
             child_mask_count = NULL, \
             availability_updated_at = NULL, \
             availability_synced_at = NULL \
         WHERE availability_updated_at IS NOT NULL",
    )
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Overwrite the availability of one store. Returns `false` if the id is not
/// in the catalog.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub(super) async fn update_availability(
    pool: &PgPool,
    store_id: &str,
    availability: &Availability,
) -> Result<bool, sqlx::Error> {
    let rows_affected = sqlx::query(
        "UPDATE stores \
         SET adult_mask_count = $2, \
             child_mask_count = $3, \
             availability_updated_at = $4, \
             availability_synced_at = NOW() \
         WHERE id = $1",
    )
    .bind(store_id)
    .bind(i64::from(availability.adult_mask_count))
    .bind(i64::from(availability.child_mask_count))
    .bind(&availability.updated_at)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}
