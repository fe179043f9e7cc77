//! Read operations for the `stores` table.

use maskmap_core::{Coordinate, EARTH_RADIUS_KM};
use sqlx::PgPool;

use super::types::StoreRow;

/// Return `true` if the catalog holds at least one store.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub(super) async fn any_store_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM stores)")
        .fetch_one(pool)
        .await
}

/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub(super) async fn count_stores(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stores")
        .fetch_one(pool)
        .await
}

/// Return the `limit` stores closest to `origin`.
///
/// Distance is the haversine great-circle distance in kilometres, the same
/// formula as [`maskmap_core::haversine_km`], with the Earth radius bound as a
/// parameter so both sides share one constant. Ties are broken by `id` under
/// the `"C"` collation so ordering is bytewise, independent of the database
/// locale.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub(super) async fn list_nearest_stores(
    pool: &PgPool,
    origin: Coordinate,
    limit: i64,
) -> Result<Vec<StoreRow>, sqlx::Error> {
    sqlx::query_as::<_, StoreRow>(
        "SELECT id, name, address, latitude, longitude, \
                adult_mask_count, child_mask_count, availability_updated_at, \
                2 * $3::float8 * ASIN(LEAST(1.0, SQRT( \
                    POWER(SIN(RADIANS(latitude - $1::float8) / 2), 2) \
                  + COS(RADIANS($1::float8)) * COS(RADIANS(latitude)) \
                  * POWER(SIN(RADIANS(longitude - $2::float8) / 2), 2) \
                ))) AS distance_km \
         FROM stores \
         ORDER BY distance_km ASC, id COLLATE \"C\" ASC \
         LIMIT $4",
    )
    .bind(origin.latitude())
    .bind(origin.longitude())
    .bind(EARTH_RADIUS_KM)
    .bind(limit)
    .fetch_all(pool)
    .await
}
