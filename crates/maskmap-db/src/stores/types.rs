//! Row types for the `stores` table.

use maskmap_core::{Availability, Coordinate, NearbyStore, StoreRecord};

use crate::CatalogError;

/// A row from the `stores` table as returned by the nearest-store query.
///
/// The availability columns are written together, so they are either all
/// `NULL` (never synced, or wiped) or all set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub adult_mask_count: Option<i64>,
    pub child_mask_count: Option<i64>,
    pub availability_updated_at: Option<String>,
    pub distance_km: f64,
}

impl StoreRow {
    fn corrupt(&self, reason: impl Into<String>) -> CatalogError {
        CatalogError::CorruptRow {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }

    fn availability(&self) -> Result<Option<Availability>, CatalogError> {
        match (
            self.adult_mask_count,
            self.child_mask_count,
            &self.availability_updated_at,
        ) {
            (Some(adult), Some(child), Some(updated_at)) => {
                let adult_mask_count = u32::try_from(adult)
                    .map_err(|_| self.corrupt(format!("adult_mask_count {adult} out of range")))?;
                let child_mask_count = u32::try_from(child)
                    .map_err(|_| self.corrupt(format!("child_mask_count {child} out of range")))?;
                Ok(Some(Availability {
                    adult_mask_count,
                    child_mask_count,
                    updated_at: updated_at.clone(),
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(self.corrupt("availability columns are partially set")),
        }
    }
}

impl TryFrom<StoreRow> for NearbyStore {
    type Error = CatalogError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let location = Coordinate::new(row.latitude, row.longitude)
            .map_err(|e| row.corrupt(e.to_string()))?;
        let availability = row.availability()?;
        Ok(NearbyStore {
            distance_km: row.distance_km,
            store: StoreRecord {
                id: row.id,
                name: row.name,
                address: row.address,
                location,
                availability,
            },
        })
    }
}
