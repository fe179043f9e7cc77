use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One row of the remote availability feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// Joins to [`StoreRecord::id`].
    pub store_id: String,
    pub adult_mask_count: u32,
    pub child_mask_count: u32,
    /// Source-provided timestamp, stored verbatim.
    pub updated_at: String,
}

impl AvailabilityRecord {
    #[must_use]
    pub fn availability(&self) -> Availability {
        Availability {
            adult_mask_count: self.adult_mask_count,
            child_mask_count: self.child_mask_count,
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Latest known stock for a store, merged in by a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub adult_mask_count: u32,
    pub child_mask_count: u32,
    pub updated_at: String,
}

/// A catalog entry.
///
/// Identity and location come from the bootstrap snapshot and never change;
/// `availability` is `None` until the first sync that mentions this store
/// (and again after an availability wipe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: Coordinate,
    pub availability: Option<Availability>,
}

/// A store returned by a nearest-store query with its distance from the
/// query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStore {
    pub store: StoreRecord,
    pub distance_km: f64,
}
