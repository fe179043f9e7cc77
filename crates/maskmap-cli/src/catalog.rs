//! Catalog command handlers: bootstrap, nearest-store listing, markers.

use maskmap_core::{AppConfig, Coordinate, NearbyStore};
use maskmap_db::CatalogStore;
use maskmap_sync::{
    Catalog, CatalogBootstrapper, Marker, MarkerCache, NearestStoreQuery, SnapshotSource,
};

pub(crate) async fn run_bootstrap<S: CatalogStore>(
    catalog: Catalog<S>,
    source: SnapshotSource,
) -> anyhow::Result<()> {
    let inserted = CatalogBootstrapper::new(catalog.clone(), source)
        .ensure_catalog_loaded()
        .await?;
    let total = catalog.store().count().await?;

    if inserted == 0 {
        println!("catalog already loaded ({total} stores)");
    } else {
        println!("loaded {inserted} stores");
    }
    Ok(())
}

pub(crate) async fn run_nearest<S: CatalogStore>(
    catalog: Catalog<S>,
    lat: f64,
    lon: f64,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let origin = Coordinate::new(lat, lon)?;
    let stores = NearestStoreQuery::new(catalog).nearest(origin, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stores)?);
        return Ok(());
    }
    if stores.is_empty() {
        println!("no stores in catalog");
        return Ok(());
    }
    for nearby in &stores {
        println!("{}", format_nearby(nearby));
    }
    Ok(())
}

pub(crate) async fn run_markers<S: CatalogStore>(
    catalog: Catalog<S>,
    config: &AppConfig,
    lat: f64,
    lon: f64,
    json: bool,
) -> anyhow::Result<()> {
    let point = Coordinate::new(lat, lon)?;
    let markers = MarkerCache::from_config(catalog, config)
        .get_markers(point)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*markers)?);
        return Ok(());
    }
    println!(
        "{} marker(s) around {point} (cap {})",
        markers.len(),
        config.max_marker_amount
    );
    for marker in markers.iter() {
        println!("{}", format_marker(marker));
    }
    Ok(())
}

/// Render a count pair, `"-"` when the store has never been synced.
fn fmt_counts(adult: Option<u32>, child: Option<u32>) -> String {
    match (adult, child) {
        (Some(adult), Some(child)) => format!("adult {adult:>5}  child {child:>5}"),
        _ => format!("adult {:>5}  child {:>5}", "-", "-"),
    }
}

fn format_nearby(nearby: &NearbyStore) -> String {
    let store = &nearby.store;
    let availability = store.availability.as_ref();
    format!(
        "{:>8.3} km  {:<12} {}  {}  {}",
        nearby.distance_km,
        store.id,
        fmt_counts(
            availability.map(|a| a.adult_mask_count),
            availability.map(|a| a.child_mask_count)
        ),
        store.name,
        store.address,
    )
}

fn format_marker(marker: &Marker) -> String {
    format!(
        "{:>8.3} km  {:<12} {:<9} {}  {}",
        marker.distance_km,
        marker.id,
        marker.stock.as_str(),
        fmt_counts(marker.adult_mask_count, marker.child_mask_count),
        marker.name,
    )
}

#[cfg(test)]
mod tests {
    use maskmap_core::{Availability, StoreRecord};
    use maskmap_sync::StockLevel;

    use super::*;

    fn nearby(availability: Option<Availability>) -> NearbyStore {
        NearbyStore {
            store: StoreRecord {
                id: "5901012018".to_string(),
                name: "博愛藥局".to_string(),
                address: "臺北市中正區博愛路94號".to_string(),
                location: Coordinate::new(25.042_363, 121.511_882).unwrap(),
                availability,
            },
            distance_km: 0.021,
        }
    }

    #[test]
    fn formats_synced_store() {
        let line = format_nearby(&nearby(Some(Availability {
            adult_mask_count: 120,
            child_mask_count: 35,
            updated_at: "2020/02/10 10:08:41".to_string(),
        })));
        assert!(line.contains("0.021 km"));
        assert!(line.contains("adult   120  child    35"));
        assert!(line.contains("博愛藥局"));
    }

    #[test]
    fn formats_unsynced_store_with_dashes() {
        let line = format_nearby(&nearby(None));
        assert!(line.contains("adult     -  child     -"));
    }

    #[test]
    fn formats_marker_stock_level() {
        let marker = Marker::from(nearby(None));
        assert_eq!(marker.stock, StockLevel::Unknown);
        assert!(format_marker(&marker).contains("unknown"));
    }
}
