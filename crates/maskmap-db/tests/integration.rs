//! Offline unit tests for maskmap-db pool configuration and row types.
//! These tests do not require a live database connection.

use maskmap_core::{AppConfig, Environment, FeedColumns, FeedConfig, NearbyStore};
use maskmap_db::{CatalogError, PoolConfig, StoreRow, SyncRunCounts, SyncRunRow};

fn app_config(database_url: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: database_url.map(str::to_string),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        feed: FeedConfig {
            url: "http://localhost/maskdata.csv".to_string(),
            timeout_secs: 30,
            user_agent: "ua".to_string(),
            columns: FeedColumns::default(),
        },
        max_marker_amount: 100,
        marker_bucket_degrees: 0.005,
        snapshot_path: None,
        sync_cron: "0 */10 * * * *".to_string(),
        sync_wipe_before_merge: true,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config(Some("postgres://example")));
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn connect_pool_from_config_requires_database_url() {
    let result = maskmap_db::connect_pool_from_config(&app_config(None)).await;
    assert!(matches!(result, Err(CatalogError::MissingDatabaseUrl)));
}

/// Compile-time smoke test: confirm that [`SyncRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn sync_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = SyncRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "running".to_string(),
        started_at: Utc::now(),
        completed_at: None,
        records_fetched: 0,
        records_applied: 0,
        records_unmatched: 0,
        records_failed: 0,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "running");
    assert!(row.completed_at.is_none());
    assert_eq!(SyncRunCounts::default().fetched, 0);
}

#[test]
fn store_row_converts_to_nearby_store() {
    let row = StoreRow {
        id: "5901012018".to_string(),
        name: "博愛藥局".to_string(),
        address: "臺北市中正區博愛路1號".to_string(),
        latitude: 25.0424,
        longitude: 121.5122,
        adult_mask_count: None,
        child_mask_count: None,
        availability_updated_at: None,
        distance_km: 0.25,
    };

    let nearby = NearbyStore::try_from(row).expect("valid row");
    assert_eq!(nearby.store.name, "博愛藥局");
    assert!(nearby.store.availability.is_none());
}
