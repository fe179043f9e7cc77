use maskmap_db::MemoryCatalogStore;

use super::*;

fn catalog() -> Catalog<MemoryCatalogStore> {
    Catalog::new(MemoryCatalogStore::new())
}

#[test]
fn bundled_snapshot_decodes() {
    let stores = decode_snapshot(BUNDLED_SNAPSHOT).expect("bundled snapshot must be valid");
    assert!(!stores.is_empty());
    assert!(stores.iter().all(|s| s.availability.is_none()));
}

#[test]
fn decode_rejects_duplicate_ids() {
    let raw = r#"[
        {"id": "A", "name": "a", "address": "x", "latitude": 25.0, "longitude": 121.5},
        {"id": "A", "name": "b", "address": "y", "latitude": 25.1, "longitude": 121.5}
    ]"#;
    match decode_snapshot(raw) {
        Err(BootstrapError::InvalidStore { index, id, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(id, "A");
        }
        other => panic!("expected InvalidStore, got {other:?}"),
    }
}

#[test]
fn decode_rejects_empty_id() {
    let raw = r#"[{"id": " ", "name": "a", "address": "x", "latitude": 25.0, "longitude": 121.5}]"#;
    assert!(matches!(
        decode_snapshot(raw),
        Err(BootstrapError::InvalidStore { index: 0, .. })
    ));
}

#[test]
fn decode_rejects_out_of_range_coordinate() {
    let raw = r#"[{"id": "A", "name": "a", "address": "x", "latitude": 25.0, "longitude": 181.0}]"#;
    assert!(matches!(
        decode_snapshot(raw),
        Err(BootstrapError::InvalidStore { .. })
    ));
}

#[test]
fn decode_rejects_missing_field() {
    let raw = r#"[{"id": "A", "name": "a", "latitude": 25.0, "longitude": 121.5}]"#;
    assert!(matches!(
        decode_snapshot(raw),
        Err(BootstrapError::Malformed(_))
    ));
}

#[test]
fn decode_empty_array_is_empty() {
    assert!(decode_snapshot("[]").unwrap().is_empty());
}

#[tokio::test]
async fn second_bootstrap_is_a_noop() {
    let catalog = catalog();
    let bootstrapper = CatalogBootstrapper::new(catalog.clone(), SnapshotSource::Bundled);
    let expected = decode_snapshot(BUNDLED_SNAPSHOT).unwrap().len();

    let first = bootstrapper.ensure_catalog_loaded().await.unwrap();
    let generation = catalog.generation();
    let second = bootstrapper.ensure_catalog_loaded().await.unwrap();

    assert_eq!(first, expected);
    assert_eq!(second, 0);
    assert_eq!(generation, 1);
    assert_eq!(catalog.generation(), 1);
    assert_eq!(catalog.store().count().await.unwrap(), expected as u64);
}

#[tokio::test]
async fn populated_catalog_skips_snapshot_read() {
    let catalog = catalog();
    catalog
        .store()
        .insert_many(&decode_snapshot(BUNDLED_SNAPSHOT).unwrap()[..1])
        .await
        .unwrap();
    let missing = SnapshotSource::File(PathBuf::from("/nonexistent/maskmap/stores.json"));

    let inserted = CatalogBootstrapper::new(catalog.clone(), missing)
        .ensure_catalog_loaded()
        .await
        .unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(catalog.store().count().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_snapshot_file_is_read_error() {
    let missing = SnapshotSource::File(PathBuf::from("/nonexistent/maskmap/stores.json"));

    let result = CatalogBootstrapper::new(catalog(), missing)
        .ensure_catalog_loaded()
        .await;

    assert!(matches!(result, Err(BootstrapError::Read { .. })));
}

#[tokio::test]
async fn loads_snapshot_from_file() {
    let path = std::env::temp_dir().join(format!("maskmap-snapshot-{}.json", std::process::id()));
    tokio::fs::write(
        &path,
        r#"[{"id": "F1", "name": "File Pharmacy", "address": "1 File Rd", "latitude": 25.0, "longitude": 121.5}]"#,
    )
    .await
    .unwrap();
    let catalog = catalog();

    let result = CatalogBootstrapper::new(catalog.clone(), SnapshotSource::File(path.clone()))
        .ensure_catalog_loaded()
        .await;
    tokio::fs::remove_file(&path).await.ok();

    assert_eq!(result.unwrap(), 1);
    assert!(catalog.store().get("F1").unwrap().is_some());
}

#[test]
fn source_from_config_prefers_path() {
    let mut config = AppConfig {
        database_url: None,
        env: maskmap_core::Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 10,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
        feed: maskmap_core::FeedConfig {
            url: maskmap_core::DEFAULT_FEED_URL.to_string(),
            timeout_secs: 30,
            user_agent: "maskmap-test".to_string(),
            columns: maskmap_core::FeedColumns::default(),
        },
        max_marker_amount: 100,
        marker_bucket_degrees: 0.005,
        snapshot_path: Some(PathBuf::from("/srv/maskmap/stores.json")),
        sync_cron: "0 */10 * * * *".to_string(),
        sync_wipe_before_merge: true,
    };
    assert_eq!(
        SnapshotSource::from_config(&config),
        SnapshotSource::File(PathBuf::from("/srv/maskmap/stores.json"))
    );

    config.snapshot_path = None;
    assert_eq!(SnapshotSource::from_config(&config), SnapshotSource::Bundled);
}
