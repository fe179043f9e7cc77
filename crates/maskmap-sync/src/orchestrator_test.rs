use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use maskmap_core::{Availability, Coordinate, NearbyStore, StoreRecord};
use maskmap_db::{CatalogError, MemoryCatalogStore};

use super::*;

const HEADER: &str = "醫事機構代碼,醫事機構名稱,醫事機構地址,醫事機構電話,成人口罩總剩餘數,兒童口罩剩餘數,來源資料時間";

fn feed(rows: &[(&str, u32, u32)]) -> String {
    let mut body = format!("{HEADER}\n");
    for (id, adult, child) in rows {
        let _ = writeln!(
            body,
            "{id},Pharmacy {id},Somewhere,(02)0000-0000,{adult},{child},2020/02/10 10:08:41"
        );
    }
    body
}

/// Serves a fixed body, or a 503 when none is set.
struct CannedFeed {
    body: Option<String>,
    calls: AtomicUsize,
}

impl CannedFeed {
    fn ok(body: String) -> Self {
        Self {
            body: Some(body),
            calls: AtomicUsize::new(0),
        }
    }

    fn unavailable() -> Self {
        Self {
            body: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DatasetFetch for CannedFeed {
    async fn fetch(&self) -> Result<String, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.body.clone().ok_or_else(|| FeedError::UnexpectedStatus {
            status: 503,
            url: "http://feed.test/maskdata.csv".to_string(),
        })
    }
}

/// Memory store that fails merges for one id, and optionally the wipe.
struct FlakyStore {
    inner: MemoryCatalogStore,
    poisoned_id: &'static str,
    fail_wipe: AtomicBool,
}

impl CatalogStore for FlakyStore {
    async fn insert_many(&self, stores: &[StoreRecord]) -> Result<u64, CatalogError> {
        self.inner.insert_many(stores).await
    }

    async fn delete_all_availability(&self) -> Result<u64, CatalogError> {
        if self.fail_wipe.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("wipe rejected".to_string()));
        }
        self.inner.delete_all_availability().await
    }

    async fn merge_availability(
        &self,
        store_id: &str,
        availability: &Availability,
    ) -> Result<bool, CatalogError> {
        if store_id == self.poisoned_id {
            return Err(CatalogError::Unavailable("write rejected".to_string()));
        }
        self.inner.merge_availability(store_id, availability).await
    }

    async fn is_empty(&self) -> Result<bool, CatalogError> {
        self.inner.is_empty().await
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        self.inner.count().await
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, CatalogError> {
        self.inner.query_nearest(origin, limit).await
    }
}

fn store(id: &str) -> StoreRecord {
    StoreRecord {
        id: id.to_string(),
        name: format!("Pharmacy {id}"),
        address: "Somewhere".to_string(),
        location: Coordinate::new(25.04, 121.51).unwrap(),
        availability: None,
    }
}

async fn seeded(ids: &[&str]) -> Catalog<MemoryCatalogStore> {
    let catalog = Catalog::new(MemoryCatalogStore::new());
    let stores: Vec<StoreRecord> = ids.iter().map(|id| store(id)).collect();
    catalog.store().insert_many(&stores).await.unwrap();
    catalog
}

fn availability_of(catalog: &Catalog<MemoryCatalogStore>, id: &str) -> Option<Availability> {
    catalog.store().get(id).unwrap().unwrap().availability
}

#[tokio::test]
async fn merges_known_stores_and_counts_unmatched() {
    let catalog = seeded(&["A1", "A2"]).await;
    let orchestrator = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 120, 35), ("ZZ", 5, 5), ("A2", 0, 0)])),
        FeedColumns::default(),
        catalog.clone(),
    );

    let report = orchestrator.sync().await.unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.applied, 2);
    assert_eq!(report.unmatched, 1);
    assert!(report.is_clean());
    assert_eq!(catalog.store().count().await.unwrap(), 2);
    assert!(catalog.store().get("ZZ").unwrap().is_none());
    let a1 = availability_of(&catalog, "A1").unwrap();
    assert_eq!((a1.adult_mask_count, a1.child_mask_count), (120, 35));
    assert_eq!(a1.updated_at, "2020/02/10 10:08:41");
}

#[tokio::test]
async fn successful_sync_bumps_generation() {
    let catalog = seeded(&["A1"]).await;
    let orchestrator = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1)])),
        FeedColumns::default(),
        catalog.clone(),
    );

    orchestrator.sync().await.unwrap();
    assert_eq!(catalog.generation(), 1);

    // The second sync clears the first one's counts, then merges: two bumps.
    orchestrator.sync().await.unwrap();
    assert_eq!(catalog.generation(), 3);
}

/// Memory store whose merges never complete.
#[derive(Default)]
struct StallingStore {
    inner: MemoryCatalogStore,
}

impl CatalogStore for StallingStore {
    async fn insert_many(&self, stores: &[StoreRecord]) -> Result<u64, CatalogError> {
        self.inner.insert_many(stores).await
    }

    async fn delete_all_availability(&self) -> Result<u64, CatalogError> {
        self.inner.delete_all_availability().await
    }

    async fn merge_availability(
        &self,
        _store_id: &str,
        _availability: &Availability,
    ) -> Result<bool, CatalogError> {
        std::future::pending().await
    }

    async fn is_empty(&self) -> Result<bool, CatalogError> {
        self.inner.is_empty().await
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        self.inner.count().await
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, CatalogError> {
        self.inner.query_nearest(origin, limit).await
    }
}

#[tokio::test]
async fn dropped_sync_after_wipe_still_bumps_generation() {
    let catalog = Catalog::new(StallingStore::default());
    let mut synced = store("A1");
    synced.availability = Some(Availability {
        adult_mask_count: 50,
        child_mask_count: 10,
        updated_at: "2020/02/10 10:08:41".to_string(),
    });
    catalog.store().insert_many(&[synced]).await.unwrap();

    let orchestrator = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1)])),
        FeedColumns::default(),
        catalog.clone(),
    );
    let outcome =
        tokio::time::timeout(std::time::Duration::from_millis(50), orchestrator.sync()).await;

    assert!(outcome.is_err());
    assert_eq!(catalog.generation(), 1);
    let a1 = catalog.store().inner.get("A1").unwrap().unwrap();
    assert!(a1.availability.is_none());
}

#[tokio::test]
async fn network_failure_leaves_catalog_untouched() {
    let catalog = seeded(&["A1"]).await;
    SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 50, 10)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .sync()
    .await
    .unwrap();
    let generation = catalog.generation();

    let failing = SyncOrchestrator::new(
        CannedFeed::unavailable(),
        FeedColumns::default(),
        catalog.clone(),
    );
    let err = failing.sync().await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(catalog.generation(), generation);
    assert_eq!(availability_of(&catalog, "A1").unwrap().adult_mask_count, 50);
}

#[tokio::test]
async fn malformed_feed_aborts_before_wipe() {
    let catalog = seeded(&["A1", "A2"]).await;
    SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 50, 10)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .sync()
    .await
    .unwrap();

    let body = format!(
        "{HEADER}\nA2,n,a,p,7,7,2020-01-01\nA1,n,a,p,5,not_a_number,2020-01-01\n"
    );
    let err = SyncOrchestrator::new(CannedFeed::ok(body), FeedColumns::default(), catalog.clone())
        .sync()
        .await
        .unwrap_err();

    match err {
        SyncError::Feed(e) => assert_eq!(e.malformed_row(), Some(2)),
        other => panic!("expected feed error, got {other:?}"),
    }
    assert_eq!(availability_of(&catalog, "A1").unwrap().adult_mask_count, 50);
    assert!(availability_of(&catalog, "A2").is_none());
}

#[tokio::test]
async fn wipe_clears_stores_missing_from_feed() {
    let catalog = seeded(&["A1", "A2"]).await;
    let first = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1), ("A2", 2, 2)])),
        FeedColumns::default(),
        catalog.clone(),
    );
    first.sync().await.unwrap();

    SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 9, 9)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .sync()
    .await
    .unwrap();

    assert_eq!(availability_of(&catalog, "A1").unwrap().adult_mask_count, 9);
    assert!(availability_of(&catalog, "A2").is_none());
}

#[tokio::test]
async fn without_wipe_missing_stores_keep_last_counts() {
    let catalog = seeded(&["A1", "A2"]).await;
    let options = SyncOptions {
        wipe_before_merge: false,
    };
    SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1), ("A2", 2, 2)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .with_options(options)
    .sync()
    .await
    .unwrap();

    SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 9, 9)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .with_options(options)
    .sync()
    .await
    .unwrap();

    assert_eq!(availability_of(&catalog, "A2").unwrap().adult_mask_count, 2);
}

#[tokio::test]
async fn merge_failure_is_reported_and_does_not_abort() {
    let flaky = FlakyStore {
        inner: MemoryCatalogStore::new(),
        poisoned_id: "A2",
        fail_wipe: AtomicBool::new(false),
    };
    let catalog = Catalog::new(flaky);
    catalog
        .store()
        .insert_many(&[store("A1"), store("A2"), store("A3")])
        .await
        .unwrap();

    let report = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1), ("A2", 2, 2), ("A3", 3, 3)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .sync()
    .await
    .unwrap();

    assert_eq!(report.applied, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].store_id, "A2");
    assert!(!report.is_clean());
    let a3 = catalog.store().inner.get("A3").unwrap().unwrap();
    assert_eq!(a3.availability.unwrap().adult_mask_count, 3);
}

#[tokio::test]
async fn wipe_failure_is_persistence_error() {
    let flaky = FlakyStore {
        inner: MemoryCatalogStore::new(),
        poisoned_id: "",
        fail_wipe: AtomicBool::new(true),
    };
    let catalog = Catalog::new(flaky);

    let err = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1)])),
        FeedColumns::default(),
        catalog.clone(),
    )
    .sync()
    .await
    .unwrap_err();

    assert!(matches!(err, SyncError::Persistence(_)));
    assert_eq!(catalog.generation(), 0);
}

#[tokio::test]
async fn each_sync_refetches() {
    let catalog = seeded(&["A1"]).await;
    let orchestrator = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1)])),
        FeedColumns::default(),
        catalog,
    );

    orchestrator.sync().await.unwrap();
    orchestrator.sync().await.unwrap();

    assert_eq!(orchestrator.fetcher.calls.load(Ordering::SeqCst), 2);
}

/// Memory store whose merges yield to the scheduler before writing, so two
/// unguarded syncs would interleave record by record.
#[derive(Default)]
struct YieldingStore {
    inner: MemoryCatalogStore,
}

impl CatalogStore for YieldingStore {
    async fn insert_many(&self, stores: &[StoreRecord]) -> Result<u64, CatalogError> {
        self.inner.insert_many(stores).await
    }

    async fn delete_all_availability(&self) -> Result<u64, CatalogError> {
        tokio::task::yield_now().await;
        self.inner.delete_all_availability().await
    }

    async fn merge_availability(
        &self,
        store_id: &str,
        availability: &Availability,
    ) -> Result<bool, CatalogError> {
        tokio::task::yield_now().await;
        self.inner.merge_availability(store_id, availability).await
    }

    async fn is_empty(&self) -> Result<bool, CatalogError> {
        self.inner.is_empty().await
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        self.inner.count().await
    }

    async fn query_nearest(
        &self,
        origin: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, CatalogError> {
        self.inner.query_nearest(origin, limit).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_syncs_are_serialized() {
    let catalog = Catalog::new(YieldingStore::default());
    catalog
        .store()
        .insert_many(&[store("A1"), store("A2")])
        .await
        .unwrap();

    // Opposite row order: interleaved merges would leave A1 from one feed
    // and A2 from the other.
    let left = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A1", 1, 1), ("A2", 1, 1)])),
        FeedColumns::default(),
        catalog.clone(),
    );
    let right = SyncOrchestrator::new(
        CannedFeed::ok(feed(&[("A2", 2, 2), ("A1", 2, 2)])),
        FeedColumns::default(),
        catalog.clone(),
    );

    let (a, b) = tokio::join!(left.sync(), right.sync());
    assert_eq!(a.unwrap().applied, 2);
    assert_eq!(b.unwrap().applied, 2);

    let adult = |id: &str| {
        catalog
            .store()
            .inner
            .get(id)
            .unwrap()
            .unwrap()
            .availability
            .unwrap()
            .adult_mask_count
    };
    assert_eq!(adult("A1"), adult("A2"));
    // First sync: merge only. Second: wipe of two stores, then merge.
    assert_eq!(catalog.generation(), 3);
}
