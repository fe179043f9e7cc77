//! Availability sync and nearest-store query pipeline.
//!
//! Populates the store catalog from a snapshot, reconciles the remote
//! availability feed into it, and serves nearest-store queries with a
//! size-capped marker cache. Every component works through a shared
//! [`Catalog`] handle over any [`maskmap_db::CatalogStore`].

pub mod bootstrap;
pub mod catalog;
pub mod error;
pub mod marker_cache;
pub mod orchestrator;
pub mod query;

pub use bootstrap::{decode_snapshot, CatalogBootstrapper, SnapshotSource};
pub use catalog::Catalog;
pub use error::{BootstrapError, QueryError, SyncError};
pub use marker_cache::{Marker, MarkerCache, StockLevel, LOW_STOCK_THRESHOLD};
pub use orchestrator::{MergeFailure, SyncOptions, SyncOrchestrator, SyncReport};
pub use query::NearestStoreQuery;
