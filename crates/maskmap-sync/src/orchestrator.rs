//! Fetch → parse → merge reconciliation of the availability feed.

use std::time::{Duration, Instant};

use maskmap_core::{AppConfig, FeedColumns};
use maskmap_db::CatalogStore;
use maskmap_feed::{parse_dataset, DatasetFetch, FeedClient, FeedError};

use crate::catalog::Catalog;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Clear every store's availability before merging, so stores missing
    /// from the feed read as unknown rather than keeping stale counts.
    pub wipe_before_merge: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            wipe_before_merge: true,
        }
    }
}

/// A record whose merge failed; the rest of the sync carried on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFailure {
    pub store_id: String,
    pub message: String,
}

/// Outcome of one completed sync.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Records parsed from the feed.
    pub fetched: usize,
    /// Records merged into a known store.
    pub applied: usize,
    /// Records whose store id is not in the catalog.
    pub unmatched: usize,
    pub failures: Vec<MergeFailure>,
    pub duration: Duration,
}

impl SyncReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reconciles the remote feed into the catalog, one full pass per call.
pub struct SyncOrchestrator<F, S> {
    fetcher: F,
    columns: FeedColumns,
    catalog: Catalog<S>,
    options: SyncOptions,
}

impl<S: CatalogStore> SyncOrchestrator<FeedClient, S> {
    /// Builds an orchestrator with a [`FeedClient`] for the configured feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the feed URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &AppConfig, catalog: Catalog<S>) -> Result<Self, FeedError> {
        let fetcher = FeedClient::new(&config.feed)?;
        Ok(Self::new(fetcher, config.feed.columns.clone(), catalog).with_options(SyncOptions {
            wipe_before_merge: config.sync_wipe_before_merge,
        }))
    }
}

impl<F: DatasetFetch, S: CatalogStore> SyncOrchestrator<F, S> {
    #[must_use]
    pub fn new(fetcher: F, columns: FeedColumns, catalog: Catalog<S>) -> Self {
        Self {
            fetcher,
            columns,
            catalog,
            options: SyncOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    /// Runs one sync.
    ///
    /// The feed is fetched and parsed before anything is written, so a feed
    /// failure leaves the catalog exactly as it was. Writes happen under the
    /// catalog write gate; a concurrent sync waits for this one to finish.
    ///
    /// Readers do not take the gate. Between the wipe and the last merge,
    /// nearest-store queries see a partly refilled catalog in which stores not
    /// yet merged have no availability. A wipe that cleared anything bumps the
    /// catalog generation immediately, so if this future is dropped mid-merge
    /// the marker memo is still invalidated rather than serving pre-wipe counts.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Feed`] if the feed cannot be fetched, is empty, or is
    ///   malformed.
    /// - [`SyncError::Persistence`] if the availability wipe fails.
    ///
    /// Individual merge failures do not fail the sync; they are listed in
    /// [`SyncReport::failures`].
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();

        let raw = self.fetcher.fetch().await?;
        let records = parse_dataset(&raw, &self.columns)?;
        drop(raw);
        tracing::debug!(records = records.len(), "availability feed parsed");

        let _gate = self.catalog.lock_writes().await;

        if self.options.wipe_before_merge {
            let cleared = self.catalog.store().delete_all_availability().await?;
            if cleared > 0 {
                self.catalog.bump_generation();
            }
            tracing::debug!(cleared, "availability wiped before merge");
        }

        let mut applied = 0usize;
        let mut unmatched = 0usize;
        let mut failures = Vec::new();
        for record in &records {
            match self
                .catalog
                .store()
                .merge_availability(&record.store_id, &record.availability())
                .await
            {
                Ok(true) => applied += 1,
                Ok(false) => unmatched += 1,
                Err(e) => {
                    tracing::warn!(store_id = %record.store_id, error = %e, "availability merge failed");
                    failures.push(MergeFailure {
                        store_id: record.store_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let generation = self.catalog.bump_generation();
        let report = SyncReport {
            fetched: records.len(),
            applied,
            unmatched,
            failures,
            duration: started.elapsed(),
        };
        tracing::info!(
            fetched = report.fetched,
            applied = report.applied,
            unmatched = report.unmatched,
            failed = report.failures.len(),
            generation,
            elapsed_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            "availability sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
