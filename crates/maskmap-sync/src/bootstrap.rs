//! One-time population of an empty catalog from the store snapshot.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::PathBuf;

use maskmap_core::{AppConfig, Coordinate, StoreRecord};
use maskmap_db::CatalogStore;
use serde::Deserialize;

use crate::catalog::Catalog;
use crate::error::BootstrapError;

/// Snapshot compiled into the binary.
const BUNDLED_SNAPSHOT: &str = include_str!("../data/stores.json");

/// Where the store snapshot is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    Bundled,
    File(PathBuf),
}

impl SnapshotSource {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        config
            .snapshot_path
            .clone()
            .map_or(SnapshotSource::Bundled, SnapshotSource::File)
    }

    fn describe(&self) -> String {
        match self {
            SnapshotSource::Bundled => "<bundled>".to_string(),
            SnapshotSource::File(path) => path.display().to_string(),
        }
    }

    async fn read(&self) -> Result<Cow<'static, str>, BootstrapError> {
        match self {
            SnapshotSource::Bundled => Ok(Cow::Borrowed(BUNDLED_SNAPSHOT)),
            SnapshotSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map(Cow::Owned)
                .map_err(|source| BootstrapError::Read {
                    path: path.display().to_string(),
                    source,
                }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    id: String,
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
}

/// Decodes a snapshot document into catalog records with no availability.
///
/// The document is a JSON array of `{id, name, address, latitude, longitude}`
/// objects. Every entry must have a non-empty id, unique within the document,
/// and an in-range coordinate.
///
/// # Errors
///
/// Returns [`BootstrapError::Malformed`] if the JSON does not decode, or
/// [`BootstrapError::InvalidStore`] for the first entry that fails validation.
pub fn decode_snapshot(raw: &str) -> Result<Vec<StoreRecord>, BootstrapError> {
    let entries: Vec<SnapshotEntry> = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;

    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
    let mut stores = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let invalid = |reason: String| BootstrapError::InvalidStore {
            index,
            id: entry.id.clone(),
            reason,
        };
        if entry.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if !seen.insert(entry.id.clone()) {
            return Err(invalid("duplicate id".to_string()));
        }
        let location =
            Coordinate::new(entry.latitude, entry.longitude).map_err(|e| invalid(e.to_string()))?;

        stores.push(StoreRecord {
            id: entry.id,
            name: entry.name,
            address: entry.address,
            location,
            availability: None,
        });
    }

    Ok(stores)
}

/// Loads the snapshot into the catalog if, and only if, the catalog is empty.
pub struct CatalogBootstrapper<S> {
    catalog: Catalog<S>,
    source: SnapshotSource,
}

impl<S: CatalogStore> CatalogBootstrapper<S> {
    #[must_use]
    pub fn new(catalog: Catalog<S>, source: SnapshotSource) -> Self {
        Self { catalog, source }
    }

    /// Ensures the catalog holds the snapshot's stores.
    ///
    /// Returns the number of stores inserted: the snapshot size on the first
    /// call against an empty catalog, `0` on every later call.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] if the snapshot cannot be read or decoded,
    /// contains an invalid store, or cannot be written.
    pub async fn ensure_catalog_loaded(&self) -> Result<usize, BootstrapError> {
        let _gate = self.catalog.lock_writes().await;

        if !self.catalog.store().is_empty().await? {
            tracing::debug!("catalog already populated; skipping bootstrap");
            return Ok(0);
        }

        let raw = self.source.read().await?;
        let stores = decode_snapshot(&raw)?;
        let inserted = self.catalog.store().insert_many(&stores).await?;
        let inserted = usize::try_from(inserted).unwrap_or(usize::MAX);

        if inserted > 0 {
            self.catalog.bump_generation();
        }
        tracing::info!(
            source = %self.source.describe(),
            snapshot = stores.len(),
            inserted,
            "catalog bootstrapped"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
