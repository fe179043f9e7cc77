use maskmap_db::CatalogError;
use maskmap_feed::FeedError;
use thiserror::Error;

/// A sync that did not complete. The catalog is left as it was unless the
/// failure is [`SyncError::Persistence`] raised after the wipe.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetch or parse failure; nothing was written.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("catalog error: {0}")]
    Persistence(#[from] CatalogError),
}

impl SyncError {
    /// `true` when the feed could not be reached or answered with an error
    /// status.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, SyncError::Feed(e) if e.is_network())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read store snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store snapshot is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid store at snapshot index {index} (id \"{id}\"): {reason}")]
    InvalidStore {
        index: usize,
        id: String,
        reason: String,
    },

    #[error("failed to persist store snapshot: {0}")]
    Persistence(#[from] CatalogError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("nearest-store query failed: {0}")]
    Storage(#[from] CatalogError),
}
