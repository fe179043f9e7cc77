//! Shared handle over a [`CatalogStore`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use maskmap_db::CatalogStore;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable handle shared by the bootstrapper, orchestrator, query and
/// marker cache.
///
/// Writers hold the write gate for their whole write phase so two syncs (or a
/// sync and a bootstrap) never interleave. Readers go straight to the store.
/// The generation increases after every write that changed what readers can
/// see; caches key on it.
pub struct Catalog<S> {
    store: Arc<S>,
    write_gate: Arc<Mutex<()>>,
    generation: Arc<AtomicU64>,
}

impl<S> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            write_gate: Arc::clone(&self.write_gate),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<S> std::fmt::Debug for Catalog<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl<S: CatalogStore> Catalog<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    #[must_use]
    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            write_gate: Arc::new(Mutex::new(())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> Catalog<S> {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Waits for exclusive write access.
    pub(crate) async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Returns the new generation.
    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}
