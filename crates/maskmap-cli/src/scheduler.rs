//! `watch`: periodic syncs driven by a cron schedule.

use std::sync::Arc;

use maskmap_core::AppConfig;
use maskmap_db::CatalogStore;
use maskmap_feed::FeedClient;
use maskmap_sync::{Catalog, CatalogBootstrapper, SnapshotSource, SyncOrchestrator};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::sync::run_recorded_sync;

/// Bootstrap, sync once, then sync on `config.sync_cron` until Ctrl-C or
/// SIGTERM.
///
/// Sync failures are logged and the schedule keeps running; the catalog keeps
/// serving the last good data. A tick that fires while a sync is still in
/// flight waits for it on the catalog write gate.
pub(crate) async fn run_watch<S: CatalogStore>(
    catalog: Catalog<S>,
    pool: Option<PgPool>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    CatalogBootstrapper::new(catalog.clone(), SnapshotSource::from_config(config))
        .ensure_catalog_loaded()
        .await?;

    let orchestrator = Arc::new(SyncOrchestrator::from_config(config, catalog)?);
    sync_and_log(&orchestrator, pool.as_ref(), "watch").await;

    let mut scheduler = JobScheduler::new().await?;
    register_sync_job(&scheduler, &config.sync_cron, orchestrator, pool).await?;
    scheduler.start().await?;
    tracing::info!(cron = %config.sync_cron, "watching availability feed");

    shutdown_signal().await?;
    scheduler.shutdown().await?;
    Ok(())
}

async fn register_sync_job<S: CatalogStore>(
    scheduler: &JobScheduler,
    cron: &str,
    orchestrator: Arc<SyncOrchestrator<FeedClient, S>>,
    pool: Option<PgPool>,
) -> anyhow::Result<()> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);
        let pool = pool.clone();

        Box::pin(async move {
            sync_and_log(&orchestrator, pool.as_ref(), "scheduler").await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn sync_and_log<S: CatalogStore>(
    orchestrator: &SyncOrchestrator<FeedClient, S>,
    pool: Option<&PgPool>,
    trigger_source: &str,
) {
    match run_recorded_sync(orchestrator, pool, trigger_source).await {
        Ok(report) => tracing::info!(
            trigger = trigger_source,
            applied = report.applied,
            unmatched = report.unmatched,
            failed = report.failures.len(),
            "scheduled sync finished"
        ),
        Err(e) => tracing::error!(trigger = trigger_source, error = %e, "scheduled sync failed"),
    }
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("received shutdown signal, stopping scheduler");
    Ok(())
}
