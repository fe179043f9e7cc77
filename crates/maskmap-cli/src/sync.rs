//! Sync command handlers and `sync_runs` bookkeeping.

use chrono::SecondsFormat;
use maskmap_core::AppConfig;
use maskmap_db::{CatalogStore, SyncRunCounts};
use maskmap_feed::FeedClient;
use maskmap_sync::{Catalog, SyncOrchestrator, SyncReport};
use sqlx::PgPool;

pub(crate) async fn run_sync_once<S: CatalogStore>(
    catalog: Catalog<S>,
    pool: Option<&PgPool>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let orchestrator = SyncOrchestrator::from_config(config, catalog)?;
    let report = run_recorded_sync(&orchestrator, pool, "cli").await?;

    println!(
        "synced {} record(s): {} applied, {} unmatched, {} failed in {} ms",
        report.fetched,
        report.applied,
        report.unmatched,
        report.failures.len(),
        report.duration.as_millis()
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.store_id, failure.message);
    }
    Ok(())
}

/// Run one sync, recording it in `sync_runs` when a pool is available.
///
/// A failed sync is marked failed on a best-effort basis and the original
/// error is returned.
pub(crate) async fn run_recorded_sync<S: CatalogStore>(
    orchestrator: &SyncOrchestrator<FeedClient, S>,
    pool: Option<&PgPool>,
    trigger_source: &str,
) -> anyhow::Result<SyncReport> {
    let Some(pool) = pool else {
        return Ok(orchestrator.sync().await?);
    };

    let run = maskmap_db::create_sync_run(pool, trigger_source).await?;
    match orchestrator.sync().await {
        Ok(report) => {
            maskmap_db::complete_sync_run(pool, run.id, counts_of(&report)).await?;
            Ok(report)
        }
        Err(err) => {
            fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
            Err(err.into())
        }
    }
}

fn counts_of(report: &SyncReport) -> SyncRunCounts {
    let to_i64 = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    SyncRunCounts {
        fetched: to_i64(report.fetched),
        applied: to_i64(report.applied),
        unmatched: to_i64(report.unmatched),
        failed: to_i64(report.failures.len()),
    }
}

/// Attempt to mark a sync run as failed, logging any secondary error.
async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = maskmap_db::fail_sync_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark sync run as failed");
    }
}

pub(crate) async fn run_list_runs(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = maskmap_db::list_recent_sync_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<10} {:<21} {:>7} {:>7} {:>9} {:>6}",
        "id", "trigger", "status", "started", "fetched", "applied", "unmatched", "failed"
    );
    for run in &runs {
        println!(
            "{:<6} {:<10} {:<10} {:<21} {:>7} {:>7} {:>9} {:>6}",
            run.id,
            run.trigger_source,
            run.status,
            run.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            run.records_fetched,
            run.records_applied,
            run.records_unmatched,
            run.records_failed,
        );
        if let Some(message) = &run.error_message {
            println!("       error: {message}");
        }
    }
    Ok(())
}
