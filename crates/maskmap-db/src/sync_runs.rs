//! Database operations for `sync_runs`, the audit trail of availability syncs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::CatalogError;

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_fetched: i64,
    pub records_applied: i64,
    pub records_unmatched: i64,
    pub records_failed: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tallies written when a run succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncRunCounts {
    pub fetched: i64,
    pub applied: i64,
    pub unmatched: i64,
    pub failed: i64,
}

const SELECT_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
     records_fetched, records_applied, records_unmatched, records_failed, \
     error_message, created_at";

/// Creates a new run in `running` status with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`CatalogError::Sqlx`] if the insert fails.
pub async fn create_sync_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<SyncRunRow, CatalogError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO sync_runs (public_id, trigger_source, status, started_at) \
         VALUES ($1, $2, 'running', NOW()) \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `succeeded` and records its tallies.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidSyncRunTransition`] if the run is not
/// `running`, or [`CatalogError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    counts: SyncRunCounts,
) -> Result<(), CatalogError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_fetched = $1, records_applied = $2, \
             records_unmatched = $3, records_failed = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(counts.fetched)
    .bind(counts.applied)
    .bind(counts.unmatched)
    .bind(counts.failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CatalogError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` and stores the error message.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidSyncRunTransition`] if the run is not
/// `running`, or [`CatalogError::Sqlx`] if the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), CatalogError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CatalogError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// # Errors
///
/// Returns [`CatalogError::NotFound`] if no row exists with the given `id`,
/// or [`CatalogError::Sqlx`] if the query fails.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, CatalogError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM sync_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(CatalogError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`CatalogError::Sqlx`] if the query fails.
pub async fn list_recent_sync_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<SyncRunRow>, CatalogError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM sync_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
