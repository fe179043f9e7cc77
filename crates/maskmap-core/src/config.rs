use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment, FeedColumns, FeedConfig};
use crate::ConfigError;

/// NHI mask availability open data (CSV, refreshed roughly every 30 seconds).
pub const DEFAULT_FEED_URL: &str = "https://data.nhi.gov.tw/Datasets/Download.ashx?rid=A21030000I-D50001-001&l=https://data.nhi.gov.tw/resource/mask/maskdata.csv";

/// Smallest marker memo bucket accepted from the environment.
pub const MIN_MARKER_BUCKET_DEGREES: f64 = 1e-9;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does not read `.env`; the caller owns the
/// process environment.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Tests drive this with a `HashMap` lookup instead of mutating the process
/// environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|url| !url.is_empty());
    let env = parse_environment(&or_default("MASKMAP_ENV", "development"));
    let log_level = or_default("MASKMAP_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("MASKMAP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MASKMAP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("MASKMAP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let default_columns = FeedColumns::default();
    let columns = FeedColumns {
        store_id: or_default("MASKMAP_FEED_COLUMN_STORE_ID", &default_columns.store_id),
        adult_count: or_default(
            "MASKMAP_FEED_COLUMN_ADULT_COUNT",
            &default_columns.adult_count,
        ),
        child_count: or_default(
            "MASKMAP_FEED_COLUMN_CHILD_COUNT",
            &default_columns.child_count,
        ),
        updated_at: or_default(
            "MASKMAP_FEED_COLUMN_UPDATED_AT",
            &default_columns.updated_at,
        ),
    };
    for (var, name) in [
        ("MASKMAP_FEED_COLUMN_STORE_ID", &columns.store_id),
        ("MASKMAP_FEED_COLUMN_ADULT_COUNT", &columns.adult_count),
        ("MASKMAP_FEED_COLUMN_CHILD_COUNT", &columns.child_count),
        ("MASKMAP_FEED_COLUMN_UPDATED_AT", &columns.updated_at),
    ] {
        if name.trim().is_empty() {
            return Err(invalid(var, "column name must not be empty".to_string()));
        }
    }

    let feed = FeedConfig {
        url: or_default("MASKMAP_FEED_URL", DEFAULT_FEED_URL),
        timeout_secs: parse_u64("MASKMAP_FEED_TIMEOUT_SECS", "30")?,
        user_agent: or_default(
            "MASKMAP_FEED_USER_AGENT",
            "maskmap/0.1 (mask-availability-sync)",
        ),
        columns,
    };

    let max_marker_amount = or_default("MASKMAP_MAX_MARKER_AMOUNT", "100")
        .parse::<usize>()
        .map_err(|e| invalid("MASKMAP_MAX_MARKER_AMOUNT", e.to_string()))?;
    if max_marker_amount == 0 {
        return Err(invalid(
            "MASKMAP_MAX_MARKER_AMOUNT",
            "must be at least 1".to_string(),
        ));
    }

    let marker_bucket_degrees = or_default("MASKMAP_MARKER_BUCKET_DEGREES", "0.005")
        .parse::<f64>()
        .map_err(|e| invalid("MASKMAP_MARKER_BUCKET_DEGREES", e.to_string()))?;
    if !marker_bucket_degrees.is_finite() || marker_bucket_degrees <= 0.0 {
        return Err(invalid(
            "MASKMAP_MARKER_BUCKET_DEGREES",
            "must be a positive number of degrees".to_string(),
        ));
    }
    if marker_bucket_degrees < MIN_MARKER_BUCKET_DEGREES {
        return Err(invalid(
            "MASKMAP_MARKER_BUCKET_DEGREES",
            format!("must be at least {MIN_MARKER_BUCKET_DEGREES}"),
        ));
    }

    let snapshot_path = lookup("MASKMAP_SNAPSHOT_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    let sync_cron = or_default("MASKMAP_SYNC_CRON", "0 */10 * * * *");
    let sync_wipe_before_merge = parse_bool("MASKMAP_SYNC_WIPE_BEFORE_MERGE", "true")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        feed,
        max_marker_amount,
        marker_bucket_degrees,
        snapshot_path,
        sync_cron,
        sync_wipe_before_merge,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
