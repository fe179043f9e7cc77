use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Header names of the four columns the availability feed must carry.
///
/// Matching is exact: a renamed column in the upstream feed is a malformed
/// dataset, a reordered one is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedColumns {
    pub store_id: String,
    pub adult_count: String,
    pub child_count: String,
    pub updated_at: String,
}

impl Default for FeedColumns {
    /// Column names published by the NHI mask-availability open data feed.
    fn default() -> Self {
        Self {
            store_id: "醫事機構代碼".to_string(),
            adult_count: "成人口罩總剩餘數".to_string(),
            child_count: "兒童口罩剩餘數".to_string(),
            updated_at: "來源資料時間".to_string(),
        }
    }
}

/// Everything the feed client and parser need, split out of [`AppConfig`] so
/// the feed crate does not depend on unrelated settings.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub columns: FeedColumns,
}

#[derive(Clone)]
pub struct AppConfig {
    /// Required for every Postgres-backed command; `None` is only usable with
    /// the in-memory catalog.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub feed: FeedConfig,
    pub max_marker_amount: usize,
    pub marker_bucket_degrees: f64,
    /// `None` means the snapshot compiled into the binary.
    pub snapshot_path: Option<PathBuf>,
    pub sync_cron: String,
    pub sync_wipe_before_merge: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("feed", &self.feed)
            .field("max_marker_amount", &self.max_marker_amount)
            .field("marker_bucket_degrees", &self.marker_bucket_degrees)
            .field("snapshot_path", &self.snapshot_path)
            .field("sync_cron", &self.sync_cron)
            .field("sync_wipe_before_merge", &self.sync_wipe_before_merge)
            .finish()
    }
}
