mod catalog;
mod scheduler;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use maskmap_db::{CatalogStore, MemoryCatalogStore, PgCatalogStore};
use maskmap_sync::{Catalog, CatalogBootstrapper, SnapshotSource};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "maskmap")]
#[command(about = "Pharmacy mask availability sync and nearest-store lookup")]
struct Cli {
    /// Use a throwaway in-process catalog instead of Postgres; the store
    /// snapshot is loaded before every command
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Check database connectivity
    Ping,
    /// Load the store snapshot into an empty catalog
    Bootstrap {
        /// Snapshot file to load instead of the configured or bundled one
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Fetch the availability feed once and merge it into the catalog
    Sync,
    /// List the stores nearest a point
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Maximum number of stores to list
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List map markers around a point, capped at MASKMAP_MAX_MARKER_AMOUNT
    Markers {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
    /// Sync on MASKMAP_SYNC_CRON until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = maskmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, in_memory = cli.in_memory, "configuration loaded");

    match cli.command {
        Commands::Migrate => {
            let pool = maskmap_db::connect_pool_from_config(&config).await?;
            let applied = maskmap_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Ping => {
            let pool = maskmap_db::connect_pool_from_config(&config).await?;
            maskmap_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Runs { limit } => {
            if cli.in_memory {
                anyhow::bail!("sync run history is only recorded in Postgres mode");
            }
            let pool = maskmap_db::connect_pool_from_config(&config).await?;
            sync::run_list_runs(&pool, limit).await?;
        }
        command if cli.in_memory => {
            let catalog = Catalog::new(MemoryCatalogStore::new());
            if !matches!(command, Commands::Bootstrap { .. }) {
                CatalogBootstrapper::new(catalog.clone(), SnapshotSource::from_config(&config))
                    .ensure_catalog_loaded()
                    .await?;
            }
            run_catalog_command(command, catalog, None, &config).await?;
        }
        command => {
            let pool = maskmap_db::connect_pool_from_config(&config).await?;
            let catalog = Catalog::new(PgCatalogStore::new(pool.clone()));
            run_catalog_command(command, catalog, Some(pool), &config).await?;
        }
    }

    Ok(())
}

/// Dispatch the commands that work against either catalog backend.
///
/// `pool` is `Some` in Postgres mode, where syncs are also recorded in
/// `sync_runs`.
async fn run_catalog_command<S: CatalogStore>(
    command: Commands,
    catalog: Catalog<S>,
    pool: Option<sqlx::PgPool>,
    config: &maskmap_core::AppConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Bootstrap { snapshot } => {
            let source = snapshot.map_or_else(
                || SnapshotSource::from_config(config),
                SnapshotSource::File,
            );
            catalog::run_bootstrap(catalog, source).await
        }
        Commands::Sync => sync::run_sync_once(catalog, pool.as_ref(), config).await,
        Commands::Nearest {
            lat,
            lon,
            limit,
            json,
        } => catalog::run_nearest(catalog, lat, lon, limit, json).await,
        Commands::Markers { lat, lon, json } => {
            catalog::run_markers(catalog, config, lat, lon, json).await
        }
        Commands::Watch => scheduler::run_watch(catalog, pool, config).await,
        Commands::Migrate | Commands::Ping | Commands::Runs { .. } => {
            anyhow::bail!("command does not operate on the catalog")
        }
    }
}
