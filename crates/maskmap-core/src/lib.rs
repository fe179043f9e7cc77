pub mod app_config;
pub mod config;
pub mod geo;
pub mod stores;

pub use app_config::{AppConfig, Environment, FeedColumns, FeedConfig};
pub use config::{
    load_app_config, load_app_config_from_env, DEFAULT_FEED_URL, MIN_MARKER_BUCKET_DEGREES,
};
pub use geo::{haversine_km, Coordinate, CoordinateError, EARTH_RADIUS_KM};
pub use stores::{Availability, AvailabilityRecord, NearbyStore, StoreRecord};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
