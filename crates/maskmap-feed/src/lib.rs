pub mod client;
pub mod error;
pub mod parse;

pub use client::{DatasetFetch, FeedClient};
pub use error::{FeedError, MalformedReason};
pub use parse::{parse_dataset, RequiredColumn};
