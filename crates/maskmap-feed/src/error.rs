use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport failure: DNS, TLS, connection reset, timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("empty response body from {url}")]
    EmptyResponse { url: String },

    /// The dataset could not be turned into availability records.
    ///
    /// `row` is `0` for the header and 1-based for data rows.
    #[error("malformed dataset at row {row}: {reason}")]
    Malformed { row: usize, reason: MalformedReason },

    #[error("invalid feed URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FeedError {
    /// `true` for transport failures and non-success statuses.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FeedError::Http(_) | FeedError::UnexpectedStatus { .. }
        )
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, FeedError::Malformed { .. })
    }

    /// Data row the failure points at, if it is a parse failure.
    #[must_use]
    pub fn malformed_row(&self) -> Option<usize> {
        match self {
            FeedError::Malformed { row, .. } => Some(*row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing required column \"{0}\"")]
    MissingColumn(String),

    #[error("column \"{column}\" is not a non-negative integer: \"{value}\"")]
    InvalidCount { column: String, value: String },

    #[error("store id column \"{0}\" is empty")]
    EmptyStoreId(String),

    #[error("undecodable record: {0}")]
    Csv(String),
}
