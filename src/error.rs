/// Error types for argument validation, remote queries and aggregation
use std::path::PathBuf;
use thiserror::Error;

/// Problems detected before any network call is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "API token is required. Provide it via -a option or CLOUDFLARE_API_TOKEN environment variable."
    )]
    MissingToken,

    #[error("Either provide a file path (-f) or both zone ID (-z) and host (-h)")]
    MissingTarget,

    #[error("Invalid {flag} date '{value}'. Use ISO format (e.g., 2024-01-01T00:00:00Z)")]
    InvalidInstant { flag: &'static str, value: String },

    #[error("--since and --until must be given together")]
    IncompleteWindow,

    #[error("Start date must be before end date (since {since}, until {until})")]
    WindowOrder { since: String, until: String },

    #[error("Unknown time window '{0}'")]
    UnknownWindow(String),

    #[error("Delimiter must be a single ASCII character other than a quote or line break, got {0:?}")]
    InvalidDelimiter(char),

    #[error("Cannot read site list {path}: {msg}")]
    SiteList { path: PathBuf, msg: String },

    #[error("Site list {path}, row {row}: empty '{field}' value")]
    EmptySiteField {
        path: PathBuf,
        row: usize,
        field: &'static str,
    },
}

/// Failure of one remote analytics query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("{0}")]
    Api(String),

    #[error("Response contained no data")]
    MissingData,

    #[error("Zone not found or not accessible with this token")]
    ZoneNotFound,

    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Ratio computation failure for one record.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateError {
    #[error("No requests counted in total; cache ratio is undefined")]
    NoCountedRequests,
}
