use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure of a single page fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The engine could not crawl the page. Fatal for the run.
    #[error("engine failure on '{target}': {reason}")]
    EngineFailure { target: String, reason: String },

    /// The engine crawled the page but its payload could not be decoded.
    /// Only this page is lost.
    #[error("malformed payload on '{target}': {reason}")]
    MalformedPayload { target: String, reason: String },
}

impl FetchError {
    pub fn is_page_local(&self) -> bool {
        matches!(self, FetchError::MalformedPayload { .. })
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("destination '{}' unavailable: {source}", path.display())]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed writing rows: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("session table poisoned")]
    SessionsPoisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse profile: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("profile '{0}' has no categories")]
    NoCategories(String),

    #[error("category index {index} out of range, profile has {len} categories")]
    CategoryOutOfRange { index: usize, len: usize },

    #[error("invalid delay of {value} seconds: {reason}")]
    InvalidDelay { value: f64, reason: String },
}
