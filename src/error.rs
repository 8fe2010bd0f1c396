//! Error types for extraction, rating lookups and the surrounding plumbing.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to isolate or decode an embedded data literal.
///
/// Every variant is recoverable: callers fall back to the heuristic path.
#[derive(Debug, Error)]
pub enum LiteralError {
    /// None of the markers occur in the text.
    #[error("literal marker not found")]
    NotFound,

    /// The marker was found but the brackets never balanced.
    #[error("literal after {marker:?} is unterminated")]
    Unterminated { marker: String },

    /// The isolated literal is not valid for the expected shape.
    #[error("literal after {marker:?} is malformed: {source}")]
    Malformed {
        marker: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LiteralError {
    /// Whether the marker itself was present (the literal was found but unusable).
    pub fn marker_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Title extraction exhausted every strategy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TitleError {
    #[error("no title strategy produced a usable title")]
    NoTitle,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures from the external rating lookup.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("rating request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("movie not found: {0}")]
    NotFound(String),

    #[error("lookup service returned status {0}")]
    Status(u16),
}

impl RatingError {
    /// Whether a later attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status(_))
    }
}

/// Errors surfaced to the binary by the fetch, persistence and feed collaborators.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feed error: {0}")]
    Feed(String),

    #[error("no showings extracted from {0}")]
    NoShowings(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScrapeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
