use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a release check run.
#[derive(Error, Debug)]
pub enum ReleaseNotifierError {
    /// Error making an HTTP request to the GitHub API or a webhook.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error encoding or decoding JSON.
    #[error("Failed to encode or decode JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A remote endpoint answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Tracked item identifier is not in "owner/name" form.
    #[error("Malformed identifier: expected 'owner/name', got '{0}'")]
    MalformedIdentifier(String),

    /// Date string is not in YYYY-MM-DD form.
    #[error("Invalid date: expected 'YYYY-MM-DD', got '{0}'")]
    InvalidDate(String),

    /// Invalid base URL.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The snapshot file could not be read or written.
    #[error("Snapshot I/O failed for '{path}': {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but does not decode.
    #[error("Snapshot file '{path}' is corrupt: {source}")]
    CorruptSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A config or repository list file is malformed.
    #[error("Invalid config in '{path}': {message}")]
    Config { path: PathBuf, message: String },

    /// IO error (CI output file and other plain file operations).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for release notifier operations.
pub type Result<T> = std::result::Result<T, ReleaseNotifierError>;
