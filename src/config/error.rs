//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Similarity threshold was not a number in `[0, 1]`.
    #[error("invalid similarity threshold '{value}': must be a number between 0.0 and 1.0")]
    InvalidThreshold { value: String },

    /// Embedding dimension was zero or not a number.
    #[error("invalid embedding dimension '{value}': must be a positive integer")]
    InvalidDimension { value: String },

    /// Unknown vector backend name.
    #[error("unknown vector backend '{value}': expected one of qdrant, chroma, mock")]
    UnknownBackend { value: String },

    /// Unknown distance metric name.
    #[error("unknown distance metric '{value}': expected one of cosine, ip, l2")]
    UnknownMetric { value: String },

    /// A remote endpoint URL was empty.
    #[error("missing endpoint URL for {name}")]
    MissingEndpoint { name: &'static str },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Path exists but is a directory (when a file was expected).
    #[error("path is a directory, expected a file: {path}")]
    NotAFile { path: PathBuf },
}
