//! Error types shared across the Nordlys workspace.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while decoding upstream events or loading configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error (event envelope or post record).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error (feeds configuration).
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error (configuration or dictionary files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record carried an unparseable `createdAt` timestamp.
    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        /// The raw timestamp string from the record.
        value: String,
        /// The underlying parse failure.
        source: chrono::ParseError,
    },

    /// Configuration is structurally valid but semantically wrong.
    #[error("configuration error: {0}")]
    Config(String),
}
