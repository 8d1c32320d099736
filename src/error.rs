// src/error.rs

use thiserror::Error;

/// Core error types for rpmfetch
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client initialization error
    #[error("Failed to initialize HTTP client: {0}")]
    InitError(String),

    /// Network or HTTP failure during a fetch
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Malformed repository metadata: XML, compression, or a missing
    /// primary entry
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The query matched nothing on any configured mirror
    #[error("{0}")]
    NotFoundError(String),

    /// Caller-supplied argument rejected before any network I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias using rpmfetch's Error type
pub type Result<T> = std::result::Result<T, Error>;
