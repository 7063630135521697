//! Error types for cloud range lookups.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while parsing, resolving, or loading range data.
#[derive(Debug, Error)]
pub enum CloudInfoError {
    /// Text is not a valid IPv4 or IPv6 address.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// Text is not valid `address/prefix-length` notation.
    #[error("invalid cidr: {0:?}")]
    InvalidCidr(String),

    /// DNS lookup failed or returned no addresses.
    #[error("failed to resolve {host}: {source}")]
    ResolutionFailed {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// DNS lookup did not complete in time.
    #[error("resolving {0} timed out")]
    ResolutionTimeout(String),

    /// HTTP request timed out.
    #[error("request timeout")]
    Timeout,

    /// HTTP error with status code.
    #[error("http {0}")]
    Http(u16),

    /// HTTP request error.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response exceeds maximum allowed size.
    #[error("response too large: {0} bytes exceeds limit of {1} bytes")]
    TooLarge(usize, usize),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot document is well-formed JSON but has invalid contents.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The snapshot loader has nothing to load from.
    #[error("no snapshot source configured")]
    NoSnapshotSource,

    /// The background snapshot load panicked or was cancelled.
    #[error("snapshot load aborted: {0}")]
    LoadAborted(String),

    /// Loading needs a Tokio runtime and none is running.
    #[error("no tokio runtime to load the snapshot on")]
    NoRuntime,

    /// The process-wide instance was already created.
    #[error("cloud info already initialized")]
    AlreadyInitialized,

    /// Range data could not be loaded from any source.
    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(#[source] Arc<CloudInfoError>),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CloudInfoError>;
