//! Download error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while ensuring a trace is available locally.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0} missing")]
    Missing(PathBuf),

    #[error("download option {0} is required when a MinIO host is configured")]
    MissingOption(&'static str),

    #[error("HTTP client initialization failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Request {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status} {reason}")]
    Status { url: String, status: u16, reason: String },

    #[error("{url} still redirects after {hops} redirects (HTTP {status})")]
    TooManyRedirects { url: String, hops: u32, status: u16 },

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid filesize src {expected} doesn't match {actual} for {path}")]
    SizeMismatch { path: PathBuf, expected: u64, actual: u64 },

    #[error("credential exchange failed: {0}")]
    Credentials(String),
}

impl DownloadError {
    /// Configuration and integrity errors abort the whole run; transport
    /// failures only affect the trace being fetched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Missing(_)
                | Self::MissingOption(_)
                | Self::Client(_)
                | Self::UnsupportedScheme(_)
                | Self::InvalidUrl { .. }
                | Self::SizeMismatch { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
