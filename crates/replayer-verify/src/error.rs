use std::path::PathBuf;

use replayer_backends::BackendError;
use replayer_download::DownloadError;
use replayer_manifest::ManifestError;
use thiserror::Error;

/// Errors that stop a verification or profiling run.
///
/// Per-trace replay problems are not errors: they become a `crash` verdict.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to compute checksum of {}: {source}", path.display())]
    Checksum {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} must be configured")]
    MissingSetting(&'static str),
}

impl VerifyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
