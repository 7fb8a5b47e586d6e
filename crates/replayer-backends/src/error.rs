//! Backend error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the registry and the replay backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend claims the trace's extension.
    #[error("no dump backend implemented for {}", path.display())]
    NotImplemented { path: PathBuf },

    #[error("Invalid trace_path: \"{}\" tried to be dumped by the {backend}", path.display())]
    InvalidTrace { path: PathBuf, backend: &'static str },

    #[error("extension {extension} is already registered by the {existing} backend")]
    DuplicateExtension { extension: String, existing: &'static str },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process failed with error code: {code} ({command})")]
    CommandFailed { command: String, code: i32 },

    #[error("Unable to check the current gfxrecon-replay version.")]
    VersionUnknown,

    #[error("The current gfxrecon-replay version is {current}. Try to update, at least to the {minimum} version.")]
    VersionTooOld { current: String, minimum: String },

    #[error("could not determine the last frame call of {}", .0.display())]
    LastCallUnknown(PathBuf),

    #[error("expected snapshot {} was not written", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to convert {}: {source}", path.display())]
    Image {
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

    #[error("profiling run produced no output")]
    EmptyProfile,

    #[error("malformed frame time line {0:?}")]
    InvalidFrameTime(String),

    #[error("the {0} backend does not support profiling")]
    ProfilingUnsupported(&'static str),
}

impl BackendError {
    /// Configuration mistakes; everything else only fails the current trace.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidTrace { .. } | Self::DuplicateExtension { .. })
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
