use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Cannot open \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot use the provided stream. Is it YAML?")]
    Parse(#[source] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
