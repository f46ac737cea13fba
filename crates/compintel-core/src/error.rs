use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The persisted mapping file exists but cannot be trusted. Fatal for the
    /// run: starting from an empty mapping would re-split merged companies.
    #[error("Mapping store {} is corrupt: {reason}", path.display())]
    MappingCorrupt { path: PathBuf, reason: String },

    #[error("I/O failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
