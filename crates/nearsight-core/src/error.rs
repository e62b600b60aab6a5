use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

pub type Result<T, E = IndexError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Dimension mismatch at position {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        position: usize,
    },

    #[error("Index dimension must be positive")]
    ZeroDimension,

    #[error("Search requested against an empty index")]
    EmptyIndex,

    #[error("Softmax requires at least one score")]
    EmptyInput,

    #[error("Temperature must be finite and positive, got {0}")]
    InvalidTemperature(f32),

    #[error("No index found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt index at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("Embedding failed: {0:#}")]
    Embedding(anyhow::Error),
}

impl IndexError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source,
        }
    }
}
