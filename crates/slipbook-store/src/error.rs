//! Error types for slipbook-store

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing a journal
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Journal not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Malformed journal: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Inconsistent journal: {message}")]
    Inconsistent { message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for slipbook_core::CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io { .. } => slipbook_core::CoreError::IoError,
            other => slipbook_core::CoreError::InternalError {
                message: other.to_string(),
            },
        }
    }
}
