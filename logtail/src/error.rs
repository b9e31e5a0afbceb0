//! Error types shared by the initiator, producer and tailer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating, writing or reading deployment logs.
#[derive(Debug, Error)]
pub enum Error {
    /// A filesystem operation on the storage directory failed.
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No log exists for the requested token.
    #[error("deployment not found: {0}")]
    NotFound(String),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether this error maps to an unknown deployment.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
