use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the indexing pipeline.
///
/// Most variants are scoped to a single file; only `RemoteStatus` and `Http`
/// coming out of the check call abort a whole reconciliation pass.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to checksum {path}: {source}")]
    Checksum {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract content from {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Path {path} is not inside indexed root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Indexing service returned {status} for {operation}")]
    RemoteStatus { operation: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Task(String),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
