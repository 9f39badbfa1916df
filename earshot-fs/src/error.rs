//! Error types for earshot-fs

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem engine error
#[derive(Error, Debug)]
pub enum FsError {
    /// The directory's anchor chain cannot be turned into an absolute location
    #[error("Cannot resolve directory: {reason}")]
    BrokenAnchor { reason: String },

    /// A file or directory name that is empty, relative-special or contains a separator
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Structurally impossible request (e.g. moving a directory into itself)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Backend I/O failure
    #[error("Storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted content present but not decodable
    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        /// 1-based line for newline-delimited reads
        line: Option<usize>,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be serialized; nothing was written
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
}

impl FsError {
    pub(crate) fn storage(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> FsError {
        let path = path.into();
        move |source| FsError::Storage { path, source }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FsError::Decode { .. })
    }
}

/// Convenience Result type using FsError
pub type Result<T> = std::result::Result<T, FsError>;
