//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// An append failed and the partial bytes could not be discarded.
    ///
    /// The backend is unusable after this: its on-disk end no longer matches
    /// the last acknowledged append.
    #[error("append at offset {offset} failed and could not be rolled back: {source}")]
    TornAppend {
        /// Offset the failed append started at.
        offset: u64,
        /// The error raised while rolling back.
        source: io::Error,
    },
}
