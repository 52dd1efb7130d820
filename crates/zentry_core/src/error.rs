//! Error types for Zentry core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use zentry_codec::{CodecError, Timestamp};

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Zentry core operations.
///
/// A lookup miss is not an error: reads return `Option::None`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error (the I/O failure class).
    #[error("storage error: {0}")]
    Storage(#[from] zentry_storage::StorageError),

    /// I/O error outside the backend (lock files, directories).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Codec error not covered by a more specific variant.
    #[error("codec error: {0}")]
    Codec(CodecError),

    /// A serialized tagged key does not follow the key grammar.
    #[error("invalid key format {key:?}: {reason}")]
    InvalidKeyFormat {
        /// The offending key text.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A logical key was rejected.
    #[error("invalid logical key {key:?}: {reason}")]
    InvalidLogicalKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Record bytes at `offset` are inconsistent with the record layout.
    #[error("corrupt record at offset {offset}: {message}")]
    CorruptRecord {
        /// Log offset of the record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The log ends in the middle of a record.
    #[error("incomplete record at offset {offset}: only {remaining} bytes remain")]
    IncompleteTail {
        /// Log offset where the partial record starts.
        offset: u64,
        /// Bytes present from that offset to the end of the log.
        remaining: u64,
    },

    /// A new value would start before a time already covered for its key.
    #[error("cannot set {key:?} at {now}: the key is already covered up to {effective_from}")]
    StaleTimestamp {
        /// Logical key being set.
        key: String,
        /// Effective start of the current value, or the end of the latest
        /// historical range when the key has no current value.
        effective_from: Timestamp,
        /// The rejected supersession instant.
        now: Timestamp,
    },

    /// A payload exceeds the configured maximum.
    #[error("payload of {len} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
        /// Configured maximum.
        max: u32,
    },

    /// Another store instance holds the log.
    #[error("store locked: {path} is held by another instance")]
    StoreLocked {
        /// Path of the log file.
        path: PathBuf,
    },

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// The store refuses writes because its log has unreadable bytes.
    #[error("store is read-only: {reason}")]
    ReadOnly {
        /// Why writes are refused.
        reason: String,
    },

    /// A conversion graph or rate is malformed.
    #[error("invalid conversion: {message}")]
    InvalidConversion {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a corrupt record error.
    pub fn corrupt_record(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid conversion error.
    pub fn invalid_conversion(message: impl Into<String>) -> Self {
        Self::InvalidConversion {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns whether this error came from the storage layer.
    ///
    /// A write that fails this way was not acknowledged and left no entry in
    /// the index; the caller may retry it.
    #[must_use]
    pub fn is_io_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

impl From<CodecError> for CoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidKeyFormat { key, reason } => Self::InvalidKeyFormat { key, reason },
            CodecError::InvalidLogicalKey { key, reason } => Self::InvalidLogicalKey { key, reason },
            other => Self::Codec(other),
        }
    }
}
