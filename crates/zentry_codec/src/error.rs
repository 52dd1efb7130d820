//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A serialized tagged key does not follow the key grammar.
    #[error("invalid key format {key:?}: {reason}")]
    InvalidKeyFormat {
        /// The offending key text.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A logical key was rejected at creation time.
    #[error("invalid logical key {key:?}: {reason}")]
    InvalidLogicalKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Record bytes are inconsistent with the record layout.
    #[error("corrupt record: {reason}")]
    CorruptRecord {
        /// Description of the inconsistency.
        reason: String,
    },

    /// A field is too long for its length prefix.
    #[error("{field} length {len} exceeds maximum {max}")]
    FieldTooLong {
        /// Name of the field.
        field: &'static str,
        /// Actual length.
        len: usize,
        /// Maximum encodable length.
        max: usize,
    },

    /// A timestamp cannot be represented as RFC 3339 text.
    #[error("timestamp {micros}us is outside the supported range")]
    TimestampOutOfRange {
        /// Microseconds since the Unix epoch.
        micros: i64,
    },

    /// CBOR encoding or decoding of a typed payload failed.
    #[error("CBOR error: {message}")]
    Cbor {
        /// Description of the failure.
        message: String,
    },
}

impl CodecError {
    /// Creates a corrupt record error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            reason: reason.into(),
        }
    }

    /// Creates an invalid key format error.
    pub fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
