//! Logical keys and the tagged-key grammar.

use crate::error::{CodecError, CodecResult};
use crate::time::Timestamp;
use std::fmt;

/// Maximum length of a logical key in bytes.
///
/// Leaves ample room for the tag, brackets and two timestamps within the
/// record's 16-bit key length.
pub const MAX_LOGICAL_KEY_LEN: usize = 1024;

/// A caller-supplied identifier of a fact, e.g. the system pair `"USD -> IDR"`.
///
/// Logical keys are validated once, at creation: they must be non-empty,
/// at most [`MAX_LOGICAL_KEY_LEN`] bytes, and free of `[`, `]` and control
/// characters. That keeps the tagged-key grammar unambiguous without any
/// escaping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalKey(String);

impl LogicalKey {
    /// Validates and wraps a logical key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidLogicalKey`] if the key is empty, too
    /// long, or contains a bracket or control character.
    pub fn new(key: impl Into<String>) -> CodecResult<Self> {
        let key = key.into();
        let reason = if key.is_empty() {
            Some("must not be empty")
        } else if key.len() > MAX_LOGICAL_KEY_LEN {
            Some("too long")
        } else if key.contains(['[', ']']) {
            Some("must not contain '[' or ']'")
        } else if key.chars().any(char::is_control) {
            Some("must not contain control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CodecError::InvalidLogicalKey { key, reason }),
            None => Ok(Self(key)),
        }
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which family a tagged key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// The live, latest value of a fact.
    Current,
    /// A superseded value with its effective range.
    Historical,
}

impl KeyKind {
    /// Returns the tag character.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::Current => 'C',
            Self::Historical => 'H',
        }
    }

    /// Returns the serialized prefix shared by every key of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Current => "C[",
            Self::Historical => "H[",
        }
    }
}

/// The key actually stored in the log and the index.
///
/// Serialization is injective: the tag separates the two families, logical
/// keys cannot contain brackets, and timestamps are rendered canonically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaggedKey {
    /// `C[<logical>]`
    Current(LogicalKey),
    /// `H[<valid_from>[<logical>]<valid_to>]`
    Historical {
        /// The fact this version belongs to.
        key: LogicalKey,
        /// Instant the value became current (inclusive).
        valid_from: Timestamp,
        /// Instant the value was superseded (exclusive).
        valid_to: Timestamp,
    },
}

impl TaggedKey {
    /// Creates a current key.
    #[must_use]
    pub fn current(key: LogicalKey) -> Self {
        Self::Current(key)
    }

    /// Creates a historical key covering `[valid_from, valid_to)`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TimestampOutOfRange`] if either bound cannot be
    /// rendered as RFC 3339.
    pub fn historical(key: LogicalKey, valid_from: Timestamp, valid_to: Timestamp) -> CodecResult<Self> {
        valid_from.to_rfc3339()?;
        valid_to.to_rfc3339()?;
        Ok(Self::Historical {
            key,
            valid_from,
            valid_to,
        })
    }

    /// Returns the key family.
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Current(_) => KeyKind::Current,
            Self::Historical { .. } => KeyKind::Historical,
        }
    }

    /// Returns the logical key.
    #[must_use]
    pub fn logical(&self) -> &LogicalKey {
        match self {
            Self::Current(key) | Self::Historical { key, .. } => key,
        }
    }

    /// Serializes the key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TimestampOutOfRange`] for a historical key whose
    /// bounds were built outside [`TaggedKey::historical`] and cannot render.
    pub fn encode(&self) -> CodecResult<String> {
        match self {
            Self::Current(key) => Ok(format!("C[{key}]")),
            Self::Historical {
                key,
                valid_from,
                valid_to,
            } => Ok(format!(
                "H[{}[{key}]{}]",
                valid_from.to_rfc3339()?,
                valid_to.to_rfc3339()?
            )),
        }
    }

    /// Parses a serialized key in one left-to-right pass.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidKeyFormat`] if the tag is neither `C` nor
    /// `H`, a bracket is missing or misplaced, a timestamp is not RFC 3339,
    /// or the embedded logical key is invalid.
    pub fn parse(text: &str) -> CodecResult<Self> {
        match text.as_bytes().first() {
            Some(b'C') => Self::parse_current(text),
            Some(b'H') => Self::parse_historical(text),
            Some(_) => Err(CodecError::invalid_key(text, "unknown tag")),
            None => Err(CodecError::invalid_key(text, "empty key")),
        }
    }

    fn parse_current(text: &str) -> CodecResult<Self> {
        let inner = text[1..]
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| CodecError::invalid_key(text, "expected C[...]"))?;
        Ok(Self::Current(logical_in(text, inner)?))
    }

    fn parse_historical(text: &str) -> CodecResult<Self> {
        let malformed = || CodecError::invalid_key(text, "expected H[from[key]to]");

        let rest = text[1..].strip_prefix('[').ok_or_else(malformed)?;
        let (from, rest) = rest.split_once('[').ok_or_else(malformed)?;
        let (key, rest) = rest.split_once(']').ok_or_else(malformed)?;
        let to = rest.strip_suffix(']').ok_or_else(malformed)?;

        if from.contains(']') || to.contains(['[', ']']) {
            return Err(malformed());
        }

        let valid_from = Timestamp::parse_rfc3339(from)
            .ok_or_else(|| CodecError::invalid_key(text, "valid_from is not RFC 3339"))?;
        let valid_to = Timestamp::parse_rfc3339(to)
            .ok_or_else(|| CodecError::invalid_key(text, "valid_to is not RFC 3339"))?;

        Ok(Self::Historical {
            key: logical_in(text, key)?,
            valid_from,
            valid_to,
        })
    }
}

fn logical_in(text: &str, inner: &str) -> CodecResult<LogicalKey> {
    LogicalKey::new(inner).map_err(|err| match err {
        CodecError::InvalidLogicalKey { reason, .. } => CodecError::invalid_key(text, reason),
        other => other,
    })
}

impl fmt::Display for TaggedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}
