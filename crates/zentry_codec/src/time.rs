//! Microsecond timestamps shared by record headers and historical keys.

use crate::error::{CodecError, CodecResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// An instant with microsecond precision, stored as microseconds since the
/// Unix epoch.
///
/// The record header carries one of these unconditionally; [`Timestamp::UNSET`]
/// (zero) marks "no timestamp". Historical keys render two of them as RFC 3339
/// text with a fixed six-digit fraction, so that key strings with equal
/// prefixes sort by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The "no timestamp" value written into record headers.
    pub const UNSET: Self = Self(0);

    /// `0001-01-01T00:00:00Z`, the earliest instant a key may carry.
    pub const MIN: Self = Self(-62_135_596_800_000_000);

    /// `9999-12-31T23:59:59.999999Z`, the latest instant a key may carry.
    pub const MAX: Self = Self(253_402_300_799_999_999);

    /// Creates a timestamp from microseconds since the Unix epoch.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns microseconds since the Unix epoch.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Returns whether this is anything other than [`Timestamp::UNSET`].
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Converts from a `chrono` instant, dropping sub-microsecond precision.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_micros())
    }

    /// Converts to a `chrono` instant.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.0)
    }

    /// Renders the canonical RFC 3339 form used inside historical keys.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TimestampOutOfRange`] outside
    /// [`Timestamp::MIN`]..=[`Timestamp::MAX`].
    pub fn to_rfc3339(self) -> CodecResult<String> {
        if self < Self::MIN || self > Self::MAX {
            return Err(CodecError::TimestampOutOfRange { micros: self.0 });
        }
        self.to_datetime()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
            .ok_or(CodecError::TimestampOutOfRange { micros: self.0 })
    }

    /// Parses any RFC 3339 instant within the supported range.
    #[must_use]
    pub fn parse_rfc3339(text: &str) -> Option<Self> {
        let parsed = DateTime::parse_from_rfc3339(text).ok()?;
        let ts = Self::from_datetime(parsed.with_timezone(&Utc));
        (Self::MIN..=Self::MAX).contains(&ts).then_some(ts)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}us", self.0),
        }
    }
}
