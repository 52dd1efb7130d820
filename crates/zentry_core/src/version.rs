//! Supersession protocol types.
//!
//! Replacing a current value takes three appends:
//!
//! ```text
//! PendingTombstone   append tombstone  C[k]            marker 'S' + old offset
//! PendingHistorical  append live       H[t0[k]now]     old payload
//! PendingCurrent     append live       C[k]            new payload
//! Done
//! ```
//!
//! The log alone is enough to tell how far a sequence got: a supersession
//! tombstone for `C[k]` not followed by a live `C[k]` is an interrupted one.

use std::ops::Range;
use zentry_codec::{LogicalKey, Timestamp};

/// Progress of one supersession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupersessionState {
    /// Nothing appended yet.
    PendingTombstone,
    /// The old current value is tombstoned; its historical copy is missing.
    PendingHistorical,
    /// The historical copy is written; the new current value is missing.
    PendingCurrent,
    /// All three records are written.
    Done,
}

impl SupersessionState {
    /// Returns the state after one more successful append.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::PendingTombstone => Self::PendingHistorical,
            Self::PendingHistorical => Self::PendingCurrent,
            Self::PendingCurrent | Self::Done => Self::Done,
        }
    }

    /// Returns whether the sequence finished.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

const SUPERSEDED_TAG: u8 = b'S';

/// Payload carried by a tombstone record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TombstoneMarker {
    /// A plain delete. Encoded as an empty payload.
    Delete,
    /// The first step of a supersession.
    Superseded {
        /// Offset of the value being superseded.
        previous: u64,
    },
}

impl TombstoneMarker {
    /// Encodes the marker as a tombstone payload.
    #[must_use]
    pub fn encode(self) -> Vec<u8> {
        match self {
            Self::Delete => Vec::new(),
            Self::Superseded { previous } => {
                let mut buf = Vec::with_capacity(9);
                buf.push(SUPERSEDED_TAG);
                buf.extend_from_slice(&previous.to_le_bytes());
                buf
            }
        }
    }

    /// Decodes a tombstone payload. Anything unrecognised is a plain delete.
    #[must_use]
    pub fn decode(payload: &[u8]) -> Self {
        match payload {
            [SUPERSEDED_TAG, rest @ ..] if rest.len() == 8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(rest);
                Self::Superseded {
                    previous: u64::from_le_bytes(bytes),
                }
            }
            _ => Self::Delete,
        }
    }
}

/// Result of [`crate::Store::set_current`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key had no current value.
    Created,
    /// The previous value moved into history with this effective range.
    Superseded {
        /// `[valid_from, valid_to)` of the superseded value.
        previous: Range<Timestamp>,
    },
}

/// One superseded value of a fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Instant the value became current (inclusive).
    pub valid_from: Timestamp,
    /// Instant it was superseded (exclusive).
    pub valid_to: Timestamp,
    /// The value.
    pub payload: Vec<u8>,
}

/// A supersession that stopped before writing the new current value.
///
/// The key has no current value until it is set again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptedSupersession {
    /// The affected fact.
    pub key: LogicalKey,
    /// How far the sequence got: `PendingHistorical` or `PendingCurrent`.
    pub state: SupersessionState,
    /// Offset of the value that was being superseded.
    pub previous_offset: u64,
    /// That value's payload, if it could still be read.
    pub previous_payload: Option<Vec<u8>>,
}
