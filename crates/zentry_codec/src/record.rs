//! Binary record layout.

use crate::error::{CodecError, CodecResult};
use crate::key::TaggedKey;
use crate::time::Timestamp;

/// Header size: flag (1) + key_len (2) + payload_len (4) + timestamp (8) = 15.
pub const RECORD_HEADER_SIZE: usize = 15;

/// Flag byte of a live record.
pub const FLAG_LIVE: u8 = 0x01;

/// Flag byte of a tombstone.
pub const FLAG_TOMBSTONE: u8 = 0x00;

/// The fixed-size prefix of a record.
///
/// The log scanner parses this on its own to learn how many bytes the rest
/// of the record claims before reading them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Whether the record is a tombstone.
    pub tombstone: bool,
    /// Declared key length in bytes.
    pub key_len: u16,
    /// Declared payload length in bytes.
    pub payload_len: u32,
    /// Header timestamp, [`Timestamp::UNSET`] if unused.
    pub timestamp: Timestamp,
}

impl RecordHeader {
    /// Parses a header from the first [`RECORD_HEADER_SIZE`] bytes of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::CorruptRecord`] if fewer bytes are available or
    /// the flag byte is neither [`FLAG_LIVE`] nor [`FLAG_TOMBSTONE`].
    pub fn parse(data: &[u8]) -> CodecResult<Self> {
        let Some(header) = data.get(..RECORD_HEADER_SIZE) else {
            return Err(CodecError::corrupt(format!(
                "header needs {RECORD_HEADER_SIZE} bytes, {} available",
                data.len()
            )));
        };

        let tombstone = match header[0] {
            FLAG_LIVE => false,
            FLAG_TOMBSTONE => true,
            other => {
                return Err(CodecError::corrupt(format!("invalid flag byte 0x{other:02x}")));
            }
        };

        let key_len = u16::from_le_bytes([header[1], header[2]]);
        let payload_len = u32::from_le_bytes([header[3], header[4], header[5], header[6]]);
        let timestamp = Timestamp::from_micros(i64::from_le_bytes([
            header[7], header[8], header[9], header[10], header[11], header[12], header[13],
            header[14],
        ]));

        Ok(Self {
            tombstone,
            key_len,
            payload_len,
            timestamp,
        })
    }

    /// Returns the total record length the header declares.
    #[must_use]
    pub fn record_len(&self) -> u64 {
        RECORD_HEADER_SIZE as u64 + u64::from(self.key_len) + u64::from(self.payload_len)
    }
}

/// The on-disk unit of the ledger log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Logically deleted if true. Tombstones are never indexed.
    pub tombstone: bool,
    /// The tagged key.
    pub key: TaggedKey,
    /// Domain value bytes, opaque to the engine.
    pub payload: Vec<u8>,
    /// Domain-defined instant, [`Timestamp::UNSET`] if unused.
    pub timestamp: Timestamp,
}

impl Record {
    /// Creates a live record.
    #[must_use]
    pub fn live(key: TaggedKey, payload: Vec<u8>, timestamp: Timestamp) -> Self {
        Self {
            tombstone: false,
            key,
            payload,
            timestamp,
        }
    }

    /// Creates a tombstone for `key` with an optional marker payload.
    #[must_use]
    pub fn tombstone(key: TaggedKey, marker: Vec<u8>) -> Self {
        Self {
            tombstone: true,
            key,
            payload: marker,
            timestamp: Timestamp::UNSET,
        }
    }

    /// Encodes the record to its exact byte layout.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::FieldTooLong`] if the key exceeds `u16::MAX`
    /// bytes or the payload exceeds `u32::MAX` bytes.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let key = self.key.encode()?;
        let key_len = u16::try_from(key.len()).map_err(|_| CodecError::FieldTooLong {
            field: "key",
            len: key.len(),
            max: u16::MAX as usize,
        })?;
        let payload_len =
            u32::try_from(self.payload.len()).map_err(|_| CodecError::FieldTooLong {
                field: "payload",
                len: self.payload.len(),
                max: u32::MAX as usize,
            })?;

        let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE + key.len() + self.payload.len());
        buf.push(if self.tombstone { FLAG_TOMBSTONE } else { FLAG_LIVE });
        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.as_micros().to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(&self.payload);

        Ok(buf)
    }

    /// Decodes one record starting at `offset` within `data`.
    ///
    /// Returns the record and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::CorruptRecord`] if the declared lengths exceed
    /// the remaining bytes, the key is not UTF-8, or the key does not follow
    /// the tagged-key grammar. Nothing is guessed.
    pub fn decode(data: &[u8], offset: usize) -> CodecResult<(Self, usize)> {
        let data = data
            .get(offset..)
            .ok_or_else(|| CodecError::corrupt(format!("offset {offset} beyond buffer")))?;
        let header = RecordHeader::parse(data)?;

        let key_end = RECORD_HEADER_SIZE + header.key_len as usize;
        let end = key_end + header.payload_len as usize;
        if end > data.len() {
            return Err(CodecError::corrupt(format!(
                "declared key ({}) and payload ({}) lengths exceed the {} bytes remaining",
                header.key_len,
                header.payload_len,
                data.len() - RECORD_HEADER_SIZE
            )));
        }

        let key_text = std::str::from_utf8(&data[RECORD_HEADER_SIZE..key_end])
            .map_err(|_| CodecError::corrupt("key is not valid UTF-8"))?;
        let key = TaggedKey::parse(key_text)
            .map_err(|err| CodecError::corrupt(format!("unparseable key: {err}")))?;

        let record = Self {
            tombstone: header.tombstone,
            key,
            payload: data[key_end..end].to_vec(),
            timestamp: header.timestamp,
        };
        Ok((record, end))
    }

    /// Returns whether this is a tombstone.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.tombstone
    }
}
