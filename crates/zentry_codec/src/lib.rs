//! # Zentry Codec
//!
//! Pure, stateless encoding for the Zentry ledger log. Nothing in this crate
//! performs I/O.
//!
//! ## Record layout
//!
//! Every record in the log is laid out back-to-back with no framing:
//!
//! ```text
//! | flag (1) | key_len u16 (2) | payload_len u32 (4) | timestamp i64 (8) | key | payload |
//! ```
//!
//! All integers are little-endian. The flag is `0x01` for a live record and
//! `0x00` for a tombstone.
//!
//! ## Tagged keys
//!
//! ```text
//! Current    := "C[" LogicalKey "]"
//! Historical := "H[" RFC3339 "[" LogicalKey "]" RFC3339 "]"
//! ```
//!
//! ## Usage
//!
//! ```
//! use zentry_codec::{LogicalKey, Record, TaggedKey, Timestamp};
//!
//! let key = TaggedKey::current(LogicalKey::new("USD -> IDR").unwrap());
//! let record = Record::live(key, b"payload".to_vec(), Timestamp::from_micros(1));
//!
//! let bytes = record.encode().unwrap();
//! let (decoded, consumed) = Record::decode(&bytes, 0).unwrap();
//! assert_eq!(decoded, record);
//! assert_eq!(consumed, bytes.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod key;
mod record;
mod time;
mod value;

pub use error::{CodecError, CodecResult};
pub use key::{KeyKind, LogicalKey, TaggedKey, MAX_LOGICAL_KEY_LEN};
pub use record::{Record, RecordHeader, FLAG_LIVE, FLAG_TOMBSTONE, RECORD_HEADER_SIZE};
pub use time::Timestamp;
pub use value::{from_cbor, to_cbor};
