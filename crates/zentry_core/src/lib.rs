//! # Zentry Core
//!
//! Append-only storage engine for a versioned bookkeeping ledger.
//!
//! This crate provides:
//! - The record log: one append-only file, records back-to-back
//! - A BTree index from tagged keys to log offsets, rebuilt at open
//! - The versioning coordinator that rolls a current fact into history
//! - Crash recovery with a report of whatever the scan could not index
//! - Conversion-rate facts between accounting systems
//!
//! ## Example
//!
//! ```
//! use zentry_core::{LogicalKey, SetOutcome, Store, Timestamp};
//!
//! let store = Store::open_in_memory().unwrap();
//! let pair = LogicalKey::new("USD -> IDR").unwrap();
//!
//! let t1 = Timestamp::from_micros(1_000_000);
//! let t2 = Timestamp::from_micros(2_000_000);
//! store.set_current(&pair, b"14000", t1).unwrap();
//! let outcome = store.set_current(&pair, b"14500", t2).unwrap();
//!
//! assert_eq!(outcome, SetOutcome::Superseded { previous: t1..t2 });
//! assert_eq!(store.get_current(&pair).unwrap(), Some(b"14500".to_vec()));
//! assert_eq!(store.get_history(&pair).unwrap()[0].payload, b"14000");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod conversion;
mod entity;
mod error;
mod index;
mod lock;
mod log;
mod recovery;
mod store;
mod version;

pub use config::{Config, SyncMode};
pub use conversion::{ConversionGraph, Rate, RatePeriod};
pub use entity::Entity;
pub use error::{CoreError, CoreResult};
pub use index::KeyIndex;
pub use lock::{lock_path_for, LogLock};
pub use log::{LogEntry, LogScanner, RecordLog};
pub use recovery::{rebuild, RecoveryReport, TailKind, TailLoss};
pub use store::{Store, StoreStats};
pub use version::{
    HistoryEntry, InterruptedSupersession, SetOutcome, SupersessionState, TombstoneMarker,
};

pub use zentry_codec::{KeyKind, LogicalKey, Record, TaggedKey, Timestamp};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
