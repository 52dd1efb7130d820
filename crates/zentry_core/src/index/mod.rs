//! In-memory index from tagged keys to log offsets.
//!
//! The index is derived state. It is built by replaying the log at open,
//! updated after every successful append, and never written to disk.
//!
//! # Ordering
//!
//! Primary entries are ordered by the serialized tagged key, so every
//! `C[...]` key sorts before every `H[...]` key and a kind listing is a
//! contiguous prefix range. A secondary map orders historical entries by
//! logical key first and `valid_from` second, which makes the history of one
//! fact a contiguous range as well.

mod btree;

pub use btree::KeyIndex;
