//! # Zentry Storage
//!
//! Byte-level storage backends for the Zentry ledger engine.
//!
//! Backends are **opaque, append-only byte stores**. They know nothing about
//! records, tagged keys or tombstones; `zentry_core` owns every byte of the
//! log format.
//!
//! ## Design Principles
//!
//! - Three operations matter: read a range, append at the end, make it durable
//! - Existing bytes are never rewritten
//! - Must be `Send + Sync` so one store can serve concurrent readers
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and crash simulation
//! - [`FileBackend`] - For persistent single-file logs
//!
//! ## Example
//!
//! ```rust
//! use zentry_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"USD -> IDR").unwrap();
//! let data = backend.read_at(offset, 10).unwrap();
//! assert_eq!(&data, b"USD -> IDR");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
