//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use zentry_core::{Config, LogicalKey, Store, Timestamp};
use zentry_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};

#[derive(Debug)]
struct Faults {
    crash_after_bytes: AtomicUsize,
    bytes_written: AtomicUsize,
    fail_sync: AtomicBool,
    crashed: AtomicBool,
}

/// An in-memory backend that can simulate crashes.
///
/// Clones share both the bytes and the fault switches, so a test keeps one
/// clone to arm faults after handing another to a store.
#[derive(Debug, Clone)]
pub struct CrashableBackend {
    inner: InMemoryBackend,
    faults: Arc<Faults>,
}

impl CrashableBackend {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            faults: Arc::new(Faults {
                crash_after_bytes: AtomicUsize::new(usize::MAX),
                bytes_written: AtomicUsize::new(0),
                fail_sync: AtomicBool::new(false),
                crashed: AtomicBool::new(false),
            }),
        }
    }

    /// Lets `bytes` more bytes through, then fails every append. An append
    /// crossing the threshold writes its first part before failing.
    pub fn crash_after(&self, bytes: usize) {
        let written = self.faults.bytes_written.load(Ordering::SeqCst);
        self.faults
            .crash_after_bytes
            .store(written.saturating_add(bytes), Ordering::SeqCst);
    }

    /// Fails every append from now on.
    pub fn crash_now(&self) {
        self.crash_after(0);
    }

    /// Makes `sync` fail.
    pub fn set_fail_sync(&self, fail: bool) {
        self.faults.fail_sync.store(fail, Ordering::SeqCst);
    }

    pub fn has_crashed(&self) -> bool {
        self.faults.crashed.load(Ordering::SeqCst)
    }

    /// Returns the surviving bytes as a plain backend, as after a restart.
    pub fn restart(&self) -> InMemoryBackend {
        InMemoryBackend::with_data(self.inner.data())
    }

    pub fn data(&self) -> Vec<u8> {
        self.inner.data()
    }
}

fn simulated(message: &str) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

impl StorageBackend for CrashableBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let current = self
            .faults
            .bytes_written
            .fetch_add(bytes.len(), Ordering::SeqCst);
        let threshold = self.faults.crash_after_bytes.load(Ordering::SeqCst);

        if current >= threshold {
            self.faults.crashed.store(true, Ordering::SeqCst);
            return Err(simulated("simulated crash during write"));
        }

        if current + bytes.len() > threshold {
            self.faults.crashed.store(true, Ordering::SeqCst);
            let partial_len = threshold - current;
            if partial_len > 0 {
                let _ = self.inner.append(&bytes[..partial_len]);
            }
            return Err(simulated("simulated crash during partial write"));
        }

        self.inner.append(bytes)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.faults.fail_sync.load(Ordering::SeqCst) {
            return Err(simulated("simulated crash during sync"));
        }
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }
}

pub fn key(name: &str) -> LogicalKey {
    LogicalKey::new(name).unwrap()
}

pub fn ts(secs: i64) -> Timestamp {
    Timestamp::from_micros(secs * 1_000_000)
}

pub fn reopen(backend: InMemoryBackend) -> Store {
    Store::with_backend(Box::new(backend), Config::default()).unwrap()
}

/// Returns the offsets of every record in the store's log.
pub fn record_offsets(store: &Store) -> Vec<u64> {
    store
        .log()
        .scan()
        .unwrap()
        .map(|entry| entry.unwrap().offset)
        .collect()
}
