//! Append-only record log.
//!
//! The log is a single byte store holding records back-to-back with no file
//! header, separators or framing. End of storage is the only terminator.
//!
//! ## Durability
//!
//! [`RecordLog::append`] returns only after the configured [`SyncMode`] is
//! satisfied. With [`SyncMode::PerWrite`] that is an fsync of the record.
//!
//! ## Concurrency
//!
//! Appends take the log's write lock; reads and scans share its read lock.
//! A reader can therefore never see a record that is still being written.

mod scanner;

pub use scanner::{LogEntry, LogScanner};

use crate::config::{Config, SyncMode};
use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use zentry_codec::{CodecError, Record, RecordHeader, RECORD_HEADER_SIZE};
use zentry_storage::{StorageBackend, StorageError};

pub(crate) struct LogInner {
    backend: Box<dyn StorageBackend>,
    /// Appends flushed but not yet fsynced (batched mode only).
    unsynced: usize,
}

/// The append-only record log.
pub struct RecordLog {
    inner: RwLock<LogInner>,
    sync_mode: SyncMode,
    max_payload_len: u32,
}

impl RecordLog {
    /// Creates a log over `backend`. Existing bytes are kept as-is.
    pub fn new(backend: Box<dyn StorageBackend>, config: &Config) -> Self {
        Self {
            inner: RwLock::new(LogInner {
                backend,
                unsynced: 0,
            }),
            sync_mode: config.sync_mode,
            max_payload_len: config.max_payload_len,
        }
    }

    /// Appends a record at the end of the log.
    ///
    /// Returns the offset of the record's first byte.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PayloadTooLarge`] before writing anything if the
    /// payload exceeds the configured maximum, or a storage error if the
    /// write or the sync fails. On error the caller must not index the record.
    pub fn append(&self, record: &Record) -> CoreResult<u64> {
        if record.payload.len() > self.max_payload_len as usize {
            return Err(CoreError::PayloadTooLarge {
                len: record.payload.len(),
                max: self.max_payload_len,
            });
        }
        let bytes = record.encode()?;

        let mut inner = self.inner.write();
        let offset = inner.backend.append(&bytes)?;

        match self.sync_mode {
            SyncMode::PerWrite => inner.backend.sync()?,
            SyncMode::Batched { max_pending } => {
                inner.backend.flush()?;
                inner.unsynced += 1;
                if inner.unsynced >= max_pending.max(1) {
                    inner.backend.sync()?;
                    inner.unsynced = 0;
                }
            }
        }

        Ok(offset)
    }

    /// Reads the record starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptRecord`] if no well-formed record starts
    /// at `offset`.
    pub fn read_at(&self, offset: u64) -> CoreResult<Record> {
        let inner = self.inner.read();
        read_record(inner.backend.as_ref(), offset)
    }

    /// Starts a sequential scan from the beginning of the log.
    ///
    /// The scan holds the log's read lock until dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the log size cannot be determined.
    pub fn scan(&self) -> CoreResult<LogScanner<'_>> {
        self.scan_from(0)
    }

    /// Starts a sequential scan at `offset`, which must be a record boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if the log size cannot be determined.
    pub fn scan_from(&self, offset: u64) -> CoreResult<LogScanner<'_>> {
        LogScanner::new(self.inner.read(), offset)
    }

    /// Forces every appended record to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> CoreResult<()> {
        let mut inner = self.inner.write();
        inner.backend.sync()?;
        inner.unsynced = 0;
        Ok(())
    }

    /// Returns the log size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.inner.read().backend.size()?)
    }

    /// Drops an incomplete final record starting at `offset`.
    pub(crate) fn discard_tail(&self, offset: u64) -> CoreResult<()> {
        let mut inner = self.inner.write();
        inner.backend.truncate(offset)?;
        inner.backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for RecordLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLog")
            .field("sync_mode", &self.sync_mode)
            .field("size", &self.size().ok())
            .finish_non_exhaustive()
    }
}

pub(crate) fn read_record(backend: &dyn StorageBackend, offset: u64) -> CoreResult<Record> {
    let header_bytes = backend
        .read_at(offset, RECORD_HEADER_SIZE)
        .map_err(|e| past_end(offset, e, "offset beyond end of log"))?;
    let header = RecordHeader::parse(&header_bytes).map_err(|e| corrupt_at(offset, e))?;

    let data = backend
        .read_at(offset, header.record_len() as usize)
        .map_err(|e| past_end(offset, e, "record extends beyond end of log"))?;
    let (record, _) = Record::decode(&data, 0).map_err(|e| corrupt_at(offset, e))?;

    Ok(record)
}

pub(crate) fn corrupt_at(offset: u64, err: CodecError) -> CoreError {
    match err {
        CodecError::CorruptRecord { reason } => CoreError::corrupt_record(offset, reason),
        other => CoreError::corrupt_record(offset, other.to_string()),
    }
}

fn past_end(offset: u64, err: StorageError, message: &str) -> CoreError {
    match err {
        StorageError::ReadPastEnd { .. } => CoreError::corrupt_record(offset, message),
        other => other.into(),
    }
}
