//! Sequential log scanning.
//!
//! The scanner is the only recovery mechanism: it walks the log from a
//! record boundary, decoding one record at a time.
//!
//! # Error Handling
//!
//! - Running out of bytes inside a header or body yields
//!   [`CoreError::IncompleteTail`] and ends the scan, provided nothing in the
//!   remaining bytes frames as a record of its own
//! - A declared length that runs past the end of the log while a later
//!   record can still be framed yields [`CoreError::CorruptRecord`] and ends
//!   the scan: the length field is damaged, not the final append torn
//! - A header whose flag byte is invalid yields [`CoreError::CorruptRecord`]
//!   and ends the scan, since its lengths cannot be trusted
//! - A well-framed record whose key is not UTF-8 or not a valid tagged key
//!   yields [`CoreError::CorruptRecord`]; the scan then continues after the
//!   record's declared length

use super::{corrupt_at, LogInner};
use crate::error::{CoreError, CoreResult};
use parking_lot::RwLockReadGuard;
use zentry_codec::{Record, RecordHeader, RECORD_HEADER_SIZE};

/// One decoded record and where it sits in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Offset of the record's first byte.
    pub offset: u64,
    /// Encoded length in bytes.
    pub len: u64,
    /// The decoded record.
    pub record: Record,
}

/// A finite iterator over `(offset, record)` pairs.
///
/// Yields `Err` items for corrupt or incomplete records; check
/// [`LogScanner::is_finished`] after an error to learn whether the scan
/// skipped the record or stopped.
///
/// # Example
///
/// ```rust,ignore
/// for item in log.scan()? {
///     let entry = item?;
///     println!("{} {}", entry.offset, entry.record.key);
/// }
/// ```
pub struct LogScanner<'a> {
    inner: RwLockReadGuard<'a, LogInner>,
    size: u64,
    offset: u64,
    finished: bool,
}

impl<'a> LogScanner<'a> {
    pub(crate) fn new(inner: RwLockReadGuard<'a, LogInner>, offset: u64) -> CoreResult<Self> {
        let size = inner.backend.size()?;
        Ok(Self {
            inner,
            size,
            offset,
            finished: false,
        })
    }

    /// Returns the offset the next record is expected at.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Returns whether the scan has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished || self.offset >= self.size
    }

    fn read_next(&mut self) -> CoreResult<Option<LogEntry>> {
        let start = self.offset;
        if start >= self.size {
            return Ok(None);
        }

        let remaining = self.size - start;
        if remaining < RECORD_HEADER_SIZE as u64 {
            self.finished = true;
            return Err(CoreError::IncompleteTail {
                offset: start,
                remaining,
            });
        }

        let backend = self.inner.backend.as_ref();
        let header_bytes = backend.read_at(start, RECORD_HEADER_SIZE)?;
        let header = match RecordHeader::parse(&header_bytes) {
            Ok(header) => header,
            Err(err) => {
                self.finished = true;
                return Err(corrupt_at(start, err));
            }
        };

        let len = header.record_len();
        if len > remaining {
            self.finished = true;
            let region = backend.read_at(start, remaining as usize)?;
            if let Some(next) = later_record(&region) {
                return Err(CoreError::corrupt_record(
                    start,
                    format!(
                        "declared length {len} runs past the end of the log, \
                         but a record frames at offset {}",
                        start + next as u64
                    ),
                ));
            }
            return Err(CoreError::IncompleteTail {
                offset: start,
                remaining,
            });
        }

        let data = backend.read_at(start, len as usize)?;
        self.offset = start + len;

        let (record, _) = Record::decode(&data, 0).map_err(|err| corrupt_at(start, err))?;
        Ok(Some(LogEntry {
            offset: start,
            len,
            record,
        }))
    }
}

/// Returns the first position past the header of `region` at which a whole
/// record decodes.
///
/// A torn append leaves a prefix of a single record, so a hit means the
/// region holds records that were written after this one.
fn later_record(region: &[u8]) -> Option<usize> {
    (RECORD_HEADER_SIZE..region.len()).find(|&at| {
        matches!(region.get(at + RECORD_HEADER_SIZE), Some(b'C' | b'H'))
            && Record::decode(region, at).is_ok()
    })
}

impl Iterator for LogScanner<'_> {
    type Item = CoreResult<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_next() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                if err.is_io_failure() {
                    self.finished = true;
                }
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::CoreError;
    use crate::log::RecordLog;
    use zentry_codec::{LogicalKey, Record, TaggedKey, Timestamp};
    use zentry_storage::{InMemoryBackend, StorageBackend};

    fn record(name: &str, payload: u8) -> Record {
        Record::live(
            TaggedKey::current(LogicalKey::new(name).unwrap()),
            vec![payload],
            Timestamp::UNSET,
        )
    }

    fn log_over(bytes: Vec<u8>) -> RecordLog {
        RecordLog::new(
            Box::new(InMemoryBackend::with_data(bytes)),
            &Config::default(),
        )
    }

    fn encoded(records: &[Record]) -> Vec<u8> {
        records.iter().flat_map(|r| r.encode().unwrap()).collect()
    }

    #[test]
    fn empty_log_yields_nothing() {
        let log = log_over(Vec::new());
        assert_eq!(log.scan().unwrap().count(), 0);
    }

    #[test]
    fn scan_reports_offsets() {
        let records = [record("A", 1), record("B", 2), record("C", 3)];
        let log = log_over(encoded(&records));

        let entries: Vec<_> = log.scan().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[1].offset, entries[0].len);
        assert_eq!(entries[2].record, records[2]);
        for entry in &entries {
            assert_eq!(log.read_at(entry.offset).unwrap(), entry.record);
        }
    }

    #[test]
    fn scan_is_restartable() {
        let log = log_over(encoded(&[record("A", 1), record("B", 2)]));
        let first: Vec<_> = log.scan().unwrap().map(|r| r.unwrap()).collect();
        let second: Vec<_> = log.scan().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn truncated_final_record_is_incomplete_tail() {
        let mut bytes = encoded(&[record("A", 1), record("B", 2)]);
        let full = bytes.len();
        bytes.truncate(full - 1);
        let log = log_over(bytes);

        let items: Vec<_> = log.scan().unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(CoreError::IncompleteTail { remaining, .. }) if remaining > 0
        ));
    }

    #[test]
    fn truncated_header_is_incomplete_tail() {
        let mut bytes = encoded(&[record("A", 1)]);
        let boundary = bytes.len() as u64;
        bytes.extend_from_slice(&[0x01, 0x05]);
        let log = log_over(bytes);

        let mut scanner = log.scan().unwrap();
        assert!(scanner.next().unwrap().is_ok());
        assert!(matches!(
            scanner.next(),
            Some(Err(CoreError::IncompleteTail { offset, remaining: 2 })) if offset == boundary
        ));
        assert!(scanner.next().is_none());
        assert!(scanner.is_finished());
    }

    #[test]
    fn bad_key_is_skipped() {
        let mut bytes = encoded(&[record("A", 1), record("B", 2), record("C", 3)]);
        let second = record("A", 1).encode().unwrap().len();
        bytes[second + 15] = b'Q'; // "C[B]" becomes "Q[B]"
        let log = log_over(bytes);

        let mut scanner = log.scan().unwrap();
        assert!(scanner.next().unwrap().is_ok());
        assert!(matches!(
            scanner.next(),
            Some(Err(CoreError::CorruptRecord { offset, .. })) if offset == second as u64
        ));
        assert!(!scanner.is_finished());
        let last = scanner.next().unwrap().unwrap();
        assert_eq!(last.record, record("C", 3));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn bad_flag_stops_the_scan() {
        let mut bytes = encoded(&[record("A", 1), record("B", 2)]);
        let second = record("A", 1).encode().unwrap().len();
        bytes[second] = 0x42;
        let log = log_over(bytes);

        let mut scanner = log.scan().unwrap();
        assert!(scanner.next().unwrap().is_ok());
        assert!(matches!(scanner.next(), Some(Err(CoreError::CorruptRecord { .. }))));
        assert!(scanner.is_finished());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn damaged_length_before_intact_records_stops_the_scan() {
        let mut bytes = encoded(&[record("A", 1), record("B", 2), record("C", 3)]);
        let second = record("A", 1).encode().unwrap().len();
        bytes[second + 6] = 0x7f; // payload_len of B now runs past the end
        let log = log_over(bytes);

        let mut scanner = log.scan().unwrap();
        assert!(scanner.next().unwrap().is_ok());
        assert!(matches!(
            scanner.next(),
            Some(Err(CoreError::CorruptRecord { offset, .. })) if offset == second as u64
        ));
        assert!(scanner.is_finished());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn torn_final_record_with_full_header_is_incomplete_tail() {
        let mut bytes = encoded(&[record("A", 1)]);
        let boundary = bytes.len() as u64;
        let torn = record("LONGER -> KEY", 9).encode().unwrap();
        bytes.extend_from_slice(&torn[..torn.len() - 3]);
        let log = log_over(bytes);

        let items: Vec<_> = log.scan().unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            Err(CoreError::IncompleteTail { offset, .. }) if offset == boundary
        ));
    }

    #[test]
    fn scan_from_a_boundary() {
        let records = [record("A", 1), record("B", 2)];
        let log = log_over(encoded(&records));
        let second = records[0].encode().unwrap().len() as u64;

        let entries: Vec<_> = log.scan_from(second).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record, records[1]);
    }

    #[test]
    fn scanner_sees_size_at_start() {
        let backend = InMemoryBackend::with_data(encoded(&[record("A", 1)]));
        let log = RecordLog::new(Box::new(backend.clone()), &Config::default());
        let scanner = log.scan().unwrap();
        assert_eq!(scanner.position(), 0);
        assert_eq!(backend.size().unwrap(), scanner.size);
    }
}
