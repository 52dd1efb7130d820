//! Index rebuild from the record log.
//!
//! Rebuild replays every record in log order:
//! - a live record points its exact tagged key at its offset, shadowing any
//!   earlier offset for that key
//! - a tombstone removes its key from the index
//!
//! Alongside, each logical key's supersession state is tracked so that a
//! sequence cut short by a crash can be reported instead of silently losing
//! the key's current value.
//!
//! Rebuild reads the log and nothing else, so running it twice over the same
//! bytes yields the same index and the same report.

use crate::error::{CoreError, CoreResult};
use crate::index::KeyIndex;
use crate::log::{LogEntry, RecordLog};
use crate::version::{InterruptedSupersession, SupersessionState, TombstoneMarker};
use std::collections::BTreeMap;
use tracing::{info, warn};
use zentry_codec::{LogicalKey, TaggedKey};

/// How the end of a log was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailKind {
    /// The log ends part-way through a record.
    Incomplete,
    /// A header could not be parsed, so nothing after it can be framed.
    Unreadable,
}

/// Bytes at the end of the log that rebuild did not index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailLoss {
    /// Offset where the lost region starts.
    pub offset: u64,
    /// Length of the lost region.
    pub bytes: u64,
    /// Why it was lost.
    pub kind: TailKind,
}

/// What a rebuild found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records decoded.
    pub records: usize,
    /// Live keys in the rebuilt index.
    pub live: usize,
    /// Tombstone records seen.
    pub tombstones: usize,
    /// Offsets of corrupt records that were skipped.
    pub corrupt: Vec<u64>,
    /// The unindexed end of the log, if any.
    pub tail: Option<TailLoss>,
    /// Supersessions that never wrote their new current value.
    pub interrupted: Vec<InterruptedSupersession>,
}

impl RecoveryReport {
    /// Returns whether every byte of the log was indexed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.corrupt.is_empty() && self.tail.is_none() && self.interrupted.is_empty()
    }
}

/// Rebuilds the index by scanning the whole log.
///
/// # Errors
///
/// Returns an I/O error if the log cannot be read. With `strict` set, any
/// corrupt record fails the rebuild with [`CoreError::CorruptRecord`].
pub fn rebuild(log: &RecordLog, strict: bool) -> CoreResult<(KeyIndex, RecoveryReport)> {
    let mut index = KeyIndex::new();
    let mut report = RecoveryReport::default();
    let mut pending: BTreeMap<LogicalKey, InterruptedSupersession> = BTreeMap::new();

    let size = log.size()?;
    let mut scanner = log.scan()?;
    while let Some(item) = scanner.next() {
        match item {
            Ok(entry) => {
                report.records += 1;
                if entry.record.is_tombstone() {
                    report.tombstones += 1;
                }
                apply(&mut index, &mut pending, entry)?;
            }
            Err(CoreError::IncompleteTail { offset, remaining }) => {
                warn!(offset, bytes = remaining, "log ends inside a record");
                report.tail = Some(TailLoss {
                    offset,
                    bytes: remaining,
                    kind: TailKind::Incomplete,
                });
            }
            Err(CoreError::CorruptRecord { offset, message }) => {
                let fatal = scanner.is_finished();
                warn!(offset, %message, stopped = fatal, "corrupt record");
                if strict {
                    return Err(CoreError::CorruptRecord { offset, message });
                }
                if fatal {
                    report.tail = Some(TailLoss {
                        offset,
                        bytes: size.saturating_sub(offset),
                        kind: TailKind::Unreadable,
                    });
                } else {
                    report.corrupt.push(offset);
                }
            }
            Err(other) => return Err(other),
        }
    }
    drop(scanner);

    for mut interrupted in pending.into_values() {
        interrupted.previous_payload = log
            .read_at(interrupted.previous_offset)
            .ok()
            .filter(|record| !record.is_tombstone())
            .map(|record| record.payload);
        warn!(
            key = %interrupted.key,
            state = ?interrupted.state,
            previous_offset = interrupted.previous_offset,
            "interrupted supersession, key has no current value"
        );
        report.interrupted.push(interrupted);
    }

    report.live = index.len();
    info!(
        records = report.records,
        live = report.live,
        tombstones = report.tombstones,
        corrupt = report.corrupt.len(),
        interrupted = report.interrupted.len(),
        "index rebuilt"
    );

    Ok((index, report))
}

fn apply(
    index: &mut KeyIndex,
    pending: &mut BTreeMap<LogicalKey, InterruptedSupersession>,
    entry: LogEntry,
) -> CoreResult<()> {
    let LogEntry { offset, record, .. } = entry;

    if record.is_tombstone() {
        index.remove(&record.key);
        if let TaggedKey::Current(key) = &record.key {
            match TombstoneMarker::decode(&record.payload) {
                TombstoneMarker::Superseded { previous } => {
                    pending.insert(
                        key.clone(),
                        InterruptedSupersession {
                            key: key.clone(),
                            state: SupersessionState::PendingHistorical,
                            previous_offset: previous,
                            previous_payload: None,
                        },
                    );
                }
                TombstoneMarker::Delete => {
                    pending.remove(key);
                }
            }
        }
        return Ok(());
    }

    match &record.key {
        TaggedKey::Current(key) => {
            pending.remove(key);
        }
        TaggedKey::Historical { key, .. } => {
            if let Some(step) = pending.get_mut(key) {
                if step.state == SupersessionState::PendingHistorical {
                    step.state = step.state.next();
                }
            }
        }
    }
    index.put(record.key, offset)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use zentry_codec::{Record, Timestamp};
    use zentry_storage::InMemoryBackend;

    fn key(name: &str) -> LogicalKey {
        LogicalKey::new(name).unwrap()
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_micros(secs * 1_000_000)
    }

    fn log_of(records: &[Record]) -> RecordLog {
        let log = RecordLog::new(Box::new(InMemoryBackend::new()), &Config::default());
        for record in records {
            log.append(record).unwrap();
        }
        log
    }

    #[test]
    fn empty_log_is_clean() {
        let (index, report) = rebuild(&log_of(&[]), false).unwrap();
        assert!(index.is_empty());
        assert!(report.is_clean());
        assert_eq!(report.records, 0);
    }

    #[test]
    fn later_append_shadows_earlier() {
        let current = TaggedKey::current(key("A"));
        let log = log_of(&[
            Record::live(current.clone(), vec![1], ts(1)),
            Record::live(current.clone(), vec![2], ts(2)),
        ]);

        let (index, report) = rebuild(&log, false).unwrap();
        let offset = index.get(&current).unwrap();
        assert_eq!(log.read_at(offset).unwrap().payload, vec![2]);
        assert_eq!(report.live, 1);
    }

    #[test]
    fn tombstone_removes_key() {
        let current = TaggedKey::current(key("A"));
        let log = log_of(&[
            Record::live(current.clone(), vec![1], ts(1)),
            Record::tombstone(current.clone(), TombstoneMarker::Delete.encode()),
        ]);

        let (index, report) = rebuild(&log, false).unwrap();
        assert_eq!(index.get(&current), None);
        assert_eq!(report.tombstones, 1);
        assert!(report.interrupted.is_empty());
    }

    #[test]
    fn supersession_stopped_after_tombstone() {
        let current = TaggedKey::current(key("A"));
        let log = log_of(&[
            Record::live(current.clone(), vec![7], ts(1)),
            Record::tombstone(
                current.clone(),
                TombstoneMarker::Superseded { previous: 0 }.encode(),
            ),
        ]);

        let (index, report) = rebuild(&log, false).unwrap();
        assert!(index.is_empty());
        assert_eq!(report.interrupted.len(), 1);
        let interrupted = &report.interrupted[0];
        assert_eq!(interrupted.key, key("A"));
        assert_eq!(interrupted.state, SupersessionState::PendingHistorical);
        assert_eq!(interrupted.previous_payload, Some(vec![7]));
    }

    #[test]
    fn supersession_stopped_after_history() {
        let current = TaggedKey::current(key("A"));
        let historical = TaggedKey::historical(key("A"), ts(1), ts(2)).unwrap();
        let log = log_of(&[
            Record::live(current.clone(), vec![7], ts(1)),
            Record::tombstone(
                current.clone(),
                TombstoneMarker::Superseded { previous: 0 }.encode(),
            ),
            Record::live(historical.clone(), vec![7], ts(1)),
        ]);

        let (index, report) = rebuild(&log, false).unwrap();
        assert_eq!(index.get(&current), None);
        assert!(index.get(&historical).is_some());
        assert_eq!(report.interrupted[0].state, SupersessionState::PendingCurrent);
    }

    #[test]
    fn finished_supersession_is_not_reported() {
        let current = TaggedKey::current(key("A"));
        let historical = TaggedKey::historical(key("A"), ts(1), ts(2)).unwrap();
        let log = log_of(&[
            Record::live(current.clone(), vec![7], ts(1)),
            Record::tombstone(
                current.clone(),
                TombstoneMarker::Superseded { previous: 0 }.encode(),
            ),
            Record::live(historical, vec![7], ts(1)),
            Record::live(current.clone(), vec![8], ts(2)),
        ]);

        let (index, report) = rebuild(&log, false).unwrap();
        assert!(report.is_clean());
        assert_eq!(index.len(), 2);
        assert_eq!(report.records, 4);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let log = log_of(&[
            Record::live(TaggedKey::current(key("A")), vec![1], ts(1)),
            Record::live(TaggedKey::current(key("B")), vec![2], ts(1)),
            Record::tombstone(TaggedKey::current(key("A")), Vec::new()),
        ]);

        let first = rebuild(&log, false).unwrap();
        let second = rebuild(&log, false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn strict_rebuild_fails_on_corruption() {
        let mut bytes = Record::live(TaggedKey::current(key("A")), vec![1], ts(1))
            .encode()
            .unwrap();
        bytes[15] = b'Z';
        let log = RecordLog::new(
            Box::new(InMemoryBackend::with_data(bytes)),
            &Config::default(),
        );

        assert!(matches!(
            rebuild(&log, true),
            Err(CoreError::CorruptRecord { offset: 0, .. })
        ));
        let (_, report) = rebuild(&log, false).unwrap();
        assert_eq!(report.corrupt, vec![0]);
    }
}
