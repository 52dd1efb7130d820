//! Store facade and the versioning coordinator.

use crate::config::Config;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::KeyIndex;
use crate::lock::LogLock;
use crate::log::RecordLog;
use crate::recovery::{self, RecoveryReport, TailKind};
use crate::version::{
    HistoryEntry, InterruptedSupersession, SetOutcome, SupersessionState, TombstoneMarker,
};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zentry_codec::{KeyKind, LogicalKey, Record, TaggedKey, Timestamp};
use zentry_storage::{FileBackend, InMemoryBackend, StorageBackend};

/// The main store handle.
///
/// `Store` owns one record log and the index rebuilt from it. It provides:
/// - Versioned facts (`set_current`, `get_current`, `get_history`)
/// - Plain keyed values (`put`, `get`, `delete`) for unversioned entities
/// - Ordered listings by key kind
///
/// # Opening a Store
///
/// ```rust,ignore
/// use zentry_core::{Store, LogicalKey, Timestamp};
///
/// let store = Store::open("books/ledger.log")?;
/// let pair = LogicalKey::new("USD -> IDR")?;
/// store.set_current(&pair, b"14000", Timestamp::now())?;
/// store.close()?;
/// ```
///
/// # Concurrency
///
/// Writes are serialized by one store-wide lock, so the appends of two
/// supersessions never interleave. Reads share the index lock and only see
/// an offset after its record is fully appended.
pub struct Store {
    config: Config,
    /// Log file path. None for stores over a caller-supplied backend.
    path: Option<PathBuf>,
    /// Held for the store's lifetime when opened from a path.
    _lock: Option<LogLock>,
    log: RecordLog,
    state: RwLock<StoreState>,
    write_lock: Mutex<()>,
    report: RecoveryReport,
    /// Set when the log has bytes that could not be framed.
    read_only: Option<String>,
    is_open: RwLock<bool>,
}

#[derive(Debug, Default)]
struct StoreState {
    index: KeyIndex,
    interrupted: BTreeMap<LogicalKey, InterruptedSupersession>,
}

/// The appends one `set_current` call will make.
struct SetPlan {
    key: LogicalKey,
    payload: Vec<u8>,
    now: Timestamp,
    superseding: Option<Superseding>,
    /// Range of the interrupted supersession a new current record finishes.
    completes: Option<Range<Timestamp>>,
}

/// The current value a `set_current` call moves into history.
struct Superseding {
    /// Offset of the superseded `C[k]` record.
    offset: u64,
    previous: Record,
    historical_key: TaggedKey,
    /// `PendingTombstone` for a new sequence, `PendingHistorical` to finish
    /// an interrupted one.
    from: SupersessionState,
}

/// Point-in-time counts for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Live `Current` keys.
    pub current: usize,
    /// Live `Historical` keys.
    pub historical: usize,
    /// Keys waiting to be re-set after an interrupted supersession.
    pub interrupted: usize,
    /// Log size in bytes.
    pub log_bytes: u64,
}

impl Store {
    /// Opens the log file at `path`, creating it if needed.
    ///
    /// The method:
    /// - Takes an exclusive lock on `<path>.lock`
    /// - Rebuilds the index from the log
    /// - Cuts off a record left incomplete by a crash
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another store holds the log (`StoreLocked`)
    /// - Recovery is strict and a record is corrupt (`CorruptRecord`)
    /// - I/O errors occur
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the log file at `path` with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use zentry_core::{Config, Store, SyncMode};
    ///
    /// let config = Config::default()
    ///     .sync_mode(SyncMode::Batched { max_pending: 64 })
    ///     .strict_recovery(true);
    /// let store = Store::open_with_config("ledger.log", config)?;
    /// ```
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            if !config.create_if_missing {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "{} does not exist and create_if_missing is false",
                        path.display()
                    ),
                )));
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let lock = LogLock::acquire(path)?;
        let backend = FileBackend::open(path)?;
        let mut store = Self::build(Box::new(backend), config)?;
        store.path = Some(path.to_path_buf());
        store._lock = Some(lock);
        Ok(store)
    }

    /// Opens a fresh in-memory store for testing.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::with_backend(Box::new(InMemoryBackend::new()), Config::default())
    }

    /// Opens a store over an existing backend.
    ///
    /// No lock is taken; the caller owns exclusive access to the backend.
    pub fn with_backend(backend: Box<dyn StorageBackend>, config: Config) -> CoreResult<Self> {
        Self::build(backend, config)
    }

    fn build(backend: Box<dyn StorageBackend>, config: Config) -> CoreResult<Self> {
        let log = RecordLog::new(backend, &config);
        let (index, report) = recovery::rebuild(&log, config.strict_recovery)?;

        let mut read_only = None;
        if let Some(tail) = report.tail {
            match tail.kind {
                TailKind::Incomplete => {
                    warn!(
                        offset = tail.offset,
                        bytes = tail.bytes,
                        "discarding incomplete final record"
                    );
                    log.discard_tail(tail.offset)?;
                }
                TailKind::Unreadable => {
                    warn!(
                        offset = tail.offset,
                        bytes = tail.bytes,
                        "unreadable log tail, opening read-only"
                    );
                    read_only = Some(format!(
                        "{} unreadable bytes at offset {}",
                        tail.bytes, tail.offset
                    ));
                }
            }
        }

        let interrupted = report
            .interrupted
            .iter()
            .map(|entry| (entry.key.clone(), entry.clone()))
            .collect();

        Ok(Self {
            config,
            path: None,
            _lock: None,
            log,
            state: RwLock::new(StoreState { index, interrupted }),
            write_lock: Mutex::new(()),
            report,
            read_only,
            is_open: RwLock::new(true),
        })
    }

    // === Versioned facts ===

    /// Makes `payload` the current value of `key`, effective from `now`.
    ///
    /// If `key` already has a current value effective from `t0`, that value
    /// is tombstoned, copied into history as `[t0, now)`, and replaced. The
    /// three appends happen under the store's write lock; readers see the
    /// old state or the new one, never a mix.
    ///
    /// A key left by an interrupted supersession is completed rather than
    /// recreated. If its historical copy is missing it is written now. If
    /// only the new current record is missing, `now` may not precede the
    /// end of the latest historical range, and the value is recorded as
    /// effective from that end so history stays gap-free.
    ///
    /// # Errors
    ///
    /// - `StaleTimestamp` if `now` is not later than `t0`, or earlier than
    ///   the end of the key's latest historical range
    /// - `TimestampOutOfRange` if `now` cannot appear in a historical key
    /// - `PayloadTooLarge` if `payload` exceeds the configured maximum
    /// - `ReadOnly` or `StoreClosed` if writes are refused
    /// - An I/O error if an append fails. A failure after the first append
    ///   leaves `key` with no current value; it is then listed by
    ///   [`Store::interrupted`] until set again.
    pub fn set_current(
        &self,
        key: &LogicalKey,
        payload: &[u8],
        now: Timestamp,
    ) -> CoreResult<SetOutcome> {
        self.ensure_writable()?;
        let _guard = self.write_lock.lock();

        let plan = self.plan_set(key, payload, now)?;
        self.apply_set(plan)
    }

    /// Sets several distinct keys under one hold of the write lock.
    ///
    /// Every fact is checked before the first append, so a stale or
    /// oversized one fails the call with nothing written.
    pub(crate) fn set_current_all(
        &self,
        facts: &[(LogicalKey, Vec<u8>, Timestamp)],
    ) -> CoreResult<Vec<SetOutcome>> {
        self.ensure_writable()?;
        let _guard = self.write_lock.lock();

        let plans = facts
            .iter()
            .map(|(key, payload, now)| self.plan_set(key, payload, *now))
            .collect::<CoreResult<Vec<_>>>()?;
        plans.into_iter().map(|plan| self.apply_set(plan)).collect()
    }

    /// Decides what setting `key` takes without appending anything.
    ///
    /// Called with the write lock held.
    fn plan_set(&self, key: &LogicalKey, payload: &[u8], now: Timestamp) -> CoreResult<SetPlan> {
        self.check_payload(payload)?;
        now.to_rfc3339()?;

        let current_key = TaggedKey::current(key.clone());
        let (existing, pending, last_range) = {
            let state = self.state.read();
            let pending = state.interrupted.get(key).map(|entry| {
                (
                    entry.state,
                    entry.previous_offset,
                    entry.previous_payload.is_some(),
                )
            });
            let last_range = state.index.history(key).last().map(|(from, to, _)| from..to);
            (state.index.get(&current_key), pending, last_range)
        };

        let superseded = match (existing, pending) {
            (Some(offset), _) => Some((offset, SupersessionState::PendingTombstone)),
            (None, Some((SupersessionState::PendingHistorical, offset, true))) => {
                Some((offset, SupersessionState::PendingHistorical))
            }
            _ => None,
        };

        let Some((offset, from)) = superseded else {
            if let Some(range) = last_range.as_ref().filter(|range| now < range.end) {
                return Err(CoreError::StaleTimestamp {
                    key: key.to_string(),
                    effective_from: range.end,
                    now,
                });
            }
            // Only the new current record is missing; it takes over where
            // the history ends.
            let completes = match pending {
                Some((SupersessionState::PendingCurrent, _, _)) => last_range,
                _ => None,
            };
            return Ok(SetPlan {
                key: key.clone(),
                payload: payload.to_vec(),
                now: completes.as_ref().map_or(now, |range| range.end),
                superseding: None,
                completes,
            });
        };

        let previous = self.read_live(offset, &current_key)?;
        let effective_from = previous.timestamp;
        if now <= effective_from {
            return Err(CoreError::StaleTimestamp {
                key: key.to_string(),
                effective_from,
                now,
            });
        }
        self.check_payload(&previous.payload)?;
        let historical_key = TaggedKey::historical(key.clone(), effective_from, now)?;

        Ok(SetPlan {
            key: key.clone(),
            payload: payload.to_vec(),
            now,
            superseding: Some(Superseding {
                offset,
                previous,
                historical_key,
                from,
            }),
            completes: None,
        })
    }

    /// Makes the appends of `plan` and mirrors the ones that landed.
    fn apply_set(&self, plan: SetPlan) -> CoreResult<SetOutcome> {
        let SetPlan {
            key,
            payload,
            now,
            superseding,
            completes,
        } = plan;
        let current_key = TaggedKey::current(key.clone());

        let Some(old) = superseding else {
            let offset = self
                .log
                .append(&Record::live(current_key.clone(), payload, now))?;
            let mut state = self.state.write();
            state.index.put(current_key, offset)?;
            state.interrupted.remove(&key);
            return Ok(match completes {
                Some(previous) => {
                    debug!(key = %key, offset, "completed interrupted supersession");
                    SetOutcome::Superseded { previous }
                }
                None => {
                    debug!(key = %key, offset, "created current value");
                    SetOutcome::Created
                }
            });
        };

        let effective_from = old.previous.timestamp;
        let marker = TombstoneMarker::Superseded {
            previous: old.offset,
        };
        let steps = [
            Record::tombstone(current_key.clone(), marker.encode()),
            Record::live(
                old.historical_key.clone(),
                old.previous.payload.clone(),
                effective_from,
            ),
            Record::live(current_key.clone(), payload, now),
        ];
        let first_step = match old.from {
            SupersessionState::PendingHistorical => {
                debug!(key = %key, "completing interrupted supersession");
                1
            }
            _ => 0,
        };

        let mut phase = old.from;
        let mut offsets: [Option<u64>; 3] = [None; 3];
        let mut failure = None;
        for (step, record) in steps.iter().enumerate().skip(first_step) {
            match self.log.append(record) {
                Ok(offset) => {
                    offsets[step] = Some(offset);
                    phase = phase.next();
                    debug!(key = %key, offset, state = ?phase, "supersession step appended");
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        {
            // Mirror exactly what reached the log.
            let mut state = self.state.write();
            if offsets[0].is_some() {
                state.index.remove(&current_key);
            }
            if let Some(offset) = offsets[1] {
                state.index.put(old.historical_key, offset)?;
            }
            if let Some(offset) = offsets[2] {
                state.index.put(current_key, offset)?;
            }

            if phase.is_done() {
                state.interrupted.remove(&key);
            } else if phase != SupersessionState::PendingTombstone {
                warn!(key = %key, state = ?phase, "supersession interrupted");
                state.interrupted.insert(
                    key.clone(),
                    InterruptedSupersession {
                        key: key.clone(),
                        state: phase,
                        previous_offset: old.offset,
                        previous_payload: Some(old.previous.payload),
                    },
                );
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        Ok(SetOutcome::Superseded {
            previous: effective_from..now,
        })
    }

    /// Returns the current value of `key`.
    pub fn get_current(&self, key: &LogicalKey) -> CoreResult<Option<Vec<u8>>> {
        self.get(key)
    }

    /// Returns the effective start of the current value of `key`.
    pub fn current_since(&self, key: &LogicalKey) -> CoreResult<Option<Timestamp>> {
        self.ensure_open()?;
        let current_key = TaggedKey::current(key.clone());
        let Some(offset) = self.state.read().index.get(&current_key) else {
            return Ok(None);
        };
        Ok(Some(self.read_live(offset, &current_key)?.timestamp))
    }

    /// Returns the superseded values of `key`, oldest first.
    ///
    /// Consecutive entries are contiguous: each `valid_to` equals the next
    /// entry's `valid_from`.
    pub fn get_history(&self, key: &LogicalKey) -> CoreResult<Vec<HistoryEntry>> {
        self.ensure_open()?;
        let ranges: Vec<_> = self.state.read().index.history(key).collect();

        ranges
            .into_iter()
            .map(|(valid_from, valid_to, offset)| {
                let expected = TaggedKey::Historical {
                    key: key.clone(),
                    valid_from,
                    valid_to,
                };
                let record = self.read_live(offset, &expected)?;
                Ok(HistoryEntry {
                    valid_from,
                    valid_to,
                    payload: record.payload,
                })
            })
            .collect()
    }

    /// Lists every live key of one kind with its payload, in key order.
    pub fn list_by_prefix(&self, kind: KeyKind) -> CoreResult<Vec<(TaggedKey, Vec<u8>)>> {
        self.ensure_open()?;
        let entries: Vec<_> = self
            .state
            .read()
            .index
            .by_kind(kind)
            .map(|(key, offset)| (key.clone(), offset))
            .collect();

        entries
            .into_iter()
            .map(|(key, offset)| {
                let record = self.read_live(offset, &key)?;
                Ok((key, record.payload))
            })
            .collect()
    }

    // === Plain values ===

    /// Stores `payload` under `key`, shadowing any earlier value.
    ///
    /// Unlike [`Store::set_current`] this writes no history.
    pub fn put(&self, key: &LogicalKey, payload: &[u8]) -> CoreResult<()> {
        self.ensure_writable()?;
        self.check_payload(payload)?;
        let _guard = self.write_lock.lock();

        let current_key = TaggedKey::current(key.clone());
        let offset = self.log.append(&Record::live(
            current_key.clone(),
            payload.to_vec(),
            Timestamp::now(),
        ))?;

        let mut state = self.state.write();
        state.index.put(current_key, offset)?;
        state.interrupted.remove(key);
        Ok(())
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &LogicalKey) -> CoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let current_key = TaggedKey::current(key.clone());
        let Some(offset) = self.state.read().index.get(&current_key) else {
            return Ok(None);
        };
        Ok(Some(self.read_live(offset, &current_key)?.payload))
    }

    /// Deletes `key` by appending a tombstone.
    ///
    /// Returns whether a value was live. History is kept.
    pub fn delete(&self, key: &LogicalKey) -> CoreResult<bool> {
        self.ensure_writable()?;
        let _guard = self.write_lock.lock();

        let current_key = TaggedKey::current(key.clone());
        if !self.state.read().index.contains(&current_key) {
            return Ok(false);
        }

        let offset = self.log.append(&Record::tombstone(
            current_key.clone(),
            TombstoneMarker::Delete.encode(),
        ))?;

        let mut state = self.state.write();
        state.index.remove(&current_key);
        state.interrupted.remove(key);
        debug!(key = %key, offset, "deleted");
        Ok(true)
    }

    /// Stores a typed entity under its own key.
    pub fn put_entity<E: Entity>(&self, entity: &E) -> CoreResult<()> {
        let key = entity.logical_key()?;
        self.put(&key, &entity.encode()?)
    }

    /// Loads a typed entity.
    pub fn get_entity<E: Entity>(&self, key: &LogicalKey) -> CoreResult<Option<E>> {
        self.get(key)?.map(|bytes| E::decode(&bytes)).transpose()
    }

    // === Lifecycle and diagnostics ===

    /// Returns keys left without a current value by an interrupted
    /// supersession, in key order.
    #[must_use]
    pub fn interrupted(&self) -> Vec<InterruptedSupersession> {
        self.state.read().interrupted.values().cloned().collect()
    }

    /// Returns what the rebuild at open found.
    #[must_use]
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.report
    }

    /// Returns point-in-time counts.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let state = self.state.read();
        Ok(StoreStats {
            current: state.index.by_kind(KeyKind::Current).count(),
            historical: state.index.historical_len(),
            interrupted: state.interrupted.len(),
            log_bytes: self.log.size()?,
        })
    }

    /// Returns the log file path, if the store was opened from one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying record log.
    #[must_use]
    pub fn log(&self) -> &RecordLog {
        &self.log
    }

    /// Returns whether writes are refused because of an unreadable tail.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.is_some()
    }

    /// Forces every appended record to durable storage.
    pub fn sync(&self) -> CoreResult<()> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock();
        self.log.sync()
    }

    /// Closes the store. Further calls are no-ops.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        let _guard = self.write_lock.lock();
        self.log.sync()?;

        *is_open = false;
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::StoreClosed)
        }
    }

    fn ensure_writable(&self) -> CoreResult<()> {
        self.ensure_open()?;
        match &self.read_only {
            Some(reason) => Err(CoreError::ReadOnly {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_payload(&self, payload: &[u8]) -> CoreResult<()> {
        if payload.len() > self.config.max_payload_len as usize {
            return Err(CoreError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload_len,
            });
        }
        Ok(())
    }

    /// Reads the record at `offset`, which the index says is live for `expected`.
    fn read_live(&self, offset: u64, expected: &TaggedKey) -> CoreResult<Record> {
        let record = self.log.read_at(offset)?;
        if record.is_tombstone() || &record.key != expected {
            return Err(CoreError::corrupt_record(
                offset,
                format!("index entry for {expected} points at a different record"),
            ));
        }
        Ok(record)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("live", &self.state.read().index.len())
            .field("read_only", &self.read_only)
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> LogicalKey {
        LogicalKey::new(name).unwrap()
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_micros(secs * 1_000_000)
    }

    #[test]
    fn set_current_creates_then_supersedes() {
        let store = Store::open_in_memory().unwrap();
        let pair = key("USD -> IDR");

        assert_eq!(
            store.set_current(&pair, b"14000", ts(100)).unwrap(),
            SetOutcome::Created
        );
        assert_eq!(store.get_current(&pair).unwrap(), Some(b"14000".to_vec()));

        assert_eq!(
            store.set_current(&pair, b"14500", ts(200)).unwrap(),
            SetOutcome::Superseded {
                previous: ts(100)..ts(200)
            }
        );
        assert_eq!(store.get_current(&pair).unwrap(), Some(b"14500".to_vec()));
        assert_eq!(store.current_since(&pair).unwrap(), Some(ts(200)));

        let history = store.get_history(&pair).unwrap();
        assert_eq!(
            history,
            vec![HistoryEntry {
                valid_from: ts(100),
                valid_to: ts(200),
                payload: b"14000".to_vec(),
            }]
        );
    }

    #[test]
    fn stale_timestamp_writes_nothing() {
        let store = Store::open_in_memory().unwrap();
        let pair = key("A");
        store.set_current(&pair, b"1", ts(10)).unwrap();
        let size = store.log().size().unwrap();

        for now in [ts(10), ts(5)] {
            assert!(matches!(
                store.set_current(&pair, b"2", now),
                Err(CoreError::StaleTimestamp { .. })
            ));
        }
        assert_eq!(store.log().size().unwrap(), size);
        assert_eq!(store.get_current(&pair).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_current(&key("nope")).unwrap(), None);
        assert!(store.get_history(&key("nope")).unwrap().is_empty());
        assert_eq!(store.current_since(&key("nope")).unwrap(), None);
    }

    #[test]
    fn put_get_delete() {
        let store = Store::open_in_memory().unwrap();
        let account = key("account:cash");

        store.put(&account, b"v1").unwrap();
        store.put(&account, b"v2").unwrap();
        assert_eq!(store.get(&account).unwrap(), Some(b"v2".to_vec()));
        assert!(store.get_history(&account).unwrap().is_empty());

        assert!(store.delete(&account).unwrap());
        assert_eq!(store.get(&account).unwrap(), None);
        assert!(!store.delete(&account).unwrap());
    }

    #[test]
    fn list_by_prefix_separates_kinds() {
        let store = Store::open_in_memory().unwrap();
        store.set_current(&key("B"), b"b1", ts(1)).unwrap();
        store.set_current(&key("A"), b"a1", ts(1)).unwrap();
        store.set_current(&key("A"), b"a2", ts(2)).unwrap();

        let current = store.list_by_prefix(KeyKind::Current).unwrap();
        assert_eq!(
            current,
            vec![
                (TaggedKey::current(key("A")), b"a2".to_vec()),
                (TaggedKey::current(key("B")), b"b1".to_vec()),
            ]
        );

        let historical = store.list_by_prefix(KeyKind::Historical).unwrap();
        assert_eq!(historical.len(), 1);
        assert_eq!(
            historical[0].0,
            TaggedKey::historical(key("A"), ts(1), ts(2)).unwrap()
        );
    }

    #[test]
    fn oversized_payload_rejected() {
        let store = Store::with_backend(
            Box::new(InMemoryBackend::new()),
            Config::default().max_payload_len(2),
        )
        .unwrap();

        assert!(matches!(
            store.set_current(&key("A"), b"abc", ts(1)),
            Err(CoreError::PayloadTooLarge { len: 3, max: 2 })
        ));
        assert!(matches!(
            store.put(&key("A"), b"abc"),
            Err(CoreError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn closed_store_refuses_operations() {
        let store = Store::open_in_memory().unwrap();
        store.put(&key("A"), b"1").unwrap();
        store.close().unwrap();
        store.close().unwrap();

        assert!(!store.is_open());
        assert!(matches!(store.get(&key("A")), Err(CoreError::StoreClosed)));
        assert!(matches!(
            store.put(&key("A"), b"2"),
            Err(CoreError::StoreClosed)
        ));
    }

    #[test]
    fn stats_counts_kinds() {
        let store = Store::open_in_memory().unwrap();
        store.set_current(&key("A"), b"1", ts(1)).unwrap();
        store.set_current(&key("A"), b"2", ts(2)).unwrap();
        store.set_current(&key("A"), b"3", ts(3)).unwrap();
        store.put(&key("B"), b"x").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.current, 2);
        assert_eq!(stats.historical, 2);
        assert_eq!(stats.interrupted, 0);
        assert_eq!(stats.log_bytes, store.log().size().unwrap());
    }

    #[test]
    fn reopen_over_same_backend_sees_same_state() {
        let backend = InMemoryBackend::new();
        let store = Store::with_backend(Box::new(backend.clone()), Config::default()).unwrap();
        store.set_current(&key("A"), b"1", ts(1)).unwrap();
        store.set_current(&key("A"), b"2", ts(2)).unwrap();
        drop(store);

        let reopened = Store::with_backend(Box::new(backend), Config::default()).unwrap();
        assert_eq!(reopened.get_current(&key("A")).unwrap(), Some(b"2".to_vec()));
        assert_eq!(reopened.get_history(&key("A")).unwrap().len(), 1);
        assert!(reopened.recovery_report().is_clean());
    }

    #[test]
    fn unrenderable_time_is_rejected_before_writing() {
        let store = Store::open_in_memory().unwrap();
        let beyond = Timestamp::from_micros(Timestamp::MAX.as_micros() + 1);

        assert!(matches!(
            store.set_current(&key("A"), b"1", beyond),
            Err(CoreError::Codec(
                zentry_codec::CodecError::TimestampOutOfRange { .. }
            ))
        ));
        assert_eq!(store.log().size().unwrap(), 0);

        // The latest renderable instant still leaves room to supersede.
        store.set_current(&key("A"), b"1", ts(1)).unwrap();
        store.set_current(&key("A"), b"2", Timestamp::MAX).unwrap();
        assert_eq!(store.get_history(&key("A")).unwrap()[0].valid_to, Timestamp::MAX);
    }

    #[test]
    fn reset_after_delete_cannot_overlap_history() {
        let store = Store::open_in_memory().unwrap();
        let pair = key("USD -> IDR");
        store.set_current(&pair, b"1", ts(10)).unwrap();
        store.set_current(&pair, b"2", ts(20)).unwrap();
        assert!(store.delete(&pair).unwrap());

        assert!(matches!(
            store.set_current(&pair, b"3", ts(15)),
            Err(CoreError::StaleTimestamp { effective_from, .. }) if effective_from == ts(20)
        ));
        assert_eq!(
            store.set_current(&pair, b"3", ts(20)).unwrap(),
            SetOutcome::Created
        );
    }
}
