//! Exclusive ownership of a log file.
//!
//! A store holds an advisory lock on `<log>.lock` for as long as it is open:
//!
//! ```text
//! <dir>/
//! ├─ ledger.log        # the record log
//! └─ ledger.log.lock   # held exclusively by the open store
//! ```
//!
//! The lock is per open file handle, so a second store over the same log is
//! refused even inside one process.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds the exclusive lock on a log file until dropped.
#[derive(Debug)]
pub struct LogLock {
    log_path: PathBuf,
    _lock_file: File,
}

impl LogLock {
    /// Acquires the lock for `log_path` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StoreLocked`] if another handle holds the lock,
    /// or an I/O error if the lock file cannot be opened.
    pub fn acquire(log_path: &Path) -> CoreResult<Self> {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path_for(log_path))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked {
                path: log_path.to_path_buf(),
            });
        }

        Ok(Self {
            log_path: log_path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path of the locked log.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Returns the sidecar lock path for a log file.
#[must_use]
pub fn lock_path_for(log_path: &Path) -> PathBuf {
    let mut name = OsString::from(log_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_path_is_sidecar() {
        assert_eq!(
            lock_path_for(Path::new("/books/ledger.log")),
            PathBuf::from("/books/ledger.log.lock")
        );
    }

    #[test]
    fn second_lock_is_refused() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("ledger.log");

        let first = LogLock::acquire(&log).unwrap();
        assert_eq!(first.log_path(), log);

        let second = LogLock::acquire(&log);
        assert!(matches!(second, Err(CoreError::StoreLocked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("ledger.log");

        drop(LogLock::acquire(&log).unwrap());
        assert!(LogLock::acquire(&log).is_ok());
    }

    #[test]
    fn different_logs_coexist() {
        let dir = tempdir().unwrap();
        let _a = LogLock::acquire(&dir.path().join("a.log")).unwrap();
        let _b = LogLock::acquire(&dir.path().join("b.log")).unwrap();
    }
}
