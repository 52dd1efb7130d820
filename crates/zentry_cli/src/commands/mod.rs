//! CLI command implementations.

pub mod dump;
pub mod history;
pub mod inspect;
pub mod verify;

use std::path::Path;
use zentry_core::{Config, LogLock, RecordLog};
use zentry_storage::FileBackend;

/// Opens an existing log for read-only maintenance.
///
/// The returned lock keeps a running store from writing underneath us. The
/// log is never truncated here, even if it ends in a partial record.
pub fn open_log(path: &Path) -> Result<(LogLock, RecordLog), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No log found at {:?}", path).into());
    }

    let lock = LogLock::acquire(path)?;
    let backend = FileBackend::open(path)?;
    Ok((lock, RecordLog::new(Box::new(backend), &Config::default())))
}

/// Renders a payload as text when it is printable UTF-8, hex otherwise.
pub fn render_payload(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => format!("{:?}", text),
        _ => hex_encode(payload),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
