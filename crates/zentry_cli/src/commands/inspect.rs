//! Inspect command implementation.

use super::{format_size, open_log};
use serde::Serialize;
use std::path::Path;
use zentry_core::{rebuild, KeyKind, RecordLog};

/// Log inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Log path.
    pub path: String,
    /// Log size in bytes.
    pub log_size: u64,
    /// Records framed by the scan.
    pub record_count: usize,
    /// Tombstones among them.
    pub tombstones: usize,
    /// Keys with a current value.
    pub current_keys: usize,
    /// Closed history ranges.
    pub historical_keys: usize,
    /// Keys left without a current value by an interrupted supersession.
    pub interrupted_keys: usize,
    /// Records skipped as corrupt.
    pub corrupt_records: usize,
    /// Bytes after the last framed record.
    pub tail_bytes: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, log) = open_log(path)?;
    let result = inspect(path, &log)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn inspect(path: &Path, log: &RecordLog) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let (index, report) = rebuild(log, false)?;

    Ok(InspectResult {
        path: path.display().to_string(),
        log_size: log.size()?,
        record_count: report.records,
        tombstones: report.tombstones,
        current_keys: index.by_kind(KeyKind::Current).count(),
        historical_keys: index.historical_len(),
        interrupted_keys: report.interrupted.len(),
        corrupt_records: report.corrupt.len(),
        tail_bytes: report.tail.map_or(0, |tail| tail.bytes),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Zentry Log Inspection");
    println!("=====================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {}", format_size(result.log_size));
    println!();
    println!("Records:");
    println!("  Total:      {}", result.record_count);
    println!("  Tombstones: {}", result.tombstones);
    println!();
    println!("Keys:");
    println!("  Current:     {}", result.current_keys);
    println!("  Historical:  {}", result.historical_keys);
    println!("  Interrupted: {}", result.interrupted_keys);

    if result.corrupt_records > 0 || result.tail_bytes > 0 {
        println!();
        println!("Damage:");
        println!("  Corrupt records: {}", result.corrupt_records);
        println!("  Tail bytes:      {}", result.tail_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zentry_core::{LogicalKey, Store, Timestamp};

    #[test]
    fn counts_keys_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.log");
        {
            let store = Store::open(&path).unwrap();
            let pair = LogicalKey::new("USD -> IDR").unwrap();
            store
                .set_current(&pair, b"14000", Timestamp::from_micros(1))
                .unwrap();
            store
                .set_current(&pair, b"14500", Timestamp::from_micros(2))
                .unwrap();
            store.close().unwrap();
        }

        let (_lock, log) = open_log(&path).unwrap();
        let result = inspect(&path, &log).unwrap();
        assert_eq!(result.record_count, 4);
        assert_eq!(result.tombstones, 1);
        assert_eq!(result.current_keys, 1);
        assert_eq!(result.historical_keys, 1);
        assert_eq!(result.interrupted_keys, 0);
        assert_eq!(result.tail_bytes, 0);
    }
}
