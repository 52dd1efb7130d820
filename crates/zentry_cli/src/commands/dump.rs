//! Dump command implementation.

use super::{open_log, render_payload};
use serde::Serialize;
use std::path::Path;
use zentry_core::{CoreError, KeyKind, RecordLog, TombstoneMarker};

/// Log record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset in the log file.
    pub offset: u64,
    /// Encoded length in bytes.
    pub len: u64,
    /// `live`, `tombstone`, `corrupt` or `truncated`.
    pub record_type: String,
    /// Serialized tagged key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// `current` or `historical`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Record timestamp, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Rendered payload of a live record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Offset of the superseded record, for supersession tombstones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<u64>,
    /// Why a region could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordInfo {
    fn damaged(offset: u64, record_type: &str, error: String) -> Self {
        Self {
            offset,
            len: 0,
            record_type: record_type.to_string(),
            key: None,
            kind: None,
            timestamp: None,
            payload: None,
            supersedes: None,
            error: Some(error),
        }
    }
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    start_offset: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_lock, log) = open_log(path)?;
    let records = read_records(&log, start_offset, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn read_records(
    log: &RecordLog,
    start_offset: u64,
    limit: Option<usize>,
) -> Result<Vec<RecordInfo>, Box<dyn std::error::Error>> {
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    for item in log.scan_from(start_offset)? {
        if records.len() >= max_records {
            break;
        }
        let info = match item {
            Ok(entry) => {
                let record = entry.record;
                let (payload, supersedes) = if record.is_tombstone() {
                    let supersedes = match TombstoneMarker::decode(&record.payload) {
                        TombstoneMarker::Superseded { previous } => Some(previous),
                        TombstoneMarker::Delete => None,
                    };
                    (None, supersedes)
                } else {
                    (Some(render_payload(&record.payload)), None)
                };
                let kind = match record.key.kind() {
                    KeyKind::Current => "current",
                    KeyKind::Historical => "historical",
                };
                RecordInfo {
                    offset: entry.offset,
                    len: entry.len,
                    record_type: if record.is_tombstone() { "tombstone" } else { "live" }
                        .to_string(),
                    key: Some(record.key.to_string()),
                    kind: Some(kind.to_string()),
                    timestamp: record.timestamp.to_rfc3339().ok(),
                    payload,
                    supersedes,
                    error: None,
                }
            }
            Err(CoreError::CorruptRecord { offset, message }) => {
                RecordInfo::damaged(offset, "corrupt", message)
            }
            Err(CoreError::IncompleteTail { offset, remaining }) => RecordInfo::damaged(
                offset,
                "truncated",
                format!("{} bytes of an incomplete record", remaining),
            ),
            Err(other) => return Err(other.into()),
        };
        records.push(info);
    }

    Ok(records)
}

fn print_text_output(records: &[RecordInfo]) {
    println!("Log Records ({} total)", records.len());
    println!("================");
    println!();

    for record in records {
        print!("[{:08}] {:10}", record.offset, record.record_type);

        if let Some(ref key) = record.key {
            print!(" {}", key);
        }
        if let Some(ref timestamp) = record.timestamp {
            print!(" at={}", timestamp);
        }
        if let Some(previous) = record.supersedes {
            print!(" supersedes={}", previous);
        }
        if let Some(ref payload) = record.payload {
            print!(" payload={}", payload);
        }
        if let Some(ref error) = record.error {
            print!(" error={}", error);
        }

        println!();
    }
}
