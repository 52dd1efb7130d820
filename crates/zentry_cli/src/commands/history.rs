//! History command implementation.

use super::{open_log, render_payload};
use serde::Serialize;
use std::path::Path;
use zentry_core::{rebuild, LogicalKey, RecordLog, TaggedKey, Timestamp};

/// One value of a key and when it was in effect.
#[derive(Debug, Serialize)]
pub struct Period {
    /// Start of the range, RFC 3339.
    pub valid_from: String,
    /// End of the range, RFC 3339. None for the current value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
    /// Rendered payload.
    pub payload: String,
}

/// Current value and history of one key.
#[derive(Debug, Serialize)]
pub struct KeyHistory {
    /// Logical key.
    pub key: String,
    /// The value in effect now, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Period>,
    /// Superseded values, oldest first.
    pub history: Vec<Period>,
    /// Set when a supersession of this key was interrupted.
    pub interrupted: bool,
}

/// Runs the history command.
pub fn run(path: &Path, key: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let key = LogicalKey::new(key)?;
    let (_lock, log) = open_log(path)?;
    let result = history(&log, &key)?;

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

fn history(log: &RecordLog, key: &LogicalKey) -> Result<KeyHistory, Box<dyn std::error::Error>> {
    let (index, report) = rebuild(log, false)?;

    let current = match index.get(&TaggedKey::current(key.clone())) {
        Some(offset) => {
            let record = log.read_at(offset)?;
            Some(Period {
                valid_from: time(record.timestamp),
                valid_to: None,
                payload: render_payload(&record.payload),
            })
        }
        None => None,
    };

    let history = index
        .history(key)
        .map(|(valid_from, valid_to, offset)| {
            let record = log.read_at(offset)?;
            Ok(Period {
                valid_from: time(valid_from),
                valid_to: Some(time(valid_to)),
                payload: render_payload(&record.payload),
            })
        })
        .collect::<Result<Vec<_>, zentry_core::CoreError>>()?;

    Ok(KeyHistory {
        key: key.to_string(),
        current,
        history,
        interrupted: report.interrupted.iter().any(|entry| &entry.key == key),
    })
}

fn time(ts: Timestamp) -> String {
    ts.to_rfc3339().unwrap_or_else(|_| ts.to_string())
}

fn print_text_output(result: &KeyHistory) {
    println!("History of {:?}", result.key);
    println!();

    match &result.current {
        Some(current) => println!(
            "  current  since {}  {}",
            current.valid_from, current.payload
        ),
        None if result.interrupted => println!("  current  (none: supersession was interrupted)"),
        None => println!("  current  (none)"),
    }

    for period in result.history.iter().rev() {
        println!(
            "  [{}, {})  {}",
            period.valid_from,
            period.valid_to.as_deref().unwrap_or(""),
            period.payload
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zentry_core::Store;

    #[test]
    fn current_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.log");
        let pair = LogicalKey::new("USD -> IDR").unwrap();
        {
            let store = Store::open(&path).unwrap();
            for (i, rate) in ["14000", "14500", "15000"].iter().enumerate() {
                let at = Timestamp::from_micros((i as i64 + 1) * 1_000_000);
                store.set_current(&pair, rate.as_bytes(), at).unwrap();
            }
            store.close().unwrap();
        }

        let (_lock, log) = open_log(&path).unwrap();
        let result = history(&log, &pair).unwrap();
        assert_eq!(result.current.unwrap().payload, "\"15000\"");
        assert_eq!(result.history.len(), 2);
        assert_eq!(result.history[0].payload, "\"14000\"");
        assert_eq!(result.history[0].valid_to, Some(result.history[1].valid_from.clone()));
        assert!(!result.interrupted);
    }

    #[test]
    fn unknown_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.log");
        Store::open(&path).unwrap().close().unwrap();

        let (_lock, log) = open_log(&path).unwrap();
        let result = history(&log, &LogicalKey::new("EUR -> IDR").unwrap()).unwrap();
        assert!(result.current.is_none());
        assert!(result.history.is_empty());
    }
}
