//! Verify command implementation.

use super::open_log;
use std::path::Path;
use zentry_core::{rebuild, RecordLog, RecoveryReport, TailKind};

/// Verification result.
#[derive(Debug)]
pub struct VerifyResult {
    /// Number of records framed.
    pub records_checked: usize,
    /// Problems found, one line each.
    pub errors: Vec<String>,
    /// Conditions recovery repairs on its own.
    pub warnings: Vec<String>,
}

impl VerifyResult {
    fn from_report(report: &RecoveryReport) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for offset in &report.corrupt {
            errors.push(format!("Corrupt record skipped at offset {}", offset));
        }
        if let Some(tail) = report.tail {
            match tail.kind {
                TailKind::Incomplete => warnings.push(format!(
                    "Incomplete final record at offset {} ({} bytes), truncated on next open",
                    tail.offset, tail.bytes
                )),
                TailKind::Unreadable => errors.push(format!(
                    "Unreadable header at offset {}: {} bytes cannot be framed, store opens read-only",
                    tail.offset, tail.bytes
                )),
            }
        }
        for entry in &report.interrupted {
            warnings.push(format!(
                "Key {:?} has no current value: supersession stopped at {:?}",
                entry.key.as_str(),
                entry.state
            ));
        }

        Self {
            records_checked: report.records,
            errors,
            warnings,
        }
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying log at {:?}", path);
    println!();

    let (_lock, log) = open_log(path)?;
    let result = verify(&log)?;
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Log verification passed");
        Ok(())
    } else {
        println!("✗ Log verification failed");
        Err("Verification failed".into())
    }
}

fn verify(log: &RecordLog) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let (_, report) = rebuild(log, false)?;
    Ok(VerifyResult::from_report(&report))
}

fn print_result(result: &VerifyResult) {
    println!(
        "  Records checked: {}, errors: {}, warnings: {}",
        result.records_checked,
        result.errors.len(),
        result.warnings.len()
    );
    for error in &result.errors {
        println!("    ERROR: {}", error);
    }
    for warning in &result.warnings {
        println!("    WARN:  {}", warning);
    }
}
