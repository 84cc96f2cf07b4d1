//! Append-only audit log writer
//!
//! The log file is line-delimited JSON (JSONL): one entry per line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::error::{BankError, BankResult};

use super::entry::AuditEntry;

/// Handles writing audit entries to the audit log file
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append a single entry and flush
    pub fn log(&self, entry: &AuditEntry) -> BankResult<()> {
        self.log_batch(std::slice::from_ref(entry))
    }

    /// Append all entries of one committed unit of work, flushing once
    pub fn log_batch(&self, entries: &[AuditEntry]) -> BankResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| BankError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut buffer = String::new();
        for entry in entries {
            let json = serde_json::to_string(entry)
                .map_err(|e| BankError::Json(format!("Failed to serialize audit entry: {}", e)))?;
            buffer.push_str(&json);
            buffer.push('\n');
        }

        file.write_all(buffer.as_bytes())
            .map_err(|e| BankError::Io(format!("Failed to write audit entries: {}", e)))?;

        file.flush()
            .map_err(|e| BankError::Io(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Read all entries, oldest first
    pub fn read_all(&self) -> BankResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| BankError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                BankError::Io(format!(
                    "Failed to read audit log line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                BankError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Read the most recent N entries
    pub fn read_recent(&self, count: usize) -> BankResult<Vec<AuditEntry>> {
        let mut all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries.split_off(start))
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}
