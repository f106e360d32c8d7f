//! The user-facing activity log.
//!
//! Entries are kept in memory for the log panel and appended as JSON
//! lines to a session file in the temp directory. The file lives as
//! long as the `ActivityLog` and is removed when it is dropped.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::error::Result;

/// Severity of a log line; also picks its colour in the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Success,
    /// Work in progress: tool output, starts, lookups
    Retry,
    Error,
}

impl LogLevel {
    /// RGB for the log panel: green, orange, red
    pub fn rgb(self) -> [u8; 3] {
        match self {
            LogLevel::Success => [0x2e, 0xcc, 0x71],
            LogLevel::Retry => [0xff, 0xa5, 0x00],
            LogLevel::Error => [0xe7, 0x4c, 0x3c],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub status: LogLevel,
    pub message: String,
}

pub struct ActivityLog {
    entries: Vec<LogEntry>,
    file: NamedTempFile,
}

impl ActivityLog {
    /// Creates an empty `shrine_log_*.jsonl` file in the system temp dir
    pub fn create() -> Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn create_in(dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("shrine_log_")
            .suffix(".jsonl")
            .tempfile_in(dir)?;
        info!(path = %file.path().display(), "activity log created");
        Ok(Self {
            entries: Vec::new(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Records a line. A failing disk write is traced but never stops the session.
    pub fn push(&mut self, status: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Local::now(),
            status,
            message: message.into(),
        };
        match status {
            LogLevel::Error => warn!(target: "activity", "{}", entry.message),
            _ => info!(target: "activity", "{}", entry.message),
        }
        if let Err(e) = self.append(&entry) {
            error!(error = %e, "failed to write activity log");
        }
        self.entries.push(entry);
    }

    fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(self.file.path())?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Clears the panel and truncates the file
    pub fn reset(&mut self) -> Result<()> {
        File::create(self.file.path())?;
        self.entries.clear();
        Ok(())
    }
}

/// Reads a log file back, skipping lines that do not parse
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Ok(entry) = serde_json::from_str(&line) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::create_in(dir.path()).unwrap();
        log.push(LogLevel::Retry, "starting");
        log.push(LogLevel::Success, "done");

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().next().unwrap().contains(r#""status":"retry""#));

        let back = read_entries(log.path()).unwrap();
        assert_eq!(back, log.entries());
        assert_eq!(back[1].message, "done");
    }

    #[test]
    fn reset_clears_file_and_panel() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::create_in(dir.path()).unwrap();
        log.push(LogLevel::Error, "boom");
        log.reset().unwrap();
        assert!(log.entries().is_empty());
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "");
        log.push(LogLevel::Success, "again");
        assert_eq!(read_entries(log.path()).unwrap().len(), 1);
    }

    #[test]
    fn file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::create_in(dir.path()).unwrap();
        let path = log.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("shrine_log_"));
        drop(log);
        assert!(!path.exists());
    }
}
