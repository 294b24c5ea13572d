//! JSONL file writer for audit events.
//!
//! Each [`AuditEvent`] becomes one JSON line carrying its payload plus `type`,
//! `seq` and `timestamp`. Lines are appended, so several runs can share a file.

use edrr_application::{AuditEvent, AuditLogger};
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AuditLogError {
    #[error("Could not create audit log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open audit log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Audit logger that appends one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
#[derive(Debug)]
pub struct JsonlAuditLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    seq: AtomicU64,
}

impl JsonlAuditLogger {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditLogError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| AuditLogError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| AuditLogError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: AuditEvent) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);

        match event.payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), Value::from(event.event_type));
                map.insert("seq".to_string(), Value::from(seq));
                map.insert("timestamp".to_string(), Value::String(timestamp));
                Value::Object(map)
            }
            other => json!({
                "type": event.event_type,
                "seq": seq,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl AuditLogger for JsonlAuditLogger {
    fn log(&self, event: AuditEvent) {
        let record = self.record(event);
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        match self.writer.lock() {
            Ok(mut writer) => {
                if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
                    warn!(path = %self.path.display(), "Audit write failed: {}", e);
                }
            }
            Err(_) => warn!(path = %self.path.display(), "Audit writer poisoned"),
        }
    }
}

impl Drop for JsonlAuditLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_object_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("run.jsonl");
        let logger = JsonlAuditLogger::open(&path).unwrap();

        logger.log(AuditEvent::new(
            "cycle_started",
            json!({"cycle": "c-1", "depth": 0}),
        ));
        logger.log(AuditEvent::new(
            "decision",
            json!({"topic": "root", "chosen": "A"}),
        ));
        drop(logger);

        let records = lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "cycle_started");
        assert_eq!(records[0]["depth"], 0);
        assert_eq!(records[0]["seq"], 0);
        assert_eq!(records[1]["type"], "decision");
        assert_eq!(records[1]["chosen"], "A");
        assert_eq!(records[1]["seq"], 1);
        assert!(records.iter().all(|r| r["timestamp"].is_string()));
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let logger = JsonlAuditLogger::open(&path).unwrap();
        logger.log(AuditEvent::new("memory_sync", json!("skipped")));
        drop(logger);

        let records = lines(&path);
        assert_eq!(records[0]["type"], "memory_sync");
        assert_eq!(records[0]["data"], "skipped");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        for _ in 0..2 {
            let logger = JsonlAuditLogger::open(&path).unwrap();
            logger.log(AuditEvent::new("cycle_completed", json!({})));
        }
        assert_eq!(lines(&path).len(), 2);
    }

    #[test]
    fn test_directory_in_the_way_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonlAuditLogger::open(dir.path()).unwrap_err();
        assert!(matches!(err, AuditLogError::Open { .. }));
    }
}
