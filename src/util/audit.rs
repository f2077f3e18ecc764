//! Audit logging for state-changing operations.
//!
//! Provides [`AuditLogger`] which writes NDJSON events to a log file for
//! operator audit trails. Every action that touches the server or the data
//! directory (external tool runs, dump files, tablespace copies, discard and
//! import statements) emits a structured event recording what was changed,
//! when, and by which invocation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use chrono::Local;
use fs2::FileExt;
use serde::Serialize;

use crate::HdbError;

/// A single audit log event, serialized as tagged NDJSON.
#[derive(Serialize)]
#[serde(tag = "event")]
pub enum AuditEvent {
    /// Emitted once at the start of a CLI invocation.
    #[serde(rename = "session_start")]
    SessionStart {
        timestamp: String,
        args: Vec<String>,
        version: String,
    },

    /// Emitted after an external tool (`mysqlfrm`, `mysql`, `mysqldump`) exits.
    #[serde(rename = "command_run")]
    CommandRun {
        timestamp: String,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    /// Emitted when a dump file is written.
    #[serde(rename = "file_write")]
    FileWrite {
        timestamp: String,
        file: String,
        operation: String,
    },

    /// Emitted when a tablespace file is copied into the data directory.
    #[serde(rename = "file_copy")]
    FileCopy {
        timestamp: String,
        source: String,
        destination: String,
        bytes: u64,
    },

    /// Emitted for every `DISCARD`/`IMPORT TABLESPACE` statement.
    #[serde(rename = "tablespace")]
    Tablespace {
        timestamp: String,
        database: String,
        table: String,
        operation: String,
    },

    /// Emitted once at the end of a CLI invocation.
    #[serde(rename = "session_end")]
    SessionEnd {
        timestamp: String,
        duration_ms: u64,
        commands_run: u64,
        files_written: u64,
        tablespaces_changed: u64,
    },
}

struct AuditLoggerInner {
    file: File,
    commands_run: u64,
    files_written: u64,
    tablespaces_changed: u64,
}

/// Thread-safe audit logger that appends NDJSON events to a file.
///
/// File-level locking (via `fs2`) ensures safe concurrent access from
/// multiple processes.
pub struct AuditLogger {
    inner: Mutex<AuditLoggerInner>,
    start: Instant,
}

impl AuditLogger {
    /// Open (or create) the audit log file in append mode.
    pub fn open(path: &str) -> Result<Self, HdbError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| HdbError::Io(format!("Cannot open audit log {}: {}", path, e)))?;

        Ok(Self {
            inner: Mutex::new(AuditLoggerInner {
                file,
                commands_run: 0,
                files_written: 0,
                tablespaces_changed: 0,
            }),
            start: Instant::now(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, AuditLoggerInner>, HdbError> {
        self.inner
            .lock()
            .map_err(|_| HdbError::Io("Audit log mutex poisoned".to_string()))
    }

    /// Emit a single audit event as one NDJSON line.
    pub fn emit(&self, event: &AuditEvent) -> Result<(), HdbError> {
        let line = serde_json::to_string(event)
            .map_err(|e| HdbError::Parse(format!("Audit JSON error: {}", e)))?;

        let mut inner = self.lock()?;
        inner
            .file
            .lock_exclusive()
            .map_err(|e| HdbError::Io(format!("Audit log lock error: {}", e)))?;
        writeln!(inner.file, "{}", line)
            .map_err(|e| HdbError::Io(format!("Audit log write error: {}", e)))?;
        inner
            .file
            .flush()
            .map_err(|e| HdbError::Io(format!("Audit log flush error: {}", e)))?;
        FileExt::unlock(&inner.file)
            .map_err(|e| HdbError::Io(format!("Audit log unlock error: {}", e)))?;

        Ok(())
    }

    /// Emit a `session_start` event.
    pub fn start_session(&self, args: Vec<String>) -> Result<(), HdbError> {
        self.emit(&AuditEvent::SessionStart {
            timestamp: now(),
            args,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Emit a `session_end` event with accumulated counters.
    pub fn end_session(&self) -> Result<(), HdbError> {
        let inner = self.lock()?;
        let event = AuditEvent::SessionEnd {
            timestamp: now(),
            duration_ms: self.start.elapsed().as_millis() as u64,
            commands_run: inner.commands_run,
            files_written: inner.files_written,
            tablespaces_changed: inner.tablespaces_changed,
        };
        drop(inner);
        self.emit(&event)
    }

    /// Log the completion of an external command.
    pub fn log_command(&self, command: &str, exit_code: Option<i32>) -> Result<(), HdbError> {
        self.emit(&AuditEvent::CommandRun {
            timestamp: now(),
            command: command.to_string(),
            exit_code,
        })?;
        self.lock()?.commands_run += 1;
        Ok(())
    }

    /// Log a dump file write.
    pub fn log_file_write(&self, file: &str, operation: &str) -> Result<(), HdbError> {
        self.emit(&AuditEvent::FileWrite {
            timestamp: now(),
            file: file.to_string(),
            operation: operation.to_string(),
        })?;
        self.lock()?.files_written += 1;
        Ok(())
    }

    /// Log a tablespace file copy.
    pub fn log_copy(&self, source: &str, destination: &str, bytes: u64) -> Result<(), HdbError> {
        self.emit(&AuditEvent::FileCopy {
            timestamp: now(),
            source: source.to_string(),
            destination: destination.to_string(),
            bytes,
        })?;
        self.lock()?.files_written += 1;
        Ok(())
    }

    /// Log a tablespace discard or import.
    pub fn log_tablespace(
        &self,
        database: &str,
        table: &str,
        operation: &str,
    ) -> Result<(), HdbError> {
        self.emit(&AuditEvent::Tablespace {
            timestamp: now(),
            database: database.to_string(),
            table: table.to_string(),
            operation: operation.to_string(),
        })?;
        self.lock()?.tablespaces_changed += 1;
        Ok(())
    }
}

fn now() -> String {
    Local::now().to_rfc3339()
}
