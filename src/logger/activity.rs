//! Activity log: typed audit events mapped onto JSONL entries.
//!
//! The tool is a short-lived single-threaded process, so events are written
//! synchronously by the caller. A disabled log accepts and drops everything.

#![allow(missing_docs)]

use std::path::Path;

use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Events recorded during an audit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    AuditStarted {
        command: String,
        version: String,
        config_hash: String,
    },
    ScanCompleted {
        command: String,
        root: String,
        files: u64,
        total_bytes: u64,
        skipped: u64,
        duration_ms: u64,
    },
    AssetRemoved {
        path: String,
        size_bytes: u64,
        dry_run: bool,
    },
    AssetMissing {
        path: String,
    },
    AssetRemovalFailed {
        path: String,
        error_code: String,
        error_message: String,
    },
    CriticalPathMissing {
        path: String,
    },
    BuildCompleted {
        command: String,
        duration_ms: u64,
    },
    BuildFailed {
        command: String,
        error_code: String,
        error_message: String,
    },
    PolicyVerdict {
        total_bytes: u64,
        ceiling_bytes: u64,
        within_policy: bool,
    },
}

/// Sink for [`ActivityEvent`]s; optional JSONL backing file.
#[derive(Default)]
pub struct ActivityLog {
    writer: Option<JsonlWriter>,
}

impl ActivityLog {
    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Log to `path` with default rotation settings.
    pub fn open(path: &Path) -> Self {
        Self {
            writer: Some(JsonlWriter::open(JsonlConfig::new(path))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn record(&mut self, event: ActivityEvent) {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_entry(&event_to_log_entry(event));
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }
}

fn event_to_log_entry(event: ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::AuditStarted {
            command,
            version,
            config_hash,
        } => {
            let mut e = LogEntry::new(EventType::AuditStart, Severity::Info);
            e.command = Some(command);
            e.details = Some(format!("version={version} config_hash={config_hash}"));
            e
        }
        ActivityEvent::ScanCompleted {
            command,
            root,
            files,
            total_bytes,
            skipped,
            duration_ms,
        } => {
            let severity = if skipped > 0 {
                Severity::Warning
            } else {
                Severity::Info
            };
            let mut e = LogEntry::new(EventType::ScanComplete, severity);
            e.command = Some(command);
            e.path = Some(root);
            e.count = Some(files);
            e.size = Some(total_bytes);
            e.duration_ms = Some(duration_ms);
            e.ok = Some(skipped == 0);
            if skipped > 0 {
                e.details = Some(format!("{skipped} paths skipped"));
            }
            e
        }
        ActivityEvent::AssetRemoved {
            path,
            size_bytes,
            dry_run,
        } => {
            let mut e = LogEntry::new(EventType::AssetRemove, Severity::Info);
            e.path = Some(path);
            e.size = Some(size_bytes);
            e.dry_run = Some(dry_run);
            e.ok = Some(true);
            e
        }
        ActivityEvent::AssetMissing { path } => {
            let mut e = LogEntry::new(EventType::AssetMissing, Severity::Info);
            e.path = Some(path);
            e
        }
        ActivityEvent::AssetRemovalFailed {
            path,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::AssetRemove, Severity::Warning);
            e.path = Some(path);
            e.ok = Some(false);
            e.error_code = Some(error_code);
            e.error_message = Some(error_message);
            e
        }
        ActivityEvent::CriticalPathMissing { path } => {
            let mut e = LogEntry::new(EventType::CriticalMissing, Severity::Warning);
            e.path = Some(path);
            e
        }
        ActivityEvent::BuildCompleted {
            command,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::BuildComplete, Severity::Info);
            e.command = Some(command);
            e.duration_ms = Some(duration_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::BuildFailed {
            command,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.command = Some(command);
            e.ok = Some(false);
            e.error_code = Some(error_code);
            e.error_message = Some(error_message);
            e
        }
        ActivityEvent::PolicyVerdict {
            total_bytes,
            ceiling_bytes,
            within_policy,
        } => {
            let severity = if within_policy {
                Severity::Info
            } else {
                Severity::Critical
            };
            let mut e = LogEntry::new(EventType::PolicyVerdict, severity);
            e.size = Some(total_bytes);
            e.ceiling = Some(ceiling_bytes);
            e.ok = Some(within_policy);
            e
        }
    }
}
