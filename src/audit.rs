//! Audit logging and the last-block record.
//!
//! Both are best effort: failures are logged as warnings and never reach
//! the decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::decision::Decision;
use crate::engine::Validation;
use crate::input::Operation;
use crate::output::redact_secrets;

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Block,
    /// Issues found in dry-run mode.
    Warning,
    Allow,
}

impl EventType {
    pub fn from_decision(decision: Decision) -> Self {
        match decision {
            Decision::Block => EventType::Block,
            Decision::Advisory => EventType::Warning,
            Decision::Allow | Decision::InvalidInput => EventType::Allow,
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Command or path, truncated.
    pub summary: String,
    pub issues: Vec<String>,
    pub dry_run: bool,
}

impl AuditEntry {
    pub fn new(
        op: &Operation,
        session_id: Option<&str>,
        validation: &Validation,
        decision: Decision,
        dry_run: bool,
    ) -> Self {
        let summary = op
            .command()
            .map(|c| truncate_string(&redact_secrets(c), 200))
            .or_else(|| op.file_path().map(String::from))
            .unwrap_or_else(|| "<unknown>".to_string());

        Self {
            timestamp: Utc::now(),
            event_type: EventType::from_decision(decision),
            session_id: session_id.map(String::from),
            tool_name: op.tool_name.clone(),
            file_path: op.file_path().map(String::from),
            summary,
            issues: validation.issues.iter().map(|i| redact_secrets(i)).collect(),
            dry_run,
        }
    }
}

fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    }
}

/// Fire-and-forget destination for audit entries.
pub trait AuditSink {
    fn record(&self, entry: &AuditEntry);
}

/// Discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudit;

impl AuditSink for NoopAudit {
    fn record(&self, _entry: &AuditEntry) {}
}

/// JSON-lines audit logger.
pub struct AuditLogger {
    path: PathBuf,
    file: File,
}

impl AuditLogger {
    /// Open or create an audit log file.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Write an audit entry to the log.
    pub fn log(&self, entry: &AuditEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut file = &self.file;
        writeln!(file, "{}", json)?;
        file.flush()
    }
}

impl AuditSink for AuditLogger {
    fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.log(entry) {
            warn!(path = %self.path.display(), error = %e, "failed to write audit entry");
        }
    }
}

/// The audit sink for an optional log path. Falls back to [`NoopAudit`]
/// when the file cannot be opened.
pub fn open_sink(path: Option<&Path>) -> Box<dyn AuditSink> {
    match path {
        None => Box::new(NoopAudit),
        Some(path) => match AuditLogger::open(path) {
            Ok(logger) => {
                debug!(path = %path.display(), "audit logging enabled");
                Box::new(logger)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open audit log");
                Box::new(NoopAudit)
            }
        },
    }
}

/// The most recent blocked operation, kept for `--explain-last-error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastError {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub issues: Vec<String>,
    /// Tool input with secret-looking strings redacted.
    #[serde(default)]
    pub tool_input: Value,
}

impl LastError {
    pub fn new(op: &Operation, tool_input: &Value, validation: &Validation) -> Self {
        Self {
            timestamp: Utc::now(),
            tool_name: op.tool_name.clone(),
            file_path: op.file_path().map(String::from),
            issues: validation.issues.iter().map(|i| redact_secrets(i)).collect(),
            tool_input: redact_value(tool_input),
        }
    }

    /// `~/.antimon/last_error.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".antimon").join("last_error.json"))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Save, logging instead of failing.
    pub fn save_best_effort(&self, path: &Path) {
        if let Err(e) = self.save(path) {
            warn!(path = %path.display(), error = %e, "failed to save last error");
        }
    }

    /// Load the stored record; `Ok(None)` when there is none.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Human-readable explanation of the record.
    pub fn explain(&self) -> String {
        let mut out = format!(
            "Last blocked operation ({})\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        out.push_str(&format!("Tool: {}\n", self.tool_name));
        if let Some(path) = &self.file_path {
            out.push_str(&format!("File: {}\n", path));
        }
        out.push_str("\nIssues:\n");
        for issue in &self.issues {
            out.push_str(&format!("  - {}\n", issue));
        }
        out.push_str("\nTo proceed, fix the issues above, or exempt the file with --allow-file / ANTIMON_ALLOW_FILES");
        out.push_str(" or the detector with --disable-detector / ANTIMON_DISABLE_DETECTORS.\n");
        out
    }
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_secrets(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
