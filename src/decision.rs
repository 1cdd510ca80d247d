//! Detection results and the final allow/block decision.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Exit code for allowed operations (and dry runs).
pub const EXIT_ALLOW: u8 = 0;
/// Exit code for malformed input or a missing required field.
pub const EXIT_INPUT_ERROR: u8 = 1;
/// Exit code for operations with security findings.
pub const EXIT_BLOCK: u8 = 2;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl Severity {
    /// Parse a severity name; unrecognised names fall back to `Error`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Severity::Info,
            "warning" | "warn" => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one detector run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub detected: bool,
    /// Human-readable explanation. Only meaningful when `detected`.
    pub message: String,
    pub severity: Severity,
    /// Auxiliary data (matched pattern, line number, matched text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl DetectionResult {
    /// A result with nothing found.
    pub fn clear() -> Self {
        Self {
            detected: false,
            message: String::new(),
            severity: Severity::Info,
            details: None,
        }
    }

    /// A positive finding with error severity.
    pub fn found(message: impl Into<String>) -> Self {
        Self {
            detected: true,
            message: message.into(),
            severity: Severity::Error,
            details: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.as_ref()?.get(key).map(String::as_str)
    }
}

/// The final decision for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// No issues.
    Allow,
    /// Issues found, reported but not enforced.
    Advisory,
    /// Issues found; the caller must not proceed.
    Block,
    /// Input could not be parsed or lacks a required field.
    InvalidInput,
}

impl Decision {
    /// Map the evaluation outcome to a decision. Input errors take precedence
    /// over findings; dry-run downgrades a block to advisory.
    pub fn from_outcome(parse_ok: bool, validation_ok: bool, has_issues: bool, dry_run: bool) -> Self {
        if !parse_ok || !validation_ok {
            Decision::InvalidInput
        } else if !has_issues {
            Decision::Allow
        } else if dry_run {
            Decision::Advisory
        } else {
            Decision::Block
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Decision::Allow | Decision::Advisory => EXIT_ALLOW,
            Decision::InvalidInput => EXIT_INPUT_ERROR,
            Decision::Block => EXIT_BLOCK,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Block)
    }
}

/// `(parse_ok, validation_ok, has_issues, dry_run) -> exit code`.
pub fn exit_code(parse_ok: bool, validation_ok: bool, has_issues: bool, dry_run: bool) -> u8 {
    Decision::from_outcome(parse_ok, validation_ok, has_issues, dry_run).exit_code()
}
