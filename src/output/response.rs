//! Report formatting for hook output.

use crate::decision::Decision;
use crate::engine::{DetectorStats, Validation};
use crate::input::InputError;
use serde::Serialize;

/// JSON report printed on stdout with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Checked file, set in `--check-file` batches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub has_issues: bool,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DetectorStats>,
    pub decision: Decision,
    pub exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JsonReport {
    pub fn from_validation(validation: &Validation, decision: Decision) -> Self {
        Self {
            file: None,
            has_issues: validation.has_issues,
            issues: validation.issues.clone(),
            stats: Some(validation.stats.clone()),
            decision,
            exit_code: decision.exit_code(),
            error: None,
        }
    }

    /// Report for input that could not be evaluated.
    pub fn invalid(error: impl Into<String>) -> Self {
        let decision = Decision::InvalidInput;
        Self {
            file: None,
            has_issues: false,
            issues: Vec::new(),
            stats: None,
            decision,
            exit_code: decision.exit_code(),
            error: Some(error.into()),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Format the stderr report for a validated operation. `None` when there
/// is nothing to report.
pub fn format_report(validation: &Validation, dry_run: bool) -> Option<String> {
    if !validation.has_issues {
        return None;
    }

    let mut msg = if dry_run {
        String::from("DRY RUN: Security issues that would be detected:\n")
    } else {
        String::from("Security issues detected:\n")
    };
    for issue in &validation.issues {
        msg.push_str(&format!("  - {}\n", issue.replace('\n', "\n    ")));
    }

    if dry_run {
        msg.push_str("\nThis is a preview of what would be blocked. The operation is allowed.");
    } else {
        msg.push_str("\nBLOCKED: the operation was not allowed to proceed.");
        msg.push_str("\nRun `antimon --explain-last-error` for details.");
    }
    Some(msg)
}

/// Format an input error for stderr.
pub fn format_input_error(err: &InputError) -> String {
    format!("Error: {}", err)
}

/// Format statistics for `--stats`.
pub fn format_stats(stats: &DetectorStats) -> String {
    let mut out = String::from("Detection statistics:\n");
    out.push_str(&format!("  Detectors run: {}\n", stats.total));
    out.push_str(&format!("  Passed: {}\n", stats.passed));
    out.push_str(&format!("  Failed: {}\n", stats.failed));
    if stats.errors > 0 {
        out.push_str(&format!("  Errors: {}\n", stats.errors));
    }
    out.push_str(&format!("  Patterns checked: {}\n", stats.patterns_checked));
    out.push_str(&format!("  Content size: {} bytes\n", stats.content_size));
    out.push_str(&format!("  Total time: {:.2}ms", stats.total_time * 1000.0));
    for (name, secs) in &stats.detector_times {
        out.push_str(&format!("\n    {}: {:.3}ms", name, secs * 1000.0));
    }
    out
}

/// Format the JSON report for a validated operation.
pub fn format_json_report(validation: &Validation, decision: Decision) -> String {
    to_json(&JsonReport::from_validation(validation, decision))
}

/// Format the JSON report for input that could not be evaluated.
pub fn format_json_error(err: &InputError) -> String {
    to_json(&JsonReport::invalid(err.to_string()))
}

/// Format the reports of a `--check-file` batch as one JSON array.
pub fn format_json_batch(reports: &[JsonReport]) -> String {
    serde_json::to_string_pretty(reports).unwrap_or_else(|_| String::from("[]"))
}

fn to_json(report: &JsonReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| {
        // Fallback to a minimal document if serialization fails
        format!(
            r#"{{"has_issues":{},"exit_code":{}}}"#,
            report.has_issues, report.exit_code
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(issues: &[&str]) -> Validation {
        Validation {
            has_issues: !issues.is_empty(),
            issues: issues.iter().map(|s| s.to_string()).collect(),
            stats: DetectorStats::default(),
        }
    }

    #[test]
    fn test_no_issues_no_report() {
        assert!(format_report(&validation(&[]), false).is_none());
    }

    #[test]
    fn test_block_report() {
        let msg = format_report(&validation(&["Bad thing\n  Why: because"]), false).unwrap();
        assert!(msg.starts_with("Security issues detected:"));
        assert!(msg.contains("  - Bad thing\n      Why: because"));
        assert!(msg.contains("BLOCKED"));
    }

    #[test]
    fn test_dry_run_report() {
        let msg = format_report(&validation(&["Bad thing"]), true).unwrap();
        assert!(msg.contains("DRY RUN"));
        assert!(msg.contains("Security issues that would be detected"));
        assert!(msg.contains("preview of what would be blocked"));
        assert!(!msg.contains("BLOCKED"));
    }

    #[test]
    fn test_input_error() {
        let msg = format_input_error(&InputError::MissingField("content"));
        assert_eq!(msg, "Error: Missing required field 'content'");
    }

    #[test]
    fn test_json_report() {
        let v = validation(&["Bad thing"]);
        let json = format_json_report(&v, v.decision(false));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["has_issues"], true);
        assert_eq!(parsed["issues"][0], "Bad thing");
        assert_eq!(parsed["exit_code"], 2);
        assert_eq!(parsed["decision"], "block");
        assert_eq!(parsed["stats"]["total"], 0);
    }

    #[test]
    fn test_json_error() {
        let json = format_json_error(&InputError::MissingField("command"));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["exit_code"], 1);
        assert_eq!(parsed["decision"], "invalid_input");
        assert!(parsed.get("stats").is_none());
    }

    #[test]
    fn test_json_batch_is_one_array() {
        let v = validation(&["Bad thing"]);
        let reports = vec![
            JsonReport::from_validation(&v, v.decision(false)).with_file("a.py"),
            JsonReport::invalid("failed to read b.py").with_file("b.py"),
        ];
        let parsed: serde_json::Value = serde_json::from_str(&format_json_batch(&reports)).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["file"], "a.py");
        assert_eq!(items[0]["exit_code"], 2);
        assert_eq!(items[1]["file"], "b.py");
        assert_eq!(items[1]["exit_code"], 1);
        assert_eq!(items[1]["error"], "failed to read b.py");
    }

    #[test]
    fn test_stats_format() {
        let mut stats = DetectorStats {
            total: 2,
            passed: 1,
            failed: 1,
            ..Default::default()
        };
        stats.detector_times.insert("filenames".to_string(), 0.001);
        let out = format_stats(&stats);
        assert!(out.contains("Detectors run: 2"));
        assert!(out.contains("filenames: 1.000ms"));
        assert!(!out.contains("Errors"));
    }
}
