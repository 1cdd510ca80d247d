//! Hardcoded local endpoints.

use super::{PatternRule, RuleTable, clip, content_exempt, finding_message};
use crate::decision::{DetectionResult, Severity};
use crate::input::Operation;
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;

const WHY: &str = "Hardcoded local endpoints break in every other environment and can expose dev services";
const SUGGESTION: &str = "Read host and port from configuration or environment variables";

static RULES: &[PatternRule] = &[
    PatternRule {
        pattern: r"localhost:[0-9]+",
        label: "localhost with port",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"127\.0\.0\.1:[0-9]+",
        label: "loopback address with port",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"0\.0\.0\.0:[0-9]+",
        label: "wildcard bind address with port",
        why: "Binding 0.0.0.0 exposes the service on every interface",
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r":\s*(3000|8000|8080|5000|5432|3306)\b",
        label: "common development port",
        why: WHY,
        suggestion: SUGGESTION,
    },
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect localhost and development-port references in edited content.
pub fn detect_localhost(op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
    if content_exempt(op, policy) {
        return DetectionResult::clear();
    }

    let fragments = op.content_fragments();
    let Some(hit) = TABLE.first_hit(&fragments) else {
        return DetectionResult::clear();
    };

    let summary = format!("Localhost/port reference detected: {}", hit.rule.label);
    let context = [format!("Line {}: {}", hit.line_number(), clip(hit.line(), 120))];
    DetectionResult::found(finding_message(&summary, &context, hit.rule))
        .with_severity(Severity::Warning)
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("line", hit.line_number().to_string())
        .with_detail("matched", hit.matched())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::write;

    #[test]
    fn test_localhost_port() {
        let r = detect_localhost(&write("a.js", "fetch('http://localhost:3000/api')"), &RuntimePolicy::default());
        assert!(r.detected);
        assert_eq!(r.detail("matched"), Some("localhost:3000"));
    }

    #[test]
    fn test_loopback_and_bind() {
        let policy = RuntimePolicy::default();
        assert!(detect_localhost(&write("a.py", "URL = 'http://127.0.0.1:9999'"), &policy).detected);
        assert!(detect_localhost(&write("a.py", "app.run('0.0.0.0:80')"), &policy).detected);
        assert!(detect_localhost(&write("a.yml", "port: 5432"), &policy).detected);
    }

    #[test]
    fn test_plain_localhost_without_port() {
        let r = detect_localhost(&write("a.md", "runs on localhost"), &RuntimePolicy::default());
        assert!(!r.detected);
    }

    #[test]
    fn test_uncommon_port_after_colon() {
        let r = detect_localhost(&write("a.py", "timeout: 30001"), &RuntimePolicy::default());
        assert!(!r.detected);
    }
}
