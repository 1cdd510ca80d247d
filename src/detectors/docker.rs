//! Docker operations in written code or Docker files.

use super::{PatternRule, RuleTable, clip, content_exempt, finding_message};
use crate::decision::{DetectionResult, Severity};
use crate::input::Operation;
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;

const WHY: &str = "Container commands can mount the host, pull unreviewed images or escalate privileges";
const SUGGESTION: &str = "Review container changes by hand, or disable the docker detector for this project";

static RULES: &[PatternRule] = &[
    PatternRule {
        pattern: r"docker\s+run",
        label: "docker run",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"docker\s+build",
        label: "docker build",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"docker-compose",
        label: "docker-compose",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"dockerfile",
        label: "Dockerfile",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"docker\s+exec",
        label: "docker exec",
        why: "Exec into a running container bypasses its entrypoint and audit trail",
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"docker\s+pull",
        label: "docker pull",
        why: "Pulling images fetches unreviewed third-party code",
        suggestion: "Pin images by digest and pull them outside the assistant",
    },
    PatternRule {
        pattern: r"docker\s+push",
        label: "docker push",
        why: "Pushing images publishes build artifacts to a registry",
        suggestion: "Publish images from CI, not from an assistant session",
    },
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect Docker operations in content or in the target path.
pub fn detect_docker(op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
    if content_exempt(op, policy) {
        return DetectionResult::clear();
    }

    let mut fragments = op.content_fragments();
    if let Some(path) = op.file_path() {
        fragments.push(path);
    }
    let Some(hit) = TABLE.first_hit(&fragments) else {
        return DetectionResult::clear();
    };

    let location = if Some(hit.fragment) == op.file_path() {
        format!("File: {}", hit.fragment)
    } else {
        format!("Line {}: {}", hit.line_number(), clip(hit.line(), 120))
    };
    let summary = format!("Docker operation detected: {}", hit.rule.label);
    DetectionResult::found(finding_message(&summary, &[location], hit.rule))
        .with_severity(Severity::Warning)
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("matched", hit.matched())
}
