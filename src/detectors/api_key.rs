//! Hardcoded credentials in written code.

use super::{PatternRule, RuleTable, clip, content_exempt, finding_message};
use crate::decision::DetectionResult;
use crate::input::Operation;
use crate::output::redact_secrets;
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;

const WHY: &str = "Secrets committed to source end up in history, forks and build logs";
const SUGGESTION: &str =
    "Read the value from the environment (e.g. os.environ.get(\"API_KEY\")) and keep it in an untracked .env file";

static RULES: &[PatternRule] = &[
    PatternRule {
        pattern: r#"api[_-]?key\s*=\s*["'][^"']+["']"#,
        label: "API key assignment",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r#"apikey\s*:\s*["'][^"']+["']"#,
        label: "API key in mapping",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r#"secret[_-]?key\s*=\s*["'][^"']+["']"#,
        label: "secret key assignment",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r#"access[_-]?token\s*=\s*["'][^"']+["']"#,
        label: "access token assignment",
        why: WHY,
        suggestion: SUGGESTION,
    },
    PatternRule {
        pattern: r"bearer\s+[a-z0-9\-._~+/]+=*",
        label: "bearer token",
        why: "A literal bearer token authenticates anyone who reads the code",
        suggestion: "Build the Authorization header from an environment variable such as AUTH_TOKEN",
    },
    PatternRule {
        pattern: r"sk-[a-z0-9]{48}",
        label: "OpenAI-style secret key",
        why: WHY,
        suggestion: "Revoke the key if it is real and load it from OPENAI_API_KEY instead",
    },
    PatternRule {
        pattern: r"AIza[0-9a-z\-_]{35}",
        label: "Google API key",
        why: WHY,
        suggestion: "Restrict and rotate the key, then load it from the environment",
    },
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect hardcoded API keys, secrets and tokens in edited content.
pub fn detect_api_key(op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
    if content_exempt(op, policy) {
        return DetectionResult::clear();
    }

    let fragments = op.content_fragments();
    let Some(hit) = TABLE.first_hit(&fragments) else {
        return DetectionResult::clear();
    };

    let shown = clip(&redact_secrets(hit.line()), 120);
    let summary = format!("Hardcoded API key detected: {}", hit.rule.label);
    let context = [format!("Line {}: {}", hit.line_number(), shown)];
    DetectionResult::found(finding_message(&summary, &context, hit.rule))
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("line", hit.line_number().to_string())
        .with_detail("matched", redact_secrets(hit.matched()))
}
