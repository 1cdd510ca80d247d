//! Sensitive target paths for code-editing tools.

use super::{PatternRule, RuleTable, finding_message, path_exempt};
use crate::decision::DetectionResult;
use crate::input::Operation;
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;

const KEY_WHY: &str = "Private keys and certificates grant access to other systems";
const KEY_SUGGESTION: &str =
    "Manage keys with a secrets manager or ssh-agent; allow-list the file if it is a test fixture";

static RULES: &[PatternRule] = &[
    PatternRule {
        pattern: r"/etc/passwd",
        label: "system user database",
        why: "Changing system account files can lock users out or create backdoor accounts",
        suggestion: "Use user-level configuration (~/.config/) instead of system files",
    },
    PatternRule {
        pattern: r"/etc/shadow",
        label: "system password hashes",
        why: "The shadow file holds password hashes for every account on the host",
        suggestion: "Never write system credential stores from an assistant session",
    },
    PatternRule {
        pattern: r"\.ssh/id_rsa",
        label: "SSH private key",
        why: "Overwriting an SSH private key can hijack or break remote access",
        suggestion: "Generate keys yourself with ssh-keygen outside the assistant",
    },
    PatternRule {
        pattern: r"\.ssh/id_ed25519",
        label: "SSH private key",
        why: "Overwriting an SSH private key can hijack or break remote access",
        suggestion: "Generate keys yourself with ssh-keygen outside the assistant",
    },
    PatternRule {
        pattern: r"secrets\.ya?ml",
        label: "secrets manifest",
        why: "Secret manifests are usually deployed verbatim and must not hold generated values",
        suggestion: "Keep secrets out of the repository and inject them at deploy time",
    },
    PatternRule {
        pattern: r"credentials\.json",
        label: "credentials file",
        why: "Service account credentials give direct access to cloud resources",
        suggestion: "Load credentials through the provider's default credential chain",
    },
    PatternRule {
        pattern: r"\.env$",
        label: "environment variables file",
        why: "Environment files typically contain live secrets and are easy to commit by mistake",
        suggestion: "Edit .env.example with placeholder values, or allow-list this file explicitly",
    },
    PatternRule {
        pattern: r"\.pem$",
        label: "cryptographic key or certificate",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.key$",
        label: "cryptographic key",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.p12$",
        label: "PKCS#12 keystore",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.pfx$",
        label: "PKCS#12 keystore",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"deploy_key",
        label: "deploy key",
        why: "Deploy keys grant push or pull access to repositories",
        suggestion: "Register deploy keys through your forge's settings, not from code",
    },
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect writes to dangerous or sensitive file paths.
pub fn detect_filenames(op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
    let Some(path) = op.file_path() else {
        return DetectionResult::clear();
    };
    if path_exempt(path, policy) {
        return DetectionResult::clear();
    }

    let Some(hit) = TABLE.first_hit(&[path]) else {
        return DetectionResult::clear();
    };

    let summary = format!("Dangerous file path detected: {} ({})", path, hit.rule.label);
    DetectionResult::found(finding_message(&summary, &[format!("File: {}", path)], hit.rule))
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("file_path", path)
}
