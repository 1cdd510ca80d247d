//! Sensitive files opened with the Read tool.

use super::{PatternRule, RuleTable, finding_message, path_exempt};
use crate::decision::DetectionResult;
use crate::input::{Operation, ToolInput};
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

const SYSTEM_WHY: &str = "System account files expose users and password material of the host";
const SYSTEM_SUGGESTION: &str = "Read project-local configuration instead of system files";
const KEY_WHY: &str = "Private key material must never enter the assistant's context";
const KEY_SUGGESTION: &str = "Reference the key by path in configuration; do not read its contents";
const CLOUD_WHY: &str = "Cloud and cluster credentials grant direct access to production resources";
const CLOUD_SUGGESTION: &str = "Use the provider CLI's own auth flow instead of reading credential files";
const TOKEN_WHY: &str = "Registry and VCS credential files contain reusable tokens";
const TOKEN_SUGGESTION: &str = "Ask the user to run the authenticated command themselves";
const HISTORY_WHY: &str = "Shell and REPL history often contains pasted passwords and tokens";
const HISTORY_SUGGESTION: &str = "Ask the user for the specific command you need instead";
const WALLET_WHY: &str = "Wallet files hold keys that control funds";
const WALLET_SUGGESTION: &str = "Never read wallet data from an assistant session";

static RULES: &[PatternRule] = &[
    PatternRule {
        pattern: r"/etc/shadow\b",
        label: "system password hashes",
        why: SYSTEM_WHY,
        suggestion: SYSTEM_SUGGESTION,
    },
    PatternRule {
        pattern: r"/etc/gshadow\b",
        label: "group password hashes",
        why: SYSTEM_WHY,
        suggestion: SYSTEM_SUGGESTION,
    },
    PatternRule {
        pattern: r"/etc/passwd\b",
        label: "system user database",
        why: SYSTEM_WHY,
        suggestion: SYSTEM_SUGGESTION,
    },
    PatternRule {
        pattern: r"/etc/sudoers\b",
        label: "sudo configuration",
        why: "The sudoers policy reveals who can escalate privileges and how",
        suggestion: SYSTEM_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.ssh/id_[a-z0-9_]+$",
        label: "SSH private key",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"deploy_key",
        label: "deploy key",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.ssh/authorized_keys$",
        label: "SSH authorized keys",
        why: "authorized_keys lists which keys can log in to this account",
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.(pem|key|p12|pfx|jks|keystore)$",
        label: "cryptographic key or keystore",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.gnupg/",
        label: "GnuPG keyring",
        why: KEY_WHY,
        suggestion: KEY_SUGGESTION,
    },
    PatternRule {
        pattern: r"(^|/)\.env(\.[a-z0-9_-]+)?$",
        label: "environment variables file",
        why: "Environment files typically contain live secrets",
        suggestion: "Read .env.example or ask the user which variable names exist",
    },
    PatternRule {
        pattern: r"\.aws/(credentials|config)$",
        label: "AWS credentials",
        why: CLOUD_WHY,
        suggestion: CLOUD_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.kube/config$",
        label: "Kubernetes config",
        why: CLOUD_WHY,
        suggestion: CLOUD_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.config/gcloud/",
        label: "Google Cloud credentials",
        why: CLOUD_WHY,
        suggestion: CLOUD_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.azure/",
        label: "Azure credentials",
        why: CLOUD_WHY,
        suggestion: CLOUD_SUGGESTION,
    },
    PatternRule {
        pattern: r"\.docker/config\.json$",
        label: "Docker registry credentials",
        why: TOKEN_WHY,
        suggestion: TOKEN_SUGGESTION,
    },
    PatternRule {
        pattern: r"(^|/)\.(netrc|npmrc|pypirc|git-credentials)$",
        label: "stored login tokens",
        why: TOKEN_WHY,
        suggestion: TOKEN_SUGGESTION,
    },
    PatternRule {
        pattern: r"(credentials\.json|secrets\.ya?ml)",
        label: "credentials file",
        why: CLOUD_WHY,
        suggestion: CLOUD_SUGGESTION,
    },
    PatternRule {
        pattern: r"(^|/)\.[a-z]*_?history$",
        label: "shell or REPL history",
        why: HISTORY_WHY,
        suggestion: HISTORY_SUGGESTION,
    },
    PatternRule {
        pattern: r"wallet\.dat$",
        label: "cryptocurrency wallet",
        why: WALLET_WHY,
        suggestion: WALLET_SUGGESTION,
    },
    PatternRule {
        pattern: r"(\.bitcoin|\.ethereum/keystore|\.electrum)/",
        label: "cryptocurrency wallet data",
        why: WALLET_WHY,
        suggestion: WALLET_SUGGESTION,
    },
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

/// Template env files that hold no secrets.
static ENV_TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"(^|/)\.env\.(example|sample|template|dist)$")
        .case_insensitive(true)
        .build()
        .expect("env template pattern should compile")
});

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect Read-tool access to credential, key, history and wallet files.
pub fn detect_read_sensitive_files(op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
    let ToolInput::Read(input) = &op.input else {
        return DetectionResult::clear();
    };
    let path = input.file_path.as_str();
    if path.is_empty() || path_exempt(path, policy) || ENV_TEMPLATE.is_match(path) {
        return DetectionResult::clear();
    }

    let Some(hit) = TABLE.first_hit(&[path]) else {
        return DetectionResult::clear();
    };

    let summary = format!("Attempt to read sensitive file: {} ({})", path, hit.rule.label);
    DetectionResult::found(finding_message(&summary, &[format!("File: {}", path)], hit.rule))
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("file_path", path)
}
