//! Dangerous shell commands for the Bash tool.
//!
//! These patterns are built in and cannot be replaced by configuration.

use super::{PatternRule, RuleTable, clip, finding_message};
use crate::decision::DetectionResult;
use crate::input::{Operation, ToolInput};
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;

const DESTROY_WHY: &str = "This wipes data that cannot be recovered from the repository";
const DISK_WHY: &str = "Writing to block devices destroys partitions and filesystems";
const REMOTE_WHY: &str = "Piping a download into a shell runs unreviewed code with your privileges";
const CREDENTIAL_WHY: &str = "The command prints credentials into the session transcript";

static RULES: &[PatternRule] = &[
    PatternRule {
        pattern: r#"\brm\s+(-{1,2}[a-z-]+\s+)+["']?(/|/\*|~/?|\$home/?)["']?(\s|;|&|\||$)"#,
        label: "Destructive file removal of a root or home directory",
        why: DESTROY_WHY,
        suggestion: "Delete specific paths inside the project instead",
    },
    PatternRule {
        pattern: r"\brm\s.*--no-preserve-root",
        label: "Destructive file removal (--no-preserve-root)",
        why: DESTROY_WHY,
        suggestion: "Delete specific paths inside the project instead",
    },
    PatternRule {
        pattern: r"\bdd\s+.*\bof=/dev/(sd|hd|nvme|xvd|vd|disk|mmcblk)",
        label: "Raw disk write with dd",
        why: DISK_WHY,
        suggestion: "Write to an image file instead of a device",
    },
    PatternRule {
        pattern: r"\bmkfs(\.[a-z0-9]+)?\s",
        label: "Filesystem format",
        why: DISK_WHY,
        suggestion: "Format disks manually after double-checking the target device",
    },
    PatternRule {
        pattern: r">\s*/dev/(sd|hd|nvme|xvd|vd|disk|mmcblk)",
        label: "Raw disk write by redirection",
        why: DISK_WHY,
        suggestion: "Redirect output to a regular file",
    },
    PatternRule {
        pattern: r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        label: "Fork bomb",
        why: "Unbounded process creation freezes the machine",
        suggestion: "Remove this command",
    },
    PatternRule {
        pattern: r"\bsudo\s+(su\b|-i\b|-s\b|(ba|z)?sh\b)",
        label: "Privilege escalation to a root shell",
        why: "An interactive root shell escapes every per-command review",
        suggestion: "Run the single command that needs privileges, and let the user run sudo",
    },
    PatternRule {
        pattern: r"\b(curl|wget)\b[^|]*\|\s*(sudo\s+)?(ba|z|da|k)?sh\b",
        label: "Remote script execution (download piped to a shell)",
        why: REMOTE_WHY,
        suggestion: "Download the script, review it, then run it explicitly",
    },
    PatternRule {
        pattern: r"\b(eval|exec)\s*\(",
        label: "Dynamic code execution",
        why: "Evaluating constructed strings hides what actually runs",
        suggestion: "Call the intended program or function directly",
    },
    PatternRule {
        pattern: r"\bchmod\s+(-[a-z]+\s+)*(0?777|a\+rwx|o\+w)\b",
        label: "Overly permissive file permissions",
        why: "World-writable files let any local user alter them",
        suggestion: "Grant the minimum mode needed, e.g. 644 for files or 755 for executables",
    },
    PatternRule {
        pattern: r"\b(nc|ncat|netcat)\b.*\s-[a-z]*l",
        label: "Listening network backdoor",
        why: "A listening netcat accepts remote connections to this machine",
        suggestion: "Use a proper development server bound to localhost",
    },
    PatternRule {
        pattern: r"/dev/tcp/",
        label: "Reverse shell via /dev/tcp",
        why: "Bash network redirection is a classic reverse-shell technique",
        suggestion: "Use curl or a client library for network access",
    },
    PatternRule {
        pattern: r"\b(xmrig|minerd|cpuminer|ethminer|cgminer|nbminer)\b|stratum\+tcp://",
        label: "Cryptocurrency miner",
        why: "Miners hijack compute resources",
        suggestion: "Remove this command",
    },
    PatternRule {
        pattern: r#"\b(cat|less|more|head|tail|strings|bat)\b.*[\s<]["']?/etc/g?shadow\b"#,
        label: "Attempt to read system password hashes",
        why: CREDENTIAL_WHY,
        suggestion: "There is no legitimate need to read password hashes; ask the user",
    },
    PatternRule {
        pattern: r#"\b(cat|less|more|head|tail|strings|bat|source)\s+(\S+\s+)*\S*\.env["']?(\s|$)"#,
        label: "Attempt to read environment file",
        why: CREDENTIAL_WHY,
        suggestion: "Read .env.example, or ask the user which variables are defined",
    },
    PatternRule {
        pattern: r"\bgrep\b.*\b(password|passwd|secret|api[_-]?key|token)\b",
        label: "Searching for credentials",
        why: CREDENTIAL_WHY,
        suggestion: "Search for the configuration key name in code, not for secret values",
    },
    PatternRule {
        pattern: r"(>\s*|\btee\s+(-a\s+)?)/etc/(passwd|shadow|sudoers|group)\b",
        label: "System credential file modification",
        why: "Changing account databases can create backdoor users",
        suggestion: "Use useradd/visudo interactively outside the assistant",
    },
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect destructive, escalating or exfiltrating Bash commands.
pub fn detect_bash_dangerous_commands(op: &Operation, _policy: &RuntimePolicy) -> DetectionResult {
    let ToolInput::Bash(input) = &op.input else {
        return DetectionResult::clear();
    };
    let command = input.command.as_str();
    if command.trim().is_empty() {
        return DetectionResult::clear();
    }

    let Some(hit) = TABLE.first_hit(&[command]) else {
        return DetectionResult::clear();
    };

    let summary = format!("Dangerous command detected: {}", hit.rule.label);
    let context = [format!("Command: {}", clip(command, 200))];
    DetectionResult::found(finding_message(&summary, &context, hit.rule))
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("matched", hit.matched())
}
