//! Built-in pattern detectors.
//!
//! Each detector inspects one aspect of an [`Operation`] against a fixed,
//! ordered table of case-insensitive regexes and reports the first hit.
//! Tables are scanned pattern-first, then fragment by fragment, so the
//! same input always yields the same finding.

mod antipatterns;
mod api_key;
mod bash_commands;
mod docker;
mod filenames;
mod llm_api;
mod localhost;
mod read_sensitive;

pub use antipatterns::detect_claude_antipatterns;
pub use api_key::detect_api_key;
pub use bash_commands::detect_bash_dangerous_commands;
pub use docker::detect_docker;
pub use filenames::detect_filenames;
pub use llm_api::detect_llm_api;
pub use localhost::detect_localhost;
pub use read_sensitive::detect_read_sensitive_files;

use crate::decision::DetectionResult;
use crate::input::Operation;
use crate::policy::RuntimePolicy;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Built-in detector identifiers, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detector {
    Filenames,
    LlmApi,
    ApiKey,
    Docker,
    Localhost,
    ClaudeAntipatterns,
    ReadSensitiveFiles,
    BashDangerousCommands,
}

impl Detector {
    /// Detectors for Write/Edit/MultiEdit/NotebookEdit.
    pub const CODE_EDITING: &'static [Detector] = &[
        Detector::Filenames,
        Detector::LlmApi,
        Detector::ApiKey,
        Detector::Docker,
        Detector::Localhost,
        Detector::ClaudeAntipatterns,
    ];

    /// Every built-in detector.
    pub const ALL: &'static [Detector] = &[
        Detector::Filenames,
        Detector::LlmApi,
        Detector::ApiKey,
        Detector::Docker,
        Detector::Localhost,
        Detector::ClaudeAntipatterns,
        Detector::ReadSensitiveFiles,
        Detector::BashDangerousCommands,
    ];

    /// Short name used by the disable list and in statistics.
    pub const fn name(&self) -> &'static str {
        match self {
            Detector::Filenames => "filenames",
            Detector::LlmApi => "llm_api",
            Detector::ApiKey => "api_key",
            Detector::Docker => "docker",
            Detector::Localhost => "localhost",
            Detector::ClaudeAntipatterns => "claude_antipatterns",
            Detector::ReadSensitiveFiles => "read_sensitive_files",
            Detector::BashDangerousCommands => "bash_dangerous_commands",
        }
    }

    /// Look a detector up by short name, with or without `detect_`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("detect_").unwrap_or(name);
        Detector::ALL.iter().copied().find(|d| d.name() == name)
    }

    /// The fixed detector set for a tool. Empty for safe and unknown tools.
    pub fn for_tool(tool_name: &str) -> &'static [Detector] {
        match tool_name {
            "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => Detector::CODE_EDITING,
            "Read" => &[Detector::ReadSensitiveFiles],
            "Bash" => &[Detector::BashDangerousCommands],
            _ => &[],
        }
    }

    /// Number of patterns this detector evaluates.
    pub fn pattern_count(&self) -> usize {
        match self {
            Detector::Filenames => filenames::pattern_count(),
            Detector::LlmApi => llm_api::pattern_count(),
            Detector::ApiKey => api_key::pattern_count(),
            Detector::Docker => docker::pattern_count(),
            Detector::Localhost => localhost::pattern_count(),
            Detector::ClaudeAntipatterns => 0,
            Detector::ReadSensitiveFiles => read_sensitive::pattern_count(),
            Detector::BashDangerousCommands => bash_commands::pattern_count(),
        }
    }

    pub fn run(&self, op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
        match self {
            Detector::Filenames => detect_filenames(op, policy),
            Detector::LlmApi => detect_llm_api(op, policy),
            Detector::ApiKey => detect_api_key(op, policy),
            Detector::Docker => detect_docker(op, policy),
            Detector::Localhost => detect_localhost(op, policy),
            Detector::ClaudeAntipatterns => detect_claude_antipatterns(op, policy),
            Detector::ReadSensitiveFiles => detect_read_sensitive_files(op, policy),
            Detector::BashDangerousCommands => detect_bash_dangerous_commands(op, policy),
        }
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a detector's pattern table.
#[derive(Debug)]
pub struct PatternRule {
    pub pattern: &'static str,
    /// Short description of what matched.
    pub label: &'static str,
    pub why: &'static str,
    pub suggestion: &'static str,
}

/// A pattern table compiled once.
pub(crate) struct RuleTable {
    rules: &'static [PatternRule],
    compiled: Vec<Regex>,
}

/// Where a rule matched.
pub(crate) struct Hit<'t> {
    pub rule: &'static PatternRule,
    pub fragment: &'t str,
    pub start: usize,
    pub end: usize,
}

impl RuleTable {
    pub fn new(rules: &'static [PatternRule]) -> Self {
        let compiled = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("built-in detector patterns should compile")
            })
            .collect();
        Self { rules, compiled }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// First rule (in table order) matching any fragment (in given order).
    pub fn first_hit<'t>(&self, fragments: &[&'t str]) -> Option<Hit<'t>> {
        for (rule, re) in self.rules.iter().zip(&self.compiled) {
            for &fragment in fragments {
                if let Some(m) = re.find(fragment) {
                    return Some(Hit {
                        rule,
                        fragment,
                        start: m.start(),
                        end: m.end(),
                    });
                }
            }
        }
        None
    }
}

impl Hit<'_> {
    pub fn matched(&self) -> &str {
        &self.fragment[self.start..self.end]
    }

    /// 1-based line of the match within its fragment.
    pub fn line_number(&self) -> usize {
        self.fragment[..self.start].matches('\n').count() + 1
    }

    /// The full line containing the match, trimmed.
    pub fn line(&self) -> &str {
        let begin = self.fragment[..self.start].rfind('\n').map_or(0, |i| i + 1);
        let end = self.fragment[self.end..]
            .find('\n')
            .map_or(self.fragment.len(), |i| self.end + i);
        self.fragment[begin..end].trim()
    }
}

/// Render the structured finding message:
///
/// ```text
/// <summary>
///   <context line>...
///   Pattern matched: <regex>
///   Why: <rationale>
///   Suggestion: <remediation>
/// ```
pub(crate) fn finding_message(summary: &str, context: &[String], rule: &PatternRule) -> String {
    let mut msg = summary.to_string();
    for line in context {
        msg.push_str("\n  ");
        msg.push_str(line);
    }
    msg.push_str(&format!("\n  Pattern matched: {}", rule.pattern));
    msg.push_str(&format!("\n  Why: {}", rule.why));
    msg.push_str(&format!("\n  Suggestion: {}", rule.suggestion));
    msg
}

/// Cap quoted lines so a minified file doesn't flood the report.
pub(crate) fn clip(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let head: String = line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Content-detector preamble: ignored paths skip content checks too.
pub(crate) fn content_exempt(op: &Operation, policy: &RuntimePolicy) -> bool {
    op.file_path().is_some_and(|p| policy.is_file_ignored(p))
}

/// Filename-detector preamble: both ignore and allow exempt the path.
pub(crate) fn path_exempt(path: &str, policy: &RuntimePolicy) -> bool {
    policy.is_file_ignored(path) || policy.is_file_allowed(path)
}
