//! Configurable pattern engine.
//!
//! Evaluates the named rules of a [`Config`] against an operation. Rules run
//! in the order they were loaded; within a rule, file patterns are tried
//! first, then content patterns, then import patterns.

use crate::config::{Config, PatternConfig};
use crate::decision::{DetectionResult, Severity};
use crate::input::Operation;
use crate::output::redact_secrets;
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Prefix for configured rule names in statistics.
pub const RULE_PREFIX: &str = "pattern:";

/// A configured rule with its regexes compiled.
#[derive(Debug)]
pub struct CompiledRule {
    name: String,
    message: String,
    severity: Severity,
    file_patterns: Vec<Regex>,
    content_patterns: Vec<Regex>,
    import_patterns: Vec<Regex>,
}

impl CompiledRule {
    /// Compile a rule. Invalid regexes are dropped individually.
    pub fn compile(name: &str, rule: &PatternConfig) -> Self {
        Self {
            name: name.to_string(),
            message: rule.message.clone(),
            severity: Severity::parse(&rule.severity),
            file_patterns: compile_all(name, &rule.file_patterns),
            content_patterns: compile_all(name, &rule.content_patterns),
            import_patterns: compile_all(name, &rule.import_patterns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used in statistics, e.g. `pattern:api_keys`.
    pub fn stat_name(&self) -> String {
        format!("{RULE_PREFIX}{}", self.name)
    }

    pub fn pattern_count(&self) -> usize {
        self.file_patterns.len() + self.content_patterns.len() + self.import_patterns.len()
    }

    /// Evaluate this rule against one operation.
    pub fn check(&self, op: &Operation) -> DetectionResult {
        if let Some(path) = op.file_path()
            && let Some(re) = self.file_patterns.iter().find(|re| re.is_match(path))
        {
            let msg = format!(
                "{}: {}\n  Pattern matched: {}\n  Rule: {}",
                self.message,
                path,
                re.as_str(),
                self.name
            );
            return self.found(msg, re).with_detail("file_path", path);
        }

        if self.content_patterns.is_empty() && self.import_patterns.is_empty() {
            return DetectionResult::clear();
        }
        let content = op.joined_content();
        if content.is_empty() {
            return DetectionResult::clear();
        }

        if let Some((re, m)) = first_match(&self.content_patterns, &content) {
            let msg = format!(
                "{}\n  Matched: {}\n  Pattern matched: {}\n  Rule: {}",
                self.message,
                redact_secrets(m),
                re.as_str(),
                self.name
            );
            return self.found(msg, re).with_detail("matched", redact_secrets(m));
        }

        if let Some((re, m)) = first_match(&self.import_patterns, &content) {
            let msg = format!(
                "{} (import detected)\n  Matched: {}\n  Pattern matched: {}\n  Rule: {}",
                self.message,
                m,
                re.as_str(),
                self.name
            );
            return self.found(msg, re).with_detail("matched", m);
        }

        DetectionResult::clear()
    }

    fn found(&self, message: String, re: &Regex) -> DetectionResult {
        DetectionResult::found(message)
            .with_severity(self.severity)
            .with_detail("pattern_name", self.name.as_str())
            .with_detail("pattern", re.as_str())
    }
}

/// All enabled configured rules, compiled.
#[derive(Debug, Default)]
pub struct PatternEngine {
    rules: Vec<CompiledRule>,
}

impl PatternEngine {
    /// Compile the enabled rules of `config`, preserving their order.
    pub fn new(config: &Config) -> Self {
        let rules = config
            .patterns
            .iter()
            .filter(|(_, rule)| rule.enabled)
            .map(|(name, rule)| CompiledRule::compile(name, rule))
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Results of every enabled rule, in rule order.
    pub fn detect_patterns(&self, op: &Operation) -> Vec<DetectionResult> {
        self.rules.iter().map(|rule| rule.check(op)).collect()
    }
}

fn compile_all(rule: &str, patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    debug!(rule, pattern = %pattern, error = %e, "skipping invalid pattern");
                    None
                }
            }
        })
        .collect()
}

fn first_match<'a, 'c>(patterns: &'a [Regex], content: &'c str) -> Option<(&'a Regex, &'c str)> {
    patterns
        .iter()
        .find_map(|re| re.find(content).map(|m| (re, m.as_str())))
}
