//! Runtime override policy: ignore, allow and disable rules.
//!
//! Built once at startup from defaults, then environment variables, then
//! command-line flags. Every source extends the previous ones. The finished
//! policy is read-only and passed by reference into the validator.

use glob::{MatchOptions, Pattern};
use regex::RegexBuilder;
use std::collections::BTreeSet;
use tracing::debug;

/// Comma-separated glob patterns whose files skip all detection.
pub const ENV_IGNORE_PATTERNS: &str = "ANTIMON_IGNORE_PATTERNS";
/// Comma-separated paths or globs exempt from filename-based detection.
pub const ENV_ALLOW_FILES: &str = "ANTIMON_ALLOW_FILES";
/// Comma-separated detector names to skip.
pub const ENV_DISABLE_DETECTORS: &str = "ANTIMON_DISABLE_DETECTORS";

const DETECTOR_PREFIX: &str = "detect_";

/// Process-wide exemptions consulted by detectors and the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePolicy {
    /// Files matching any of these globs are fully exempt.
    pub ignore_patterns: Vec<String>,
    /// Exact paths or globs exempt from filename-based detectors only.
    pub allowed_files: BTreeSet<String>,
    /// Detector short names (no `detect_` prefix) to skip.
    pub disabled_detectors: BTreeSet<String>,
    /// Report findings without blocking.
    pub dry_run: bool,
    /// Case sensitivity for ignore/allow matching. Defaults to the
    /// platform convention: sensitive everywhere but Windows.
    pub case_sensitive: bool,
}

impl Default for RuntimePolicy {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            allowed_files: BTreeSet::new(),
            disabled_detectors: BTreeSet::new(),
            dry_run: false,
            case_sensitive: !cfg!(windows),
        }
    }
}

impl RuntimePolicy {
    /// Defaults extended with the `ANTIMON_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults extended with variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(value) = lookup(ENV_IGNORE_PATTERNS) {
            for pattern in split_list(&value) {
                policy = policy.ignore(pattern);
            }
        }
        if let Some(value) = lookup(ENV_ALLOW_FILES) {
            for file in split_list(&value) {
                policy = policy.allow(file);
            }
        }
        if let Some(value) = lookup(ENV_DISABLE_DETECTORS) {
            for name in split_list(&value) {
                policy = policy.disable(name);
            }
        }
        policy
    }

    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if !self.ignore_patterns.contains(&pattern) {
            self.ignore_patterns.push(pattern);
        }
        self
    }

    pub fn allow(mut self, file: impl Into<String>) -> Self {
        self.allowed_files.insert(file.into());
        self
    }

    pub fn disable(mut self, detector: impl AsRef<str>) -> Self {
        self.disabled_detectors
            .insert(short_name(detector.as_ref()).to_string());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = self.dry_run || dry_run;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Extend this policy with another. Lists and sets are unioned.
    pub fn merge(mut self, other: RuntimePolicy) -> Self {
        for pattern in other.ignore_patterns {
            self = self.ignore(pattern);
        }
        self.allowed_files.extend(other.allowed_files);
        self.disabled_detectors.extend(other.disabled_detectors);
        self.dry_run |= other.dry_run;
        self
    }

    /// True if `path` matches any ignore glob.
    pub fn is_file_ignored(&self, path: &str) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| glob_matches(pattern, path, self.case_sensitive))
    }

    /// True if `path` equals an allowed entry or matches an allowed glob.
    pub fn is_file_allowed(&self, path: &str) -> bool {
        self.allowed_files.iter().any(|entry| {
            let exact = if self.case_sensitive {
                entry == path
            } else {
                entry.eq_ignore_ascii_case(path)
            };
            exact || (is_glob(entry) && glob_matches(entry, path, self.case_sensitive))
        })
    }

    /// True unless the detector (with or without `detect_`) is disabled.
    pub fn is_detector_enabled(&self, name: &str) -> bool {
        !self.disabled_detectors.contains(short_name(name))
    }

    /// One line per non-default setting, for verbose output.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.ignore_patterns.is_empty() {
            lines.push(format!("Ignored patterns: {}", self.ignore_patterns.join(", ")));
        }
        if !self.allowed_files.is_empty() {
            let files: Vec<&str> = self.allowed_files.iter().map(String::as_str).collect();
            lines.push(format!("Allowed files: {}", files.join(", ")));
        }
        if !self.disabled_detectors.is_empty() {
            let names: Vec<&str> = self.disabled_detectors.iter().map(String::as_str).collect();
            lines.push(format!("Disabled detectors: {}", names.join(", ")));
        }
        if self.dry_run {
            lines.push("Mode: DRY RUN (preview only, no blocking)".to_string());
        }
        lines
    }
}

fn short_name(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix(DETECTOR_PREFIX).unwrap_or(name)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Match `path` against a glob. `*` and `?` cross `/` like shell fnmatch,
/// except in patterns containing `**`, where `*` stays within one segment
/// and `**/` spans zero or more directories.
pub fn glob_matches(pattern: &str, path: &str, case_sensitive: bool) -> bool {
    if pattern.contains("**") {
        let regex = RegexBuilder::new(&recursive_glob_to_regex(pattern))
            .case_insensitive(!case_sensitive)
            .build();
        return match regex {
            Ok(re) => re.is_match(path),
            Err(e) => {
                debug!(pattern, error = %e, "skipping unusable glob");
                false
            }
        };
    }

    match Pattern::new(pattern) {
        Ok(glob) => glob.matches_with(
            path,
            MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        ),
        Err(e) => {
            debug!(pattern, error = %e, "skipping invalid glob");
            false
        }
    }
}

fn recursive_glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                Some(len) if len > 0 => {
                    let class: String = chars[i + 1..i + 1 + len].iter().collect();
                    out.push('[');
                    match class.strip_prefix('!') {
                        Some(rest) => {
                            out.push('^');
                            out.push_str(&class_body(rest));
                        }
                        None => out.push_str(&class_body(&class)),
                    }
                    out.push(']');
                    i += len + 2;
                    continue;
                }
                _ => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

fn class_body(body: &str) -> String {
    body.chars()
        .map(|c| match c {
            '\\' | '[' | ']' | '^' | '&' | '~' => format!("\\{c}"),
            c => c.to_string(),
        })
        .collect()
}
