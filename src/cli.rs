//! Command-line arguments.

use crate::policy::RuntimePolicy;
use clap::Parser;
use std::path::PathBuf;

/// Pre-execution guard for coding-assistant tool calls.
///
/// Reads one hook JSON document from stdin and exits 0 (allow),
/// 1 (invalid input) or 2 (blocked).
#[derive(Parser, Debug)]
#[command(name = "antimon", version)]
#[command(about = "Security guard for AI coding-assistant tool calls", long_about = None)]
pub struct Cli {
    /// Report issues without blocking (always exit 0 when input is valid).
    #[arg(long)]
    pub dry_run: bool,

    /// Glob of files to exempt from every detector (repeatable).
    #[arg(long = "ignore-pattern", value_name = "GLOB")]
    pub ignore_patterns: Vec<String>,

    /// Path or glob exempt from filename-based detectors (repeatable).
    #[arg(long = "allow-file", value_name = "PATH")]
    pub allow_files: Vec<String>,

    /// Detector to skip, e.g. `localhost` or `detect_llm_api` (repeatable).
    #[arg(long = "disable-detector", value_name = "NAME")]
    pub disable_detectors: Vec<String>,

    /// Configuration file (overrides ANTIMON_CONFIG and discovery).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print detection statistics after the report.
    #[arg(long)]
    pub stats: bool,

    /// Print a JSON report on stdout.
    #[arg(long)]
    pub json: bool,

    /// Enable debug-level logging to stderr.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Check files on disk instead of reading stdin (repeatable).
    #[arg(long = "check-file", value_name = "PATH")]
    pub check_files: Vec<PathBuf>,

    /// Explain the last blocked operation and exit.
    #[arg(long)]
    pub explain_last_error: bool,

    /// Show enabled detectors, active overrides and configuration, then exit.
    #[arg(long)]
    pub status: bool,

    /// Run known hook inputs through the built-in detectors; exit 1 on any
    /// mismatch.
    #[arg(long)]
    pub self_test: bool,
}

impl Cli {
    /// The policy contributed by command-line flags.
    pub fn policy(&self) -> RuntimePolicy {
        let mut policy = RuntimePolicy::default().dry_run(self.dry_run);
        for pattern in &self.ignore_patterns {
            policy = policy.ignore(pattern.as_str());
        }
        for file in &self.allow_files {
            policy = policy.allow(file.as_str());
        }
        for name in &self.disable_detectors {
            policy = policy.disable(name);
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeatable_flags() {
        let cli = Cli::parse_from([
            "antimon",
            "--dry-run",
            "--ignore-pattern",
            "*.md",
            "--allow-file",
            "a.env",
            "--allow-file",
            "b.env",
            "--disable-detector",
            "detect_localhost",
        ]);
        let policy = cli.policy();
        assert!(policy.dry_run);
        assert!(policy.is_file_ignored("README.md"));
        assert!(policy.is_file_allowed("b.env"));
        assert!(!policy.is_detector_enabled("localhost"));
    }

    #[test]
    fn test_check_files() {
        let cli = Cli::parse_from(["antimon", "--check-file", "a.py", "--check-file", "b.py", "--json"]);
        assert_eq!(cli.check_files.len(), 2);
        assert!(cli.json);
        assert!(cli.policy().summary().is_empty());
    }

    #[test]
    fn test_status_and_self_test_flags() {
        let cli = Cli::parse_from(["antimon", "--status", "--disable-detector", "docker"]);
        assert!(cli.status);
        assert!(!cli.self_test);
        assert_eq!(cli.policy().summary(), vec!["Disabled detectors: docker"]);

        let cli = Cli::parse_from(["antimon", "--self-test"]);
        assert!(cli.self_test);
    }
}
