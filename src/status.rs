//! `--status`: the effective policy and configuration.

use crate::config::{Config, ConfigSource};
use crate::detectors::Detector;
use crate::patterns::PatternEngine;
use crate::policy::RuntimePolicy;

/// Human-readable status of detectors, overrides, configuration and audit.
pub fn render_status(policy: &RuntimePolicy, config: &Config, engine: Option<&PatternEngine>) -> String {
    let mut out = String::from("antimon status\n\nDetectors:\n");
    for detector in Detector::ALL {
        let state = if policy.is_detector_enabled(detector.name()) {
            "enabled "
        } else {
            "disabled"
        };
        out.push_str(&format!(
            "  {}  {:<24} {} patterns\n",
            state,
            detector.name(),
            detector.pattern_count()
        ));
    }

    out.push_str("\nOverrides:\n");
    let summary = policy.summary();
    if summary.is_empty() {
        out.push_str("  (none)\n");
    }
    for line in summary {
        out.push_str(&format!("  {}\n", line));
    }

    out.push_str("\nConfiguration:\n");
    match &config.source {
        ConfigSource::File(path) => out.push_str(&format!("  File: {}\n", path.display())),
        ConfigSource::Defaults => out.push_str("  No configuration file; configured rules inactive\n"),
    }
    if let Some(engine) = engine {
        if engine.is_empty() {
            out.push_str("  Rules: (none enabled)\n");
        }
        for rule in engine.rules() {
            let state = if policy.is_detector_enabled(&rule.stat_name()) {
                ""
            } else {
                " (disabled)"
            };
            out.push_str(&format!(
                "  Rule: {} ({} patterns){}\n",
                rule.name(),
                rule.pattern_count(),
                state
            ));
        }
    }

    match config.audit_log_path() {
        Some(path) => out.push_str(&format!("  Audit log: {}", path.display())),
        None => out.push_str("  Audit log: disabled"),
    }
    out
}
