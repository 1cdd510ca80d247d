//! Orchestrator: turns one operation into a list of issues and statistics.

use crate::decision::{Decision, DetectionResult};
use crate::detectors::Detector;
use crate::input::{HookInput, InputError, Operation, ToolClass};
use crate::patterns::{CompiledRule, PatternEngine};
use crate::policy::RuntimePolicy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// A check that failed to produce a result.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{0}")]
    Failed(String),
}

/// Anything the orchestrator can run against an operation: a built-in
/// detector or a configured rule.
pub trait Check {
    /// Name used for disabling and in statistics.
    fn name(&self) -> String;

    fn pattern_count(&self) -> usize;

    fn check(&self, op: &Operation, policy: &RuntimePolicy) -> Result<DetectionResult, DetectorError>;
}

impl Check for Detector {
    fn name(&self) -> String {
        Detector::name(self).to_string()
    }

    fn pattern_count(&self) -> usize {
        Detector::pattern_count(self)
    }

    fn check(&self, op: &Operation, policy: &RuntimePolicy) -> Result<DetectionResult, DetectorError> {
        Ok(self.run(op, policy))
    }
}

impl Check for CompiledRule {
    fn name(&self) -> String {
        self.stat_name()
    }

    fn pattern_count(&self) -> usize {
        CompiledRule::pattern_count(self)
    }

    fn check(&self, op: &Operation, _policy: &RuntimePolicy) -> Result<DetectionResult, DetectorError> {
        Ok(CompiledRule::check(self, op))
    }
}

/// Counters for one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectorStats {
    /// Checks actually run.
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    /// Seconds.
    pub total_time: f64,
    /// Seconds per check name.
    pub detector_times: BTreeMap<String, f64>,
    pub patterns_checked: usize,
    /// Bytes of inspected content.
    pub content_size: usize,
}

/// Result of validating one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    pub has_issues: bool,
    /// Issue messages in catalog order, then configured-rule order.
    pub issues: Vec<String>,
    pub stats: DetectorStats,
}

impl Validation {
    pub fn decision(&self, dry_run: bool) -> Decision {
        Decision::from_outcome(true, true, self.has_issues, dry_run)
    }
}

/// A parsed hook invocation together with its validation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub hook: HookInput,
    pub operation: Operation,
    pub validation: Validation,
}

/// The single entry point from an operation to a decision.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    policy: &'a RuntimePolicy,
    patterns: Option<&'a PatternEngine>,
}

impl<'a> Validator<'a> {
    pub fn new(policy: &'a RuntimePolicy) -> Self {
        Self {
            policy,
            patterns: None,
        }
    }

    /// Also run the configured rules after the built-in detectors.
    pub fn with_patterns(mut self, patterns: &'a PatternEngine) -> Self {
        self.patterns = Some(patterns);
        self
    }

    pub fn policy(&self) -> &RuntimePolicy {
        self.policy
    }

    /// Parse hook JSON, check required fields, then validate.
    pub fn evaluate(&self, json: &str) -> Result<Evaluation, InputError> {
        let hook = HookInput::parse(json)?;
        hook.check_required_fields()?;
        let operation = hook.operation();
        let validation = self.validate(&operation);
        Ok(Evaluation {
            hook,
            operation,
            validation,
        })
    }

    /// Run every applicable, enabled check against `op`.
    pub fn validate(&self, op: &Operation) -> Validation {
        match op.class() {
            ToolClass::Safe | ToolClass::Unknown => {
                debug!(tool = %op.tool_name, "no detectors for tool");
                return Validation::default();
            }
            ToolClass::CodeEditing | ToolClass::Special => {}
        }

        let mut checks: Vec<&dyn Check> = Detector::for_tool(&op.tool_name)
            .iter()
            .map(|d| d as &dyn Check)
            .collect();

        let ignored = op.file_path().is_some_and(|p| self.policy.is_file_ignored(p));
        if let Some(engine) = self.patterns
            && !ignored
        {
            checks.extend(engine.rules().iter().map(|r| r as &dyn Check));
        }

        checks.retain(|c| {
            let enabled = self.policy.is_detector_enabled(&c.name());
            if !enabled {
                debug!(detector = %c.name(), "detector disabled");
            }
            enabled
        });

        self.run_checks(&checks, op)
    }

    fn run_checks(&self, checks: &[&dyn Check], op: &Operation) -> Validation {
        let started = Instant::now();
        let mut stats = DetectorStats {
            content_size: op.content_size(),
            ..Default::default()
        };
        let mut issues = Vec::new();

        for check in checks {
            let name = check.name();
            let t = Instant::now();
            let outcome = check.check(op, self.policy);
            let elapsed = t.elapsed().as_secs_f64();

            stats.total += 1;
            stats.patterns_checked += check.pattern_count();
            *stats.detector_times.entry(name.clone()).or_default() += elapsed;

            match outcome {
                Ok(result) if result.detected => {
                    stats.failed += 1;
                    debug!(detector = %name, severity = %result.severity, "issue detected");
                    issues.push(result.message);
                }
                Ok(_) => stats.passed += 1,
                Err(e) => {
                    stats.errors += 1;
                    warn!(detector = %name, error = %e, "detector failed");
                    issues.push(format!("Detector '{}' failed: {}", name, e));
                }
            }
        }

        stats.total_time = started.elapsed().as_secs_f64();
        debug!(
            tool = %op.tool_name,
            total = stats.total,
            failed = stats.failed,
            "validation finished"
        );

        Validation {
            has_issues: !issues.is_empty(),
            issues,
            stats,
        }
    }
}
