//! Reserved slot for assistant anti-pattern checks.

use crate::decision::DetectionResult;
use crate::input::Operation;
use crate::policy::RuntimePolicy;

/// Placeholder detector. It keeps its place in the catalog (and in the
/// statistics) but never reports a finding.
pub fn detect_claude_antipatterns(_op: &Operation, _policy: &RuntimePolicy) -> DetectionResult {
    DetectionResult::clear()
}
