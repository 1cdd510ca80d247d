//! Built-in self-test: known hook documents run through a [`Validator`].

use crate::engine::Validator;
use serde_json::{Value, json};

/// One known hook document and the finding it should produce.
#[derive(Debug, Clone)]
pub struct SelfTestCase {
    pub name: &'static str,
    pub input: Value,
    /// Text the findings must contain (case-insensitive), or `None` when the
    /// operation must pass cleanly.
    pub expected: Option<&'static str>,
}

/// Result of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl SelfTestReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    /// PASS/FAIL line per case followed by the tally.
    pub fn render(&self) -> String {
        let mut out = String::from("Running antimon self-test...\n\n");
        for (i, outcome) in self.outcomes.iter().enumerate() {
            let status = if outcome.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("Test {}: {} ... {}\n", i + 1, outcome.name, status));
            if !outcome.passed {
                out.push_str(&format!("  {}\n", outcome.detail));
            }
        }
        out.push_str(&format!("\n{}/{} tests passed", self.passed(), self.total()));
        out
    }
}

fn write(path: &str, content: &str) -> Value {
    json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Write",
        "tool_input": {"file_path": path, "content": content}
    })
}

/// The fixed case table.
pub fn cases() -> Vec<SelfTestCase> {
    let case = |name, input, expected| SelfTestCase {
        name,
        input,
        expected,
    };
    vec![
        case(
            "Sensitive file detection",
            write("/etc/passwd", "malicious content"),
            Some("Dangerous file path"),
        ),
        case(
            "API key detection",
            write("config.py", r#"api_key = "sk-1234567890abcdef""#),
            Some("API key"),
        ),
        case(
            "LLM API detection",
            write("chat.py", "from openai import OpenAI\nclient = OpenAI()"),
            Some("LLM API"),
        ),
        case(
            "Docker operation detection",
            write("deploy.sh", "docker run -d nginx"),
            Some("Docker"),
        ),
        case(
            "Localhost connection detection",
            write("app.py", r#"url = "http://localhost:8080/api""#),
            Some("localhost"),
        ),
        case(
            "Safe operation (should pass)",
            write("hello.py", r#"print("Hello, World!")"#),
            None,
        ),
        case(
            "Edit tool API key detection",
            json!({
                "hook_event_name": "PreToolUse",
                "tool_name": "Edit",
                "tool_input": {
                    "file_path": "settings.py",
                    "old_string": "# Configuration",
                    "new_string": "OPENAI_API_KEY = 'sk-proj-123456'"
                }
            }),
            Some("API key"),
        ),
        case(
            "Sensitive file read detection",
            json!({"tool_name": "Read", "tool_input": {"file_path": "/etc/shadow"}}),
            Some("sensitive file"),
        ),
        case(
            "Dangerous command detection",
            json!({"tool_name": "Bash", "tool_input": {"command": "rm -rf /"}}),
            Some("Destructive file removal"),
        ),
        case(
            "Safe read (should pass)",
            json!({"tool_name": "Read", "tool_input": {"file_path": "README.md"}}),
            None,
        ),
    ]
}

/// Run one case.
pub fn run_case(validator: &Validator<'_>, case: &SelfTestCase) -> CaseOutcome {
    let outcome = |passed, detail: String| CaseOutcome {
        name: case.name,
        passed,
        detail,
    };

    let eval = match validator.evaluate(&case.input.to_string()) {
        Ok(eval) => eval,
        Err(e) => return outcome(false, format!("invalid input: {}", e)),
    };
    let issues = &eval.validation.issues;

    match case.expected {
        Some(expected) => {
            let needle = expected.to_lowercase();
            if issues.iter().any(|i| i.to_lowercase().contains(&needle)) {
                outcome(true, String::new())
            } else if issues.is_empty() {
                outcome(false, format!("expected '{}', nothing detected", expected))
            } else {
                outcome(false, format!("expected '{}', got: {}", expected, issues.join("; ")))
            }
        }
        None if issues.is_empty() => outcome(true, String::new()),
        None => outcome(false, format!("expected no issues, got: {}", issues.join("; "))),
    }
}

/// Run the whole case table.
pub fn run_self_test(validator: &Validator<'_>) -> SelfTestReport {
    SelfTestReport {
        outcomes: cases().iter().map(|case| run_case(validator, case)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RuntimePolicy;

    #[test]
    fn test_default_detectors_pass_every_case() {
        let policy = RuntimePolicy::default();
        let report = run_self_test(&Validator::new(&policy));
        for outcome in &report.outcomes {
            assert!(outcome.passed, "{}: {}", outcome.name, outcome.detail);
        }
        assert!(report.all_passed());
        assert!(report.render().ends_with("10/10 tests passed"));
    }

    #[test]
    fn test_disabled_detector_fails_its_case() {
        let policy = RuntimePolicy::default().disable("docker");
        let report = run_self_test(&Validator::new(&policy));
        assert!(!report.all_passed());
        assert_eq!(report.passed(), report.total() - 1);

        let failed: Vec<&CaseOutcome> = report.outcomes.iter().filter(|o| !o.passed).collect();
        assert_eq!(failed[0].name, "Docker operation detection");
        assert!(failed[0].detail.contains("nothing detected"));
        assert!(report.render().contains("... FAIL"));
    }

    #[test]
    fn test_invalid_case_input_fails() {
        let policy = RuntimePolicy::default();
        let case = SelfTestCase {
            name: "broken",
            input: json!({"tool_name": "Write", "tool_input": {"file_path": "a.py"}}),
            expected: None,
        };
        let outcome = run_case(&Validator::new(&policy), &case);
        assert!(!outcome.passed);
        assert!(outcome.detail.starts_with("invalid input"));
    }
}
