//! External LLM API usage in written code.

use super::{PatternRule, RuleTable, clip, content_exempt, finding_message};
use crate::decision::DetectionResult;
use crate::input::Operation;
use crate::policy::RuntimePolicy;
use once_cell::sync::Lazy;

const WHY: &str = "Calling a third-party model sends project code and data outside the approved boundary";
const SUGGESTION: &str =
    "Use an approved internal model endpoint, or mock the client in tests and demos";

macro_rules! llm_rule {
    ($pattern:expr, $label:expr) => {
        PatternRule {
            pattern: $pattern,
            label: $label,
            why: WHY,
            suggestion: SUGGESTION,
        }
    };
}

static RULES: &[PatternRule] = &[
    llm_rule!(r"openai\.com", "OpenAI API domain"),
    llm_rule!(r"api\.openai\.com", "OpenAI API domain"),
    llm_rule!(r"gemini\.google\.com", "Google Gemini domain"),
    llm_rule!(r"generativelanguage\.googleapis\.com", "Google Gemini API domain"),
    llm_rule!(r"gpt-[0-9]", "OpenAI GPT model name"),
    llm_rule!(r"claude\.ai", "Claude domain"),
    llm_rule!(r"anthropic\.com", "Anthropic API domain"),
    llm_rule!(r"cohere\.ai", "Cohere domain"),
    llm_rule!(r"huggingface\.co", "Hugging Face domain"),
    llm_rule!(r"import\s+openai", "OpenAI SDK import"),
    llm_rule!(r"from\s+openai", "OpenAI SDK import"),
    llm_rule!(r"openai\.", "OpenAI SDK call"),
    llm_rule!(r"import\s+anthropic", "Anthropic SDK import"),
    llm_rule!(r"from\s+anthropic", "Anthropic SDK import"),
    llm_rule!(r"anthropic\.", "Anthropic SDK call"),
    llm_rule!(r"import\s+cohere", "Cohere SDK import"),
    llm_rule!(r"from\s+cohere", "Cohere SDK import"),
    llm_rule!(r"cohere\.", "Cohere SDK call"),
    llm_rule!(r"import\s+google\.generativeai", "Google Gemini SDK import"),
    llm_rule!(r"from\s+google\.generativeai", "Google Gemini SDK import"),
    llm_rule!(r"from\s+huggingface_hub", "Hugging Face Hub import"),
];

static TABLE: Lazy<RuleTable> = Lazy::new(|| RuleTable::new(RULES));

pub(super) fn pattern_count() -> usize {
    TABLE.len()
}

/// Detect references to hosted LLM APIs in edited content.
pub fn detect_llm_api(op: &Operation, policy: &RuntimePolicy) -> DetectionResult {
    if content_exempt(op, policy) {
        return DetectionResult::clear();
    }

    let fragments = op.content_fragments();
    let Some(hit) = TABLE.first_hit(&fragments) else {
        return DetectionResult::clear();
    };

    let summary = format!("External LLM API reference detected: {}", hit.rule.label);
    let context = [format!("Line {}: {}", hit.line_number(), clip(hit.line(), 120))];
    DetectionResult::found(finding_message(&summary, &context, hit.rule))
        .with_detail("pattern", hit.rule.pattern)
        .with_detail("line", hit.line_number().to_string())
        .with_detail("matched", hit.matched())
}
