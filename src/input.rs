//! Input parsing for hook invocations.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when parsing hook input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
}

/// Tools that edit code and get the full content/filename detector set.
pub const CODE_EDITING_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

/// Tools with a dedicated single detector.
pub const SPECIAL_TOOLS: &[&str] = &["Read", "Bash"];

/// Read-only tools that never reach a detector.
pub const SAFE_TOOLS: &[&str] = &[
    "LS",
    "Glob",
    "Grep",
    "NotebookRead",
    "TodoRead",
    "TodoWrite",
    "Task",
    "ExitPlanMode",
    "WebSearch",
    "WebFetch",
    "BashOutput",
];

/// Coarse classification of a tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    CodeEditing,
    Special,
    Safe,
    Unknown,
}

impl ToolClass {
    /// Classify a tool name. Matching is exact and case-sensitive.
    pub fn of(tool_name: &str) -> Self {
        if CODE_EDITING_TOOLS.contains(&tool_name) {
            ToolClass::CodeEditing
        } else if SPECIAL_TOOLS.contains(&tool_name) {
            ToolClass::Special
        } else if SAFE_TOOLS.contains(&tool_name) {
            ToolClass::Safe
        } else {
            ToolClass::Unknown
        }
    }
}

/// The raw input from the assistant's PreToolUse hook.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    /// Hook event name; carried through for logging only.
    #[serde(default)]
    pub hook_event_name: Option<String>,

    /// The tool being invoked (e.g., "Bash", "Read", "Write").
    #[serde(default)]
    pub tool_name: String,

    /// The tool's input parameters as raw JSON.
    #[serde(default)]
    pub tool_input: Value,

    /// Session ID for audit logging (optional).
    #[serde(default)]
    pub session_id: Option<String>,
}

/// One `{old_string, new_string}` pair of a batch edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPair {
    pub old_string: String,
    pub new_string: String,
}

/// Fields shared by every code-editing tool. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditingInput {
    pub file_path: String,
    pub content: String,
    pub old_string: String,
    pub new_string: String,
    pub edits: Vec<EditPair>,
}

/// Parsed input for the Read tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadInput {
    pub file_path: String,
}

/// Parsed input for the Bash tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BashInput {
    pub command: String,
}

/// Tool input, by tool shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    Write(EditingInput),
    Edit(EditingInput),
    MultiEdit(EditingInput),
    NotebookEdit(EditingInput),
    Read(ReadInput),
    Bash(BashInput),
    Other(Value),
}

/// A single proposed tool invocation, immutable during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub tool_name: String,
    pub input: ToolInput,
}

impl HookInput {
    /// Parse from JSON string.
    pub fn parse(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that the fields the tool cannot work without are present.
    /// A `null` value counts as missing.
    pub fn check_required_fields(&self) -> Result<(), InputError> {
        let has = |key: &str| self.tool_input.get(key).is_some_and(|v| !v.is_null());
        match self.tool_name.as_str() {
            "Write" if !has("content") => Err(InputError::MissingField("content")),
            "Edit" if !has("new_string") => Err(InputError::MissingField("new_string")),
            "MultiEdit" if !has("new_string") && !has_edits(&self.tool_input) => {
                Err(InputError::MissingField("new_string"))
            }
            "Read" if !has("file_path") => Err(InputError::MissingField("file_path")),
            "Bash" if !has("command") => Err(InputError::MissingField("command")),
            _ => Ok(()),
        }
    }

    /// Build the typed operation. Never fails: absent or mistyped fields
    /// become empty strings.
    pub fn operation(&self) -> Operation {
        let value = &self.tool_input;
        let input = match self.tool_name.as_str() {
            "Write" => ToolInput::Write(editing_input(value)),
            "Edit" => ToolInput::Edit(editing_input(value)),
            "MultiEdit" => ToolInput::MultiEdit(editing_input(value)),
            "NotebookEdit" => ToolInput::NotebookEdit(editing_input(value)),
            "Read" => ToolInput::Read(ReadInput {
                file_path: string_field(value, "file_path"),
            }),
            "Bash" => ToolInput::Bash(BashInput {
                command: string_field(value, "command"),
            }),
            _ => ToolInput::Other(value.clone()),
        };
        Operation {
            tool_name: self.tool_name.clone(),
            input,
        }
    }

    /// Get the primary path being accessed (for any file-based tool).
    pub fn file_path(&self) -> Option<&str> {
        self.tool_input
            .get("file_path")
            .or_else(|| self.tool_input.get("notebook_path"))
            .and_then(|v| v.as_str())
    }

    /// Get the command (for Bash tool).
    pub fn command(&self) -> Option<&str> {
        self.tool_input.get("command").and_then(|v| v.as_str())
    }
}

fn has_edits(value: &Value) -> bool {
    value
        .get("edits")
        .and_then(|v| v.as_array())
        .is_some_and(|edits| !edits.is_empty())
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn editing_input(value: &Value) -> EditingInput {
    let mut file_path = string_field(value, "file_path");
    if file_path.is_empty() {
        file_path = string_field(value, "notebook_path");
    }

    let mut content = string_field(value, "content");
    let new_source = string_field(value, "new_source");
    if content.is_empty() {
        content = new_source;
    } else if !new_source.is_empty() {
        content.push('\n');
        content.push_str(&new_source);
    }

    let edits = value
        .get("edits")
        .and_then(|v| v.as_array())
        .map(|edits| {
            edits
                .iter()
                .map(|edit| EditPair {
                    old_string: string_field(edit, "old_string"),
                    new_string: string_field(edit, "new_string"),
                })
                .collect()
        })
        .unwrap_or_default();

    EditingInput {
        file_path,
        content,
        old_string: string_field(value, "old_string"),
        new_string: string_field(value, "new_string"),
        edits,
    }
}

impl Operation {
    /// Synthesize a Write operation for a file checked directly from disk.
    pub fn write(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Operation {
            tool_name: "Write".to_string(),
            input: ToolInput::Write(EditingInput {
                file_path: file_path.into(),
                content: content.into(),
                ..Default::default()
            }),
        }
    }

    pub fn class(&self) -> ToolClass {
        ToolClass::of(&self.tool_name)
    }

    /// The target file path, if this tool has one.
    pub fn file_path(&self) -> Option<&str> {
        let path = match &self.input {
            ToolInput::Write(e)
            | ToolInput::Edit(e)
            | ToolInput::MultiEdit(e)
            | ToolInput::NotebookEdit(e) => e.file_path.as_str(),
            ToolInput::Read(r) => r.file_path.as_str(),
            ToolInput::Bash(_) | ToolInput::Other(_) => return None,
        };
        (!path.is_empty()).then_some(path)
    }

    /// Every text fragment an edit could carry, in a fixed order:
    /// content, new_string, old_string, then each batch edit's new/old pair.
    pub fn content_fragments(&self) -> Vec<&str> {
        let mut fragments = Vec::new();
        match &self.input {
            ToolInput::Write(e)
            | ToolInput::Edit(e)
            | ToolInput::MultiEdit(e)
            | ToolInput::NotebookEdit(e) => {
                fragments.push(e.content.as_str());
                fragments.push(e.new_string.as_str());
                fragments.push(e.old_string.as_str());
                for edit in &e.edits {
                    fragments.push(edit.new_string.as_str());
                    fragments.push(edit.old_string.as_str());
                }
            }
            ToolInput::Bash(b) => fragments.push(b.command.as_str()),
            ToolInput::Read(_) | ToolInput::Other(_) => {}
        }
        fragments.retain(|f| !f.is_empty());
        fragments
    }

    /// All fragments joined by newlines.
    pub fn joined_content(&self) -> String {
        self.content_fragments().join("\n")
    }

    /// The command, for Bash operations.
    pub fn command(&self) -> Option<&str> {
        match &self.input {
            ToolInput::Bash(b) => Some(b.command.as_str()),
            _ => None,
        }
    }

    /// Total bytes of inspected text.
    pub fn content_size(&self) -> usize {
        self.content_fragments().iter().map(|f| f.len()).sum()
    }
}
