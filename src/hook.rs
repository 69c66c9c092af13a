//! Hook payload ↔ engine query translation.
//!
//! Tool-call shapes differ between hosts (`file_path` vs `filePath`, etc.),
//! so each surface has an ordered list of candidate field names; the first
//! non-empty string wins.

use serde::Deserialize;
use serde_json::Value;

use crate::eval::{PathMode, Query, Verdict};

/// Fields that may carry a shell command.
pub const COMMAND_FIELDS: &[&str] = &["command", "cmd", "script"];

/// Fields that may carry a target path.
pub const PATH_FIELDS: &[&str] = &["file_path", "filePath", "path", "notebook_path", "notebookPath"];

/// Tools whose target is modified.
const MODIFY_TOOLS: &[&str] = &["edit", "multiedit", "write", "notebookedit", "patch"];

/// Tools that only read or enumerate their target.
const READ_TOOLS: &[&str] = &["read", "glob", "grep", "ls", "list"];

/// `PreToolUse` payload. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct HookInput {
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Value,
}

/// How a tool is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Shell,
    Path(PathMode),
}

/// Classify a tool by name (case-insensitive). `None` means unchecked.
pub fn classify_tool(name: &str) -> Option<ToolKind> {
    let name = name.to_ascii_lowercase();
    if name == "bash" {
        Some(ToolKind::Shell)
    } else if MODIFY_TOOLS.contains(&name.as_str()) {
        Some(ToolKind::Path(PathMode::FullCheck))
    } else if READ_TOOLS.contains(&name.as_str()) {
        Some(ToolKind::Path(PathMode::ZeroAccessOnly))
    } else {
        None
    }
}

/// First candidate field holding a non-empty string.
pub fn first_string_field<'a>(input: &'a Value, candidates: &[&str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|key| input.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

impl HookInput {
    /// Parse a payload from JSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Resolve the query to evaluate, if this tool call is checked at all.
    pub fn query(&self) -> Option<Query<'_>> {
        let kind = classify_tool(self.tool_name.as_deref()?)?;
        match kind {
            ToolKind::Shell => first_string_field(&self.tool_input, COMMAND_FIELDS).map(Query::Command),
            ToolKind::Path(mode) => first_string_field(&self.tool_input, PATH_FIELDS)
                .map(|target| Query::Path { target, mode }),
        }
    }
}

/// Hook output for a blocked call; `None` lets the normal permission flow
/// decide.
pub fn hook_output(verdict: &Verdict) -> Option<Value> {
    if !verdict.blocked {
        return None;
    }
    Some(serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": "deny",
            "permissionDecisionReason": format!("Blocked: {}", verdict.reason),
        }
    }))
}
