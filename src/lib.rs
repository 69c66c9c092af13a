//! cc-guardrail: a PreToolUse hook for Claude Code that blocks shell commands
//! and file-tool calls touching protected paths.
//!
//! A policy has four tiers, checked in this order with the first match
//! winning: free-form command regexes, zero-access paths, read-only paths and
//! no-delete paths. Shell commands go through all four; file tools are
//! checked against zero-access (reads) or zero-access then read-only
//! (writes/edits).
//!
//! # Architecture
//!
//! - **[`pattern`]** — Glob → regex translation and path matching.
//! - **[`ops`]** — Operation classifier: shell idioms that write, append, edit, move, copy, delete, chmod or truncate a path.
//! - **[`eval`]** — [`PolicyEngine`](eval::PolicyEngine): compiled policy snapshot and tier evaluation.
//! - **[`config`]** — Policy loading (YAML/TOML), discovery, user overlay merge.
//! - **[`hook`]** — Hook payload → query, verdict → hook output.
//! - **[`logging`]** — Decision logging to `~/.local/share/cc-guardrail/decisions.log`.

/// Policy types, loading, and overlay merge logic.
pub mod config;
/// Evaluation engine: compiled policy, verdicts, queries.
pub mod eval;
/// Hook payload translation.
pub mod hook;
/// File-based decision logging.
pub mod logging;
/// Operation templates and the operation classifier.
pub mod ops;
/// Glob translation and path matching.
pub mod pattern;

pub use config::PolicyConfig;
pub use eval::{PathMode, PolicyEngine, Verdict};

/// Compile `config` and evaluate a shell command against it.
///
/// Convenience for one-off checks; hold a [`PolicyEngine`] to avoid
/// recompiling the policy per query.
pub fn evaluate_command(command: &str, config: &PolicyConfig) -> Verdict {
    PolicyEngine::new(config.clone()).evaluate_command(command)
}

/// Compile `config` and evaluate a file-tool target path against it.
pub fn evaluate_path(target: &str, config: &PolicyConfig, mode: PathMode) -> Verdict {
    PolicyEngine::new(config.clone()).evaluate_path(target, mode)
}
