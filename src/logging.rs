use std::path::PathBuf;

use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use crate::eval::Verdict;

/// Environment variable selecting the log level (`off` … `trace`).
pub const LOG_LEVEL_ENV_VAR: &str = "CC_GUARDRAIL_LOG";

/// `~/.local/share/cc-guardrail/decisions.log`
pub fn log_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".local/share/cc-guardrail/decisions.log"))
}

/// Parse a level name, defaulting to `info` when unset or unrecognized.
fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install a file logger at [`log_path`].
/// Best-effort: failures are silently ignored (logging must never block the hook).
pub fn init() {
    let level = parse_level(std::env::var(LOG_LEVEL_ENV_VAR).ok().as_deref());
    if level == LevelFilter::Off {
        return;
    }
    let Some(path) = log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let _ = WriteLogger::init(level, config, file);
}

/// One tab-separated record: decision, tool, subject, reason.
/// The subject is truncated to 200 characters and the reason kept on one line.
pub fn decision_line(tool: &str, subject: &str, verdict: &Verdict) -> String {
    let subject: String = subject.chars().take(200).collect::<String>().replace('\n', " ");
    let reason = verdict.reason.replace('\n', "; ");
    format!("{}\t{tool}\t{subject}\t{reason}", verdict.label())
}

/// Record a decision for a checked tool call.
pub fn log_decision(tool: &str, subject: &str, verdict: &Verdict) {
    let line = decision_line(tool, subject, verdict);
    if verdict.blocked {
        log::warn!(target: "decision", "{line}");
    } else {
        log::info!(target: "decision", "{line}");
    }
}
