//! cc-guardrail: PreToolUse hook for Claude Code.
//!
//! Reads the hook JSON from stdin and, when the tool call touches something
//! the policy protects, writes a `deny` permission decision to stdout.
//! Allowed calls produce no output so the normal permission flow applies.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use cc_guardrail::config::ConfigLoader;
use cc_guardrail::hook::{self, HookInput};
use cc_guardrail::{PolicyEngine, logging};

#[derive(Debug, Parser)]
#[command(name = "cc-guardrail", version)]
#[command(about = "PreToolUse hook that blocks tool calls touching protected paths")]
#[command(after_help = "\
Without --config the policy is taken from $CC_GUARDRAIL_CONFIG, then
$CLAUDE_PROJECT_DIR/.claude/guardrail.{yaml,yml,toml}. A user overlay in
~/.config/cc-guardrail/overlay.{toml,yaml,yml} is merged on top.")]
struct Args {
    /// Policy file (YAML or TOML); overrides discovery
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Load the policy, report entries that don't compile, and exit
    #[arg(long)]
    validate: bool,
}

fn validate(engine: &PolicyEngine) -> i32 {
    let config = engine.config();
    println!(
        "{} command pattern(s), {} zero-access, {} read-only, {} no-delete path(s)",
        config.command_patterns.len(),
        config.zero_access_paths.len(),
        config.read_only_paths.len(),
        config.no_delete_paths.len(),
    );
    let invalid = engine.invalid_patterns();
    for p in invalid {
        println!("invalid {p}");
    }
    if invalid.is_empty() { 0 } else { 1 }
}

fn main() {
    let args = Args::parse();

    logging::init();

    let loader = ConfigLoader::discover(args.config);
    let engine = match PolicyEngine::load(loader) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("{e}");
            eprintln!("cc-guardrail: {e}");
            std::process::exit(1);
        }
    };

    if args.validate {
        std::process::exit(validate(&engine));
    }

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("cc-guardrail: failed to read stdin");
        std::process::exit(1);
    }

    let hook_input = match HookInput::from_json(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("cc-guardrail: JSON parse error: {e}");
            std::process::exit(1);
        }
    };

    let Some(query) = hook_input.query() else {
        std::process::exit(0);
    };

    let verdict = engine.evaluate(&query);
    logging::log_decision(
        hook_input.tool_name.as_deref().unwrap_or_default(),
        query.subject(),
        &verdict,
    );

    if let Some(output) = hook::hook_output(&verdict) {
        println!("{output}");
    }
}
