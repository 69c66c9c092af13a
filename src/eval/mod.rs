pub mod context;
pub mod decision;

pub use context::Query;
pub use decision::{InvalidPattern, PathMode, Tier, Verdict};

use std::sync::Arc;

use regex::Regex;

use crate::config::{ConfigError, ConfigLoader, PolicyConfig};
use crate::ops::{OperationMatcher, TemplateSet};
use crate::pattern::{PathSpec, compile_insensitive};

/// A compiled `commandPatterns` entry. `regex` is `None` if the source
/// doesn't compile; such entries never match.
#[derive(Debug)]
struct CommandRule {
    regex: Option<Regex>,
    reason: String,
}

/// A compiled `readOnlyPaths` entry: the path form for file tools, the
/// operation form for shell commands.
#[derive(Debug)]
struct ReadOnlyRule {
    spec: PathSpec,
    ops: OperationMatcher,
}

/// Immutable, compiled view of one policy snapshot.
///
/// Every pattern is compiled once here; queries are pure functions of
/// `(query, engine)`. Reloading produces a new engine rather than mutating
/// this one, so concurrent callers always see a whole snapshot.
#[derive(Debug)]
pub struct PolicyEngine {
    config: Arc<PolicyConfig>,
    loader: Option<ConfigLoader>,
    home: Option<String>,
    commands: Vec<CommandRule>,
    zero_access: Vec<PathSpec>,
    read_only: Vec<ReadOnlyRule>,
    no_delete: Vec<OperationMatcher>,
    invalid: Vec<InvalidPattern>,
}

/// Home directory used for `~` expansion.
fn home_from_env() -> Option<String> {
    std::env::var("HOME").ok().filter(|h| !h.is_empty())
}

impl PolicyEngine {
    /// Compile `config`, expanding `~` against `$HOME`.
    pub fn new(config: PolicyConfig) -> Self {
        Self::with_home(config, home_from_env())
    }

    /// Compile `config`, expanding `~` against `home`.
    pub fn with_home(config: PolicyConfig, home: Option<String>) -> Self {
        Self::build(Arc::new(config), None, home)
    }

    /// Load the policy through `loader` and compile it. The loader is kept
    /// so [`reload`](Self::reload) can re-read the same sources.
    pub fn load(loader: ConfigLoader) -> Result<Self, ConfigError> {
        let config = loader.load()?;
        Ok(Self::build(Arc::new(config), Some(loader), home_from_env()))
    }

    /// Re-read the policy sources and return a fresh engine.
    ///
    /// Engines built without a loader are rebuilt from a copy of their
    /// configuration. `self` is left untouched either way.
    pub fn reload(&self) -> Result<Self, ConfigError> {
        let config = match &self.loader {
            Some(loader) => loader.load()?,
            None => PolicyConfig::clone(&self.config),
        };
        Ok(Self::build(
            Arc::new(config),
            self.loader.clone(),
            self.home.clone(),
        ))
    }

    fn build(config: Arc<PolicyConfig>, loader: Option<ConfigLoader>, home: Option<String>) -> Self {
        let home_ref = home.as_deref();

        let mut invalid = Vec::new();
        let mut skip = |tier: Tier, index: usize, pattern: &str, error: String| {
            log::warn!(
                "{} entry #{index} {pattern:?} does not compile; it will never match: {error}",
                tier.as_str()
            );
            invalid.push(InvalidPattern {
                tier,
                index,
                pattern: pattern.to_string(),
                error,
            });
        };

        let commands = config
            .command_patterns
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let regex = match compile_insensitive(&entry.pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        skip(Tier::CommandPattern, index, entry.pattern.as_str(), e.to_string());
                        None
                    }
                };
                let reason = if entry.reason.is_empty() {
                    format!("command matches blocked pattern {}", entry.pattern)
                } else {
                    entry.reason.clone()
                };
                CommandRule { regex, reason }
            })
            .collect();

        let mut specs = |tier: Tier, paths: &[String]| -> Vec<PathSpec> {
            paths
                .iter()
                .enumerate()
                .map(|(index, p)| {
                    let spec = PathSpec::new(p, home_ref);
                    if let Some(error) = spec.error() {
                        skip(tier, index, p.as_str(), error.to_string());
                    }
                    spec
                })
                .collect()
        };

        let zero_access = specs(Tier::ZeroAccess, &config.zero_access_paths);

        let read_only = specs(Tier::ReadOnly, &config.read_only_paths)
            .into_iter()
            .map(|spec| {
                let ops = OperationMatcher::new(&spec, TemplateSet::Modifications);
                ReadOnlyRule { spec, ops }
            })
            .collect();

        let no_delete = specs(Tier::NoDelete, &config.no_delete_paths)
            .iter()
            .map(|spec| OperationMatcher::new(spec, TemplateSet::DeleteOnly))
            .collect();

        Self {
            config,
            loader,
            home,
            commands,
            zero_access,
            read_only,
            no_delete,
            invalid,
        }
    }

    /// The policy snapshot this engine was compiled from.
    pub fn config(&self) -> &Arc<PolicyConfig> {
        &self.config
    }

    /// Entries that failed to compile at load time, in tier order.
    pub fn invalid_patterns(&self) -> &[InvalidPattern] {
        &self.invalid
    }

    /// Home directory used for `~` expansion.
    pub fn home(&self) -> Option<&str> {
        self.home.as_deref()
    }

    /// Dispatch a resolved query.
    pub fn evaluate(&self, query: &Query<'_>) -> Verdict {
        match *query {
            Query::Command(command) => self.evaluate_command(command),
            Query::Path { target, mode } => self.evaluate_path(target, mode),
        }
    }

    /// Check a shell command: command patterns, then zero-access, read-only
    /// and no-delete paths. First match wins.
    ///
    /// Advisory (ask-type) command patterns block like any other entry.
    pub fn evaluate_command(&self, command: &str) -> Verdict {
        if let Some(rule) = self
            .commands
            .iter()
            .find(|rule| rule.regex.as_ref().is_some_and(|re| re.is_match(command)))
        {
            return Verdict::block(Tier::CommandPattern, rule.reason.clone());
        }

        if let Some(spec) = self.zero_access.iter().find(|spec| spec.appears_in(command)) {
            return zero_access_verdict(spec);
        }

        if let Some(m) = self.read_only.iter().find_map(|rule| rule.ops.find(command)) {
            return Verdict::block(Tier::ReadOnly, m.reason);
        }

        if let Some(m) = self.no_delete.iter().find_map(|ops| ops.find(command)) {
            return Verdict::block(Tier::NoDelete, m.reason);
        }

        Verdict::allow()
    }

    /// Check a file-tool target path.
    ///
    /// No-delete paths are never consulted here: a path alone can't express
    /// a deletion.
    pub fn evaluate_path(&self, target: &str, mode: PathMode) -> Verdict {
        let home = self.home();

        if let Some(spec) = self
            .zero_access
            .iter()
            .find(|spec| spec.matches_path(target, home))
        {
            return zero_access_verdict(spec);
        }

        if mode == PathMode::FullCheck
            && let Some(rule) = self
                .read_only
                .iter()
                .find(|rule| rule.spec.matches_path(target, home))
        {
            return Verdict::block(
                Tier::ReadOnly,
                format!("read-only path {} (modifications not allowed)", rule.spec.raw()),
            );
        }

        Verdict::allow()
    }
}

fn zero_access_verdict(spec: &PathSpec) -> Verdict {
    Verdict::block(
        Tier::ZeroAccess,
        format!("zero-access path {} (no operations allowed)", spec.raw()),
    )
}
