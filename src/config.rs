use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

/// Environment variable naming an explicit policy file.
pub const CONFIG_ENV_VAR: &str = "CC_GUARDRAIL_CONFIG";

/// Policy file names looked up under `$CLAUDE_PROJECT_DIR/.claude/`.
const PROJECT_POLICY_FILES: &[&str] = &["guardrail.yaml", "guardrail.yml", "guardrail.toml"];

/// User overlay file names looked up under `~/.config/cc-guardrail/`.
const OVERLAY_FILES: &[&str] = &["overlay.toml", "overlay.yaml", "overlay.yml"];

// ── Policy types ──

/// The four policy tiers.
///
/// Keys follow the camelCase names used by existing policy files;
/// `bashToolPatterns` and snake_case spellings are accepted as aliases.
/// Absent (or null) tiers are empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        alias = "bashToolPatterns",
        alias = "command_patterns",
        alias = "bash_tool_patterns"
    )]
    pub command_patterns: Vec<CommandPattern>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "zero_access_paths")]
    pub zero_access_paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "read_only_paths")]
    pub read_only_paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "no_delete_paths")]
    pub no_delete_paths: Vec<String>,
}

/// A free-form regex searched (case-insensitively) in shell commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandPattern {
    pub pattern: String,
    #[serde(default)]
    pub reason: String,
    /// Marks an ask-type entry. Evaluated exactly like a blocking entry.
    #[serde(default, alias = "ask")]
    pub advisory: bool,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ── Errors ──

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read policy file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse YAML policy {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to parse TOML policy {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk policy format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// `.toml` is TOML; anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }
}

/// Deserialize `content` as `T` in the given format, attributing errors to `path`.
fn parse<T>(content: &str, format: Format, path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match format {
        // A YAML stream with no document (blank, or only comments) is an empty policy.
        Format::Yaml if is_blank_yaml(content) => Ok(T::default()),
        Format::Yaml => serde_yaml::from_str::<Option<T>>(content)
            .map(Option::unwrap_or_default)
            .map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            }),
        Format::Toml => toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_blank_yaml(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl PolicyConfig {
    /// Parse a YAML policy document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        parse(content, Format::Yaml, Path::new("<inline>"))
    }

    /// Parse a TOML policy document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        parse(content, Format::Toml, Path::new("<inline>"))
    }

    /// Read and parse a policy file, format chosen by extension.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        parse(&content, Format::from_path(path), path)
    }

    /// True if every tier is empty (everything is allowed).
    pub fn is_empty(&self) -> bool {
        self.command_patterns.is_empty()
            && self.zero_access_paths.is_empty()
            && self.read_only_paths.is_empty()
            && self.no_delete_paths.is_empty()
    }

    /// Apply an overlay on top of this policy (merge semantics).
    fn apply_overlay(&mut self, overlay: PolicyOverlay) {
        let replace = overlay.replace;
        let removed = &overlay.remove_command_patterns;
        merge_list(
            &mut self.command_patterns,
            overlay.command_patterns,
            |p| removed.contains(&p.pattern),
            replace,
        );
        let removed = &overlay.remove_zero_access_paths;
        merge_list(
            &mut self.zero_access_paths,
            overlay.zero_access_paths,
            |p| removed.contains(p),
            replace,
        );
        let removed = &overlay.remove_read_only_paths;
        merge_list(
            &mut self.read_only_paths,
            overlay.read_only_paths,
            |p| removed.contains(p),
            replace,
        );
        let removed = &overlay.remove_no_delete_paths;
        merge_list(
            &mut self.no_delete_paths,
            overlay.no_delete_paths,
            |p| removed.contains(p),
            replace,
        );
    }
}

// ── Overlay (user policy merged onto the project policy) ──

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PolicyOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        alias = "bashToolPatterns",
        alias = "command_patterns",
        alias = "bash_tool_patterns"
    )]
    command_patterns: Vec<CommandPattern>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "zero_access_paths")]
    zero_access_paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "read_only_paths")]
    read_only_paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "no_delete_paths")]
    no_delete_paths: Vec<String>,
    /// Removes entries whose `pattern` equals one of these.
    #[serde(default, deserialize_with = "null_as_empty", alias = "remove_command_patterns")]
    remove_command_patterns: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "remove_zero_access_paths")]
    remove_zero_access_paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "remove_read_only_paths")]
    remove_read_only_paths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", alias = "remove_no_delete_paths")]
    remove_no_delete_paths: Vec<String>,
}

/// Merge a user list into a base list.
/// In replace mode: user list replaces the base entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list<T, F>(base: &mut Vec<T>, add: Vec<T>, is_removed: F, replace: bool)
where
    T: PartialEq,
    F: Fn(&T) -> bool,
{
    if replace {
        *base = add;
    } else {
        base.retain(|item| !is_removed(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

// ── Source resolution ──

/// Where the base policy comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// Named on the command line or via [`CONFIG_ENV_VAR`]; must exist.
    Explicit(PathBuf),
    /// Found by discovery; if it has since disappeared it loads as empty.
    Discovered(PathBuf),
    /// No policy file: everything is allowed.
    Empty,
}

/// Directories searched when no explicit policy is named.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchRoots {
    /// `$CLAUDE_PROJECT_DIR/.claude`; `None` when an explicit base is set.
    project: Option<PathBuf>,
    /// `$HOME/.config/cc-guardrail`
    user: Option<PathBuf>,
}

/// Resolves and (re)reads the policy files.
///
/// Resolution order for the base policy:
/// 1. explicit path (`--config`)
/// 2. `$CC_GUARDRAIL_CONFIG`
/// 3. `$CLAUDE_PROJECT_DIR/.claude/guardrail.{yaml,yml,toml}`
///
/// An overlay from `~/.config/cc-guardrail/overlay.{toml,yaml,yml}` is then
/// merged on top: lists extend, `remove*` lists subtract, `replace = true`
/// replaces the base entirely.
///
/// A discovering loader repeats the directory search on every
/// [`load`](Self::load), so files created after startup are picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoader {
    base: PolicySource,
    overlay: Option<PathBuf>,
    roots: Option<SearchRoots>,
}

impl ConfigLoader {
    /// A loader for the given source with no overlay and no discovery.
    pub fn new(base: PolicySource) -> Self {
        Self {
            base,
            overlay: None,
            roots: None,
        }
    }

    /// Add an overlay file merged on top of the base.
    pub fn with_overlay(mut self, path: impl Into<PathBuf>) -> Self {
        self.overlay = Some(path.into());
        self
    }

    /// Resolve sources from the process environment.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self::discover_from(explicit, |key| std::env::var_os(key))
    }

    /// Resolve sources using `env` for environment lookups.
    ///
    /// The environment is read once here; the directories it names are
    /// searched again on each load.
    pub fn discover_from<E>(explicit: Option<PathBuf>, env: E) -> Self
    where
        E: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

        let explicit = explicit.or_else(|| non_empty(CONFIG_ENV_VAR).map(PathBuf::from));
        let project = match explicit {
            Some(_) => None,
            None => non_empty("CLAUDE_PROJECT_DIR").map(|dir| Path::new(&dir).join(".claude")),
        };
        let user = non_empty("HOME").map(|home| Path::new(&home).join(".config/cc-guardrail"));

        Self {
            base: explicit.map_or(PolicySource::Empty, PolicySource::Explicit),
            overlay: None,
            roots: Some(SearchRoots { project, user }),
        }
    }

    /// The base source as it resolves right now.
    pub fn source(&self) -> PolicySource {
        match &self.roots {
            Some(SearchRoots {
                project: Some(dir), ..
            }) => first_existing(dir, PROJECT_POLICY_FILES)
                .map_or(PolicySource::Empty, PolicySource::Discovered),
            _ => self.base.clone(),
        }
    }

    /// The overlay path as it resolves right now, if any.
    pub fn overlay(&self) -> Option<PathBuf> {
        self.overlay.clone().or_else(|| {
            self.roots
                .as_ref()
                .and_then(|roots| roots.user.as_deref())
                .and_then(|dir| first_existing(dir, OVERLAY_FILES))
        })
    }

    /// Resolve, read and merge the policy. Re-reads storage on every call.
    ///
    /// A malformed overlay is reported and skipped; a malformed or missing
    /// explicit base is an error.
    pub fn load(&self) -> Result<PolicyConfig, ConfigError> {
        let mut config = match self.source() {
            PolicySource::Explicit(path) => PolicyConfig::load_file(&path)?,
            PolicySource::Discovered(path) if path.exists() => PolicyConfig::load_file(&path)?,
            PolicySource::Discovered(path) => {
                log::info!("policy file {} is gone; using empty policy", path.display());
                PolicyConfig::default()
            }
            PolicySource::Empty => PolicyConfig::default(),
        };

        if let Some(path) = self.overlay()
            && path.exists()
        {
            match load_overlay(&path) {
                Ok(overlay) => config.apply_overlay(overlay),
                Err(e) => log::warn!("ignoring overlay: {e}"),
            }
        }

        Ok(config)
    }
}

fn load_overlay(path: &Path) -> Result<PolicyOverlay, ConfigError> {
    let content = read_file(path)?;
    parse(&content, Format::from_path(path), path)
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|n| dir.join(n)).find(|p| p.is_file())
}
