//! Matching concrete paths against path specifiers.

use std::borrow::Cow;

use regex::Regex;

use super::glob::{compile_insensitive, is_glob, to_path_regex, to_search_regex};

/// Expand a leading `~` (alone or followed by `/`) to `home`.
///
/// With no known home directory the input is returned unchanged.
pub fn expand_home<'a>(input: &'a str, home: Option<&str>) -> Cow<'a, str> {
    shellexpand::tilde_with_context(input, || home)
}

/// Lexically normalize a path: collapse repeated separators, drop `.`
/// components and fold `..` into its parent where there is one.
///
/// No filesystem access; relative paths stay relative.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                // `/..` is `/`
                None if absolute => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Final component of a normalized path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// How a [`PathSpec`] compares against targets.
#[derive(Debug, Clone)]
enum SpecKind {
    /// Prefix/exact comparison against the home-expanded specifier.
    Literal,
    /// Compiled glob regexes. Any of them may be `None` if compilation failed.
    Glob {
        /// Anchored, built from the specifier as written.
        as_written: Option<Regex>,
        /// Anchored, built from the home-expanded specifier.
        expanded: Option<Regex>,
        /// Unanchored, for finding the specifier inside command text.
        search: Option<Regex>,
    },
}

/// A path specifier from the policy, pre-expanded and pre-compiled.
#[derive(Debug, Clone)]
pub struct PathSpec {
    raw: String,
    expanded: String,
    kind: SpecKind,
    /// First compile failure among the glob regexes.
    error: Option<String>,
}

impl PathSpec {
    /// Build a specifier, expanding `~` against `home`.
    ///
    /// A glob whose regexes don't compile is kept; the failing forms never
    /// match and [`error`](Self::error) reports why.
    pub fn new(raw: &str, home: Option<&str>) -> Self {
        let expanded = expand_home(raw, home).into_owned();
        let mut error = None;
        let kind = if is_glob(raw) {
            let mut compile = |source: String| match compile_insensitive(&source) {
                Ok(re) => Some(re),
                Err(e) => {
                    error.get_or_insert_with(|| e.to_string());
                    None
                }
            };
            SpecKind::Glob {
                as_written: compile(to_path_regex(raw)),
                expanded: compile(to_path_regex(&expanded)),
                search: compile(to_search_regex(raw)),
            }
        } else {
            SpecKind::Literal
        };
        Self {
            raw: raw.to_string(),
            expanded,
            kind,
            error,
        }
    }

    /// Why this glob can't be fully compiled, if it can't.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The specifier as written in the policy.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The specifier with `~` expanded.
    pub fn expanded(&self) -> &str {
        &self.expanded
    }

    /// True if this is a glob specifier.
    pub fn is_glob(&self) -> bool {
        matches!(self.kind, SpecKind::Glob { .. })
    }

    /// Does `target` fall under this specifier?
    ///
    /// Globs match case-insensitively against the basename (specifier as
    /// written or expanded) or the whole normalized path (expanded). Literals
    /// match by prefix, so a directory entry like `/etc/` covers its subtree
    /// and also the bare `/etc`.
    pub fn matches_path(&self, target: &str, home: Option<&str>) -> bool {
        let target = normalize(&expand_home(target, home));
        match &self.kind {
            SpecKind::Glob {
                as_written,
                expanded,
                ..
            } => {
                let base = file_name(&target);
                let hit = |re: &Option<Regex>, s: &str| re.as_ref().is_some_and(|re| re.is_match(s));
                hit(expanded, base) || hit(as_written, base) || hit(expanded, &target)
            }
            SpecKind::Literal => {
                target.starts_with(self.expanded.as_str())
                    || self.expanded.strip_suffix('/') == Some(target.as_str())
            }
        }
    }

    /// Is this specifier referenced anywhere in `command`?
    ///
    /// Globs are searched with the separator-bounded search regex; literals
    /// by substring, as written or expanded.
    pub fn appears_in(&self, command: &str) -> bool {
        match &self.kind {
            SpecKind::Glob { search, .. } => search.as_ref().is_some_and(|re| re.is_match(command)),
            SpecKind::Literal => command.contains(self.expanded.as_str()) || command.contains(self.raw.as_str()),
        }
    }
}

/// One-shot form of [`PathSpec::matches_path`].
pub fn matches_path(target: &str, spec: &str, home: Option<&str>) -> bool {
    PathSpec::new(spec, home).matches_path(target, home)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: Option<&str> = Some("/home/dev");

    #[test]
    fn expand_leading_tilde() {
        assert_eq!(expand_home("~/.ssh", HOME), "/home/dev/.ssh");
        assert_eq!(expand_home("~", HOME), "/home/dev");
        assert_eq!(expand_home("/etc/~", HOME), "/etc/~");
    }

    #[test]
    fn expand_without_home_is_identity() {
        assert_eq!(expand_home("~/.ssh", None), "~/.ssh");
    }

    #[test]
    fn normalize_collapses() {
        assert_eq!(normalize("/etc//nginx/./conf"), "/etc/nginx/conf");
        assert_eq!(normalize("/etc/nginx/../hosts"), "/etc/hosts");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("foo/"), "foo");
        assert_eq!(normalize("../x"), "../x");
        assert_eq!(normalize("./"), ".");
    }

    #[test]
    fn glob_basename_match() {
        assert!(matches_path("/tmp/keys/server.pem", "*.pem", HOME));
        assert!(!matches_path("/tmp/keys/server.pem.bak", "*.pem", HOME));
    }

    #[test]
    fn glob_is_case_insensitive() {
        assert!(matches_path("/tmp/SERVER.PEM", "*.pem", HOME));
    }

    #[test]
    fn glob_full_path_with_home() {
        assert!(matches_path("/home/dev/.aws/credentials", "~/.aws/*", HOME));
        assert!(matches_path("~/.aws/config", "~/.aws/*", HOME));
        assert!(!matches_path("/root/.aws/config", "~/.aws/*", HOME));
    }

    #[test]
    fn literal_directory_prefix() {
        assert!(matches_path("/etc/hosts", "/etc/", HOME));
        assert!(matches_path("/etc", "/etc/", HOME));
        assert!(matches_path("/etc/nginx/../hosts", "/etc/", HOME));
        assert!(!matches_path("/var/etc/hosts", "/etc/", HOME));
    }

    #[test]
    fn literal_home_relative() {
        assert!(matches_path("/home/dev/.ssh/id_rsa", "~/.ssh/", HOME));
        assert!(matches_path("~/.ssh/id_rsa", "~/.ssh/", HOME));
        assert!(!matches_path("/home/other/.ssh/id_rsa", "~/.ssh/", HOME));
    }

    #[test]
    fn literal_is_case_sensitive() {
        assert!(!matches_path("/ETC/hosts", "/etc/", HOME));
    }

    #[test]
    fn appears_in_literal_either_form() {
        let spec = PathSpec::new("~/.ssh/", HOME);
        assert!(spec.appears_in("cat ~/.ssh/id_rsa"));
        assert!(spec.appears_in("cat /home/dev/.ssh/id_rsa"));
        assert!(!spec.appears_in("cat /etc/hosts"));
    }

    #[test]
    fn broken_glob_reports_error_and_never_matches() {
        let spec = PathSpec::new("[z-a].key", HOME);
        assert!(spec.error().is_some());
        assert!(!spec.matches_path("/tmp/z.key", HOME));
        assert!(!spec.matches_path("/tmp/a.key", HOME));
        assert!(PathSpec::new("*.key", HOME).error().is_none());
        assert!(PathSpec::new("/etc/", HOME).error().is_none());
    }

    #[test]
    fn appears_in_glob() {
        let spec = PathSpec::new("*.pem", HOME);
        assert!(spec.is_glob());
        assert!(spec.appears_in("openssl x509 -in certs/server.pem"));
        assert!(!spec.appears_in("ls certs/"));
    }
}
