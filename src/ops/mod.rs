//! Operation classifier: does a shell command modify a given path, and how?
//!
//! Templates from [`templates`] are instantiated per path specifier. Glob
//! specifiers use the separator-bounded search regex in place of `{path}`;
//! literal specifiers are escaped and tried both as written and with `~`
//! expanded, since a command may use either form.

pub mod templates;

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::pattern::{PathSpec, to_search_regex};
use templates::{DELETE, MODIFICATION_GROUPS, PATH_SLOT, Template};

/// Filesystem operation detected in a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    Append,
    Edit,
    Move,
    Copy,
    Delete,
    Chmod,
    Chown,
    Chgrp,
    Truncate,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Write => "write",
            Operation::Append => "append",
            Operation::Edit => "edit",
            Operation::Move => "move",
            Operation::Copy => "copy",
            Operation::Delete => "delete",
            Operation::Chmod => "chmod",
            Operation::Chown => "chown",
            Operation::Chgrp => "chgrp",
            Operation::Truncate => "truncate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which templates to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSet {
    /// Every modifying idiom (read-only tier).
    Modifications,
    /// Deletion only (no-delete tier).
    DeleteOnly,
}

impl TemplateSet {
    fn groups(self) -> &'static [&'static [Template]] {
        match self {
            TemplateSet::Modifications => MODIFICATION_GROUPS,
            TemplateSet::DeleteOnly => std::slice::from_ref(&DELETE),
        }
    }

    /// Name of the policy tier this set guards, for reasons.
    fn tier_label(self) -> &'static str {
        match self {
            TemplateSet::Modifications => "read-only",
            TemplateSet::DeleteOnly => "no-delete",
        }
    }
}

/// A detected operation and the human-readable reason for blocking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMatch {
    pub operation: Operation,
    pub reason: String,
}

/// Templates of one set compiled against one path specifier.
#[derive(Debug, Clone)]
pub struct OperationMatcher {
    spec: String,
    set: TemplateSet,
    /// In template order; each template contributes zero, one or two regexes.
    compiled: Vec<(Operation, Vec<Regex>)>,
}

impl OperationMatcher {
    pub fn new(spec: &PathSpec, set: TemplateSet) -> Self {
        let templates = set.groups().iter().flat_map(|g| g.iter());
        let compiled: Vec<(Operation, Vec<Regex>)> = if spec.is_glob() {
            let search = to_search_regex(spec.raw());
            templates
                .filter_map(|tpl| {
                    let prefix = tpl.fragment.replace(PATH_SLOT, "");
                    if prefix.is_empty() {
                        return None;
                    }
                    let re = RegexBuilder::new(&format!("{prefix}{search}"))
                        .case_insensitive(true)
                        .build()
                        .ok()?;
                    Some((tpl.operation, vec![re]))
                })
                .collect()
        } else {
            let mut forms = vec![regex::escape(spec.expanded())];
            let as_written = regex::escape(spec.raw());
            if !forms.contains(&as_written) {
                forms.push(as_written);
            }
            templates
                .map(|tpl| {
                    let variants: Vec<Regex> = forms
                        .iter()
                        .filter_map(|form| Regex::new(&tpl.fragment.replace(PATH_SLOT, form)).ok())
                        .collect();
                    (tpl.operation, variants)
                })
                .collect()
        };
        Self {
            spec: spec.raw().to_string(),
            set,
            compiled,
        }
    }

    /// First template (in set order) whose regex matches `command`.
    pub fn find(&self, command: &str) -> Option<OperationMatch> {
        let (operation, _) = self
            .compiled
            .iter()
            .find(|(_, variants)| variants.iter().any(|re| re.is_match(command)))?;
        Some(OperationMatch {
            operation: *operation,
            reason: format!(
                "{operation} operation on {tier} path {spec}",
                tier = self.set.tier_label(),
                spec = self.spec,
            ),
        })
    }
}

/// One-shot classifier: compile the set for `spec` and test `command`.
pub fn find_operation(
    command: &str,
    spec: &str,
    set: TemplateSet,
    home: Option<&str>,
) -> Option<OperationMatch> {
    OperationMatcher::new(&PathSpec::new(spec, home), set).find(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: Option<&str> = Some("/home/dev");

    fn op(command: &str, spec: &str, set: TemplateSet) -> Option<Operation> {
        find_operation(command, spec, set, HOME).map(|m| m.operation)
    }

    fn modify(command: &str, spec: &str) -> Option<Operation> {
        op(command, spec, TemplateSet::Modifications)
    }

    #[test]
    fn redirect_is_write() {
        assert_eq!(modify("echo x > /etc/hosts", "/etc/"), Some(Operation::Write));
        assert_eq!(modify("echo x >/etc/hosts", "/etc/"), Some(Operation::Write));
    }

    #[test]
    fn double_redirect_is_append() {
        assert_eq!(modify("echo x >> /etc/hosts", "/etc/"), Some(Operation::Append));
    }

    #[test]
    fn tee_write_and_append() {
        assert_eq!(modify("echo x | tee /etc/hosts", "/etc/"), Some(Operation::Write));
        assert_eq!(modify("echo x | tee -p /etc/hosts", "/etc/"), Some(Operation::Write));
        assert_eq!(modify("echo x | tee -a /etc/hosts", "/etc/"), Some(Operation::Append));
        assert_eq!(
            modify("echo x | tee --append /etc/hosts", "/etc/"),
            Some(Operation::Append)
        );
    }

    #[test]
    fn in_place_editors() {
        assert_eq!(modify("sed -i 's/a/b/' /etc/hosts", "/etc/"), Some(Operation::Edit));
        assert_eq!(
            modify("sed -e 's/a/b/' -i.bak /etc/hosts", "/etc/"),
            Some(Operation::Edit)
        );
        assert_eq!(modify("perl -pi -e 's/a/b/' /etc/hosts", "/etc/"), Some(Operation::Edit));
        assert_eq!(
            modify("awk -i inplace '{print}' /etc/hosts", "/etc/"),
            Some(Operation::Edit)
        );
        assert_eq!(modify("sed -n '1p' /etc/hosts", "/etc/"), None);
    }

    #[test]
    fn move_source_and_destination() {
        assert_eq!(modify("mv /etc/hosts /tmp/hosts", "/etc/"), Some(Operation::Move));
        assert_eq!(modify("mv /tmp/hosts /etc/hosts", "/etc/"), Some(Operation::Move));
    }

    #[test]
    fn copy_destination_only() {
        assert_eq!(modify("cp /tmp/hosts /etc/hosts", "/etc/"), Some(Operation::Copy));
        assert_eq!(modify("cp /etc/hosts /tmp/hosts", "/etc/"), None);
    }

    #[test]
    fn permission_changes() {
        assert_eq!(modify("chmod 600 /etc/hosts", "/etc/"), Some(Operation::Chmod));
        assert_eq!(modify("chown root /etc/hosts", "/etc/"), Some(Operation::Chown));
        assert_eq!(modify("chgrp wheel /etc/hosts", "/etc/"), Some(Operation::Chgrp));
    }

    #[test]
    fn truncate_command() {
        assert_eq!(modify("truncate -s 0 /etc/hosts", "/etc/"), Some(Operation::Truncate));
    }

    #[test]
    fn reads_are_not_modifications() {
        assert_eq!(modify("cat /etc/hosts", "/etc/"), None);
        assert_eq!(modify("grep localhost /etc/hosts", "/etc/"), None);
        assert_eq!(modify("echo x > /tmp/out", "/etc/"), None);
    }

    #[test]
    fn delete_only_set() {
        assert_eq!(op("rm LICENSE", "LICENSE", TemplateSet::DeleteOnly), Some(Operation::Delete));
        assert_eq!(op("rm -f LICENSE", "LICENSE", TemplateSet::DeleteOnly), Some(Operation::Delete));
        assert_eq!(op("unlink LICENSE", "LICENSE", TemplateSet::DeleteOnly), Some(Operation::Delete));
        assert_eq!(op("echo x >> LICENSE", "LICENSE", TemplateSet::DeleteOnly), None);
        assert_eq!(op("chmod 644 LICENSE", "LICENSE", TemplateSet::DeleteOnly), None);
    }

    #[test]
    fn home_relative_literal_both_forms() {
        assert_eq!(modify("echo x > ~/.bashrc", "~/.bashrc"), Some(Operation::Write));
        assert_eq!(
            modify("echo x > /home/dev/.bashrc", "~/.bashrc"),
            Some(Operation::Write)
        );
    }

    #[test]
    fn literal_is_escaped() {
        // `.` in the specifier must not match arbitrary characters
        assert_eq!(modify("rm package-lock_json", "package-lock.json"), None);
        assert_eq!(modify("rm package-lock.json", "package-lock.json"), Some(Operation::Delete));
    }

    #[test]
    fn glob_specifier() {
        assert_eq!(modify("rm certs/server.pem", "*.pem"), Some(Operation::Delete));
        assert_eq!(modify("echo x > SERVER.PEM", "*.pem"), Some(Operation::Write));
        assert_eq!(modify("cat server.pem", "*.pem"), None);
    }

    #[test]
    fn reason_names_operation_tier_and_path() {
        let m = find_operation("rm LICENSE", "LICENSE", TemplateSet::DeleteOnly, HOME).unwrap();
        assert_eq!(m.reason, "delete operation on no-delete path LICENSE");
        let m = find_operation("echo x > /etc/hosts", "/etc/", TemplateSet::Modifications, HOME)
            .unwrap();
        assert_eq!(m.reason, "write operation on read-only path /etc/");
    }
}
