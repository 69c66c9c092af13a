//! Shell idioms that modify a file, as regex templates over a `{path}` slot.
//!
//! Every template ends with `{path}`: the glob flavor of the classifier strips
//! the slot and appends a search regex in its place.

use super::Operation;

/// Placeholder substituted with the (escaped) path or glob search regex.
pub const PATH_SLOT: &str = "{path}";

/// A regex fragment with a `{path}` slot and the operation it detects.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub fragment: &'static str,
    pub operation: Operation,
}

const fn t(fragment: &'static str, operation: Operation) -> Template {
    Template {
        fragment,
        operation,
    }
}

pub static WRITE: &[Template] = &[
    // `>` but not `>>`
    t(r"(?:^|[^>])>\s*{path}", Operation::Write),
    // tee without an append flag; each preceding word is a flag lacking `a` or a plain word
    t(r"\btee\s+(?:(?:-[^\sa]*|[^\s-]\S*)\s+)*{path}", Operation::Write),
];

pub static APPEND: &[Template] = &[
    t(r">>\s*{path}", Operation::Append),
    t(r"\btee\s+(?:.*\s)?-\S*a\S*\s+.*{path}", Operation::Append),
];

pub static EDIT: &[Template] = &[
    t(r"\bsed\s+(?:.*\s)?-[^\s]*i.*{path}", Operation::Edit),
    t(r"\bperl\s+-[^\s]*i.*{path}", Operation::Edit),
    t(r"\bawk\s+-i\s+inplace.*{path}", Operation::Edit),
];

pub static MOVE_COPY: &[Template] = &[
    // mv modifies both source and destination
    t(r"\bmv\s+(?:.*\s)?{path}", Operation::Move),
    // cp only writes its destination
    t(r"\bcp\s+.*\s+{path}", Operation::Copy),
];

pub static DELETE: &[Template] = &[
    t(r"\brm\s+.*{path}", Operation::Delete),
    t(r"\bunlink\s+.*{path}", Operation::Delete),
    t(r"\brmdir\s+.*{path}", Operation::Delete),
    t(r"\bshred\s+.*{path}", Operation::Delete),
];

pub static PERMISSION: &[Template] = &[
    t(r"\bchmod\s+.*{path}", Operation::Chmod),
    t(r"\bchown\s+.*{path}", Operation::Chown),
    t(r"\bchgrp\s+.*{path}", Operation::Chgrp),
];

pub static TRUNCATE: &[Template] = &[
    t(r"\btruncate\s+.*{path}", Operation::Truncate),
    t(r":\s*>\s*{path}", Operation::Truncate),
];

/// Every group that counts as a modification, in matching order.
pub static MODIFICATION_GROUPS: &[&[Template]] =
    &[WRITE, APPEND, EDIT, MOVE_COPY, DELETE, PERMISSION, TRUNCATE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_ends_with_slot() {
        for group in MODIFICATION_GROUPS {
            for tpl in *group {
                assert!(
                    tpl.fragment.ends_with(PATH_SLOT),
                    "template must end with {PATH_SLOT}: {}",
                    tpl.fragment
                );
                assert_eq!(tpl.fragment.matches(PATH_SLOT).count(), 1);
            }
        }
    }

    #[test]
    fn every_template_compiles() {
        for group in MODIFICATION_GROUPS {
            for tpl in *group {
                let src = tpl.fragment.replace(PATH_SLOT, "x");
                assert!(regex::Regex::new(&src).is_ok(), "bad template: {}", tpl.fragment);
            }
        }
    }
}
