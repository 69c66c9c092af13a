//! Glob specifier → regex translation.
//!
//! Two flavors exist and they are intentionally separate:
//!
//! - [`to_search_regex`] builds an unanchored regex meant to be *found inside*
//!   a command string. Wildcards never cross whitespace or `/`, so `*.pem`
//!   can't stretch from one argument into the next.
//! - [`to_path_regex`] builds an anchored regex compared against a whole path
//!   (or basename), where `*` is unrestricted.

use regex::{Regex, RegexBuilder};

/// Characters that make a path specifier a glob.
const GLOB_CHARS: &[char] = &['*', '?', '['];

/// True if the specifier contains any glob metacharacter (`*`, `?`, `[`).
pub fn is_glob(spec: &str) -> bool {
    spec.contains(GLOB_CHARS)
}

/// Translate a glob into an unanchored regex for searching command text.
///
/// `*` becomes `[^\s/]*`, `?` becomes `[^\s/]`, everything else (including
/// `[`) is matched literally.
pub fn to_search_regex(spec: &str) -> String {
    let mut out = String::with_capacity(spec.len() * 2);
    let mut buf = [0u8; 4];
    for ch in spec.chars() {
        match ch {
            '*' => out.push_str(r"[^\s/]*"),
            '?' => out.push_str(r"[^\s/]"),
            _ => out.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
        }
    }
    out
}

/// Translate a glob into an anchored regex for whole-path comparison.
///
/// `*` becomes `.*`, `?` becomes `.`, and `[...]` character classes are kept
/// (`[!...]` negates, `[:alpha:]` and the other POSIX names work inside a
/// class). An unterminated `[` is treated as a literal bracket.
pub fn to_path_regex(spec: &str) -> String {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = String::with_capacity(spec.len() * 2 + 2);
    out.push('^');
    let mut buf = [0u8; 4];
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
        i += 1;
    }
    out.push('$');
    out
}

/// Length of a `[:name:]` expression starting at `at`, if there is one.
fn named_class_len(chars: &[char], at: usize) -> Option<usize> {
    if chars.get(at) != Some(&'[') || chars.get(at + 1) != Some(&':') {
        return None;
    }
    let name_len = chars[at + 2..]
        .iter()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let close = at + 2 + name_len;
    (name_len > 0 && chars.get(close) == Some(&':') && chars.get(close + 1) == Some(&']'))
        .then_some(name_len + 4)
}

/// Index of the `]` closing the class opened at `start`, fnmatch style:
/// a `]` directly after `[` or `[!` is part of the class, and so is the `]`
/// of an embedded `[:name:]`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if let Some(len) = named_class_len(chars, j) {
            j += len;
            continue;
        }
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Emit a regex character class for the glob class body (without brackets).
fn push_class(out: &mut String, body: &[char]) {
    out.push('[');
    let mut i = 0;
    if body.first() == Some(&'!') {
        out.push('^');
        i = 1;
    }
    while i < body.len() {
        if let Some(len) = named_class_len(body, i) {
            out.extend(&body[i..i + len]);
            i += len;
            continue;
        }
        let c = body[i];
        match c {
            // `-` passes through for ranges; set operators and brackets are escaped.
            '\\' | '[' | ']' | '^' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out.push(']');
}

/// Compile a regex source case-insensitively.
///
/// Callers treat a source that fails here as non-matching; the error is kept
/// for load-time reporting.
pub fn compile_insensitive(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_detection() {
        assert!(is_glob("*.pem"));
        assert!(is_glob("id_rsa?"));
        assert!(is_glob("file[0-9]"));
        assert!(!is_glob("/etc/"));
        assert!(!is_glob("~/.ssh/config"));
    }

    #[test]
    fn search_regex_wildcards() {
        assert_eq!(to_search_regex("*.pem"), r"[^\s/]*\.pem");
        assert_eq!(to_search_regex("key?"), r"key[^\s/]");
    }

    #[test]
    fn search_regex_escapes_brackets() {
        assert_eq!(to_search_regex("a[1]"), r"a\[1\]");
    }

    #[test]
    fn search_regex_does_not_span_arguments() {
        let re = compile_insensitive(&to_search_regex("*.pem")).unwrap();
        assert!(re.is_match("cat server.pem"));
        let m = re.find("cat foo bar.pem").unwrap();
        assert_eq!(m.as_str(), "bar.pem");
    }

    #[test]
    fn search_regex_stops_at_separator() {
        let re = compile_insensitive(&to_search_regex("secrets*")).unwrap();
        let m = re.find("cat secrets/prod.env").unwrap();
        assert_eq!(m.as_str(), "secrets");
    }

    #[test]
    fn path_regex_is_anchored() {
        assert_eq!(to_path_regex("*.pem"), r"^.*\.pem$");
        let re = compile_insensitive(&to_path_regex("*.pem")).unwrap();
        assert!(re.is_match("server.pem"));
        assert!(re.is_match("SERVER.PEM"));
        assert!(!re.is_match("server.pem.bak"));
    }

    #[test]
    fn path_regex_star_crosses_separators() {
        let re = compile_insensitive(&to_path_regex("/home/*/.env")).unwrap();
        assert!(re.is_match("/home/alice/project/.env"));
    }

    #[test]
    fn path_regex_character_class() {
        let re = compile_insensitive(&to_path_regex("backup[0-9].tar")).unwrap();
        assert!(re.is_match("backup7.tar"));
        assert!(!re.is_match("backupx.tar"));
    }

    #[test]
    fn path_regex_negated_class() {
        let re = compile_insensitive(&to_path_regex("log[!0-9]")).unwrap();
        assert!(re.is_match("logs"));
        assert!(!re.is_match("log1"));
    }

    #[test]
    fn path_regex_unclosed_bracket_is_literal() {
        assert_eq!(to_path_regex("a[b"), r"^a\[b$");
        let re = compile_insensitive(&to_path_regex("a[b")).unwrap();
        assert!(re.is_match("a[b"));
    }

    #[test]
    fn path_regex_posix_class() {
        assert_eq!(to_path_regex("[[:digit:]].log"), r"^[[:digit:]]\.log$");
        let re = compile_insensitive(&to_path_regex("[[:digit:]].log")).unwrap();
        assert!(re.is_match("7.log"));
        assert!(!re.is_match("a.log"));
        assert!(!re.is_match(":.log"));
    }

    #[test]
    fn path_regex_negated_posix_class() {
        let re = compile_insensitive(&to_path_regex("id[![:space:]]")).unwrap();
        assert!(re.is_match("idx"));
        assert!(!re.is_match("id "));
    }

    #[test]
    fn path_regex_unknown_posix_class_fails_to_compile() {
        assert!(compile_insensitive(&to_path_regex("[[:bogus:]]")).is_err());
    }

    #[test]
    fn invalid_regex_is_error() {
        assert!(compile_insensitive("(unclosed").is_err());
    }
}
