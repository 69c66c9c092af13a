use super::PathMode;

/// A single question put to the engine, already resolved from the host's
/// tool-call shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query<'a> {
    /// A shell command, checked against all four tiers.
    Command(&'a str),
    /// A file-tool target path.
    Path { target: &'a str, mode: PathMode },
}

impl<'a> Query<'a> {
    /// The command text or target path.
    pub fn subject(&self) -> &'a str {
        match *self {
            Query::Command(command) => command,
            Query::Path { target, .. } => target,
        }
    }
}
