/// Policy tier that produced a block, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    CommandPattern,
    ZeroAccess,
    ReadOnly,
    NoDelete,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::CommandPattern => "command-pattern",
            Tier::ZeroAccess => "zero-access",
            Tier::ReadOnly => "read-only",
            Tier::NoDelete => "no-delete",
        }
    }
}

/// A policy entry that failed to compile and is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern {
    pub tier: Tier,
    /// Position within its tier's list.
    pub index: usize,
    pub pattern: String,
    pub error: String,
}

impl std::fmt::Display for InvalidPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entry #{} {:?}: {}",
            self.tier.as_str(),
            self.index,
            self.pattern,
            self.error
        )
    }
}

/// Which tiers a path query is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Write/edit-class tools: zero-access, then read-only.
    FullCheck,
    /// Read/enumerate-class tools: zero-access only.
    ZeroAccessOnly,
}

/// Outcome of a query. `reason` is empty when not blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub blocked: bool,
    pub reason: String,
    /// Tier that matched; `None` when allowed.
    pub tier: Option<Tier>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            blocked: false,
            reason: String::new(),
            tier: None,
        }
    }

    pub fn block(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            blocked: true,
            reason: reason.into(),
            tier: Some(tier),
        }
    }

    pub fn label(&self) -> &'static str {
        if self.blocked { "DENY" } else { "ALLOW" }
    }
}
