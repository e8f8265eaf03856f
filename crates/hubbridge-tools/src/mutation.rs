//! Classification of remote tools that change state.
//!
//! A timeout on a mutating call does not prove the call had no effect, so
//! such calls can be excluded from retries. Classification is by name only.

use regex::Regex;

/// Decides whether a remote tool may change state.
pub trait MutationClassifier: Send + Sync {
    /// Whether calling `tool_name` may have side effects.
    fn is_mutating(&self, tool_name: &str) -> bool;
}

impl<F> MutationClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_mutating(&self, tool_name: &str) -> bool {
        self(tool_name)
    }
}

/// Flags a tool as mutating when its name contains a state-changing verb.
///
/// Matching is a case-insensitive substring search, so `add` also matches
/// `address`. Replace the classifier when precision matters.
#[derive(Debug, Clone)]
pub struct VerbHeuristic {
    pattern: Regex,
}

impl VerbHeuristic {
    /// Verbs treated as state-changing.
    pub const VERBS: &'static [&'static str] = &[
        "create", "delete", "update", "merge", "rename", "add", "remove", "complete", "dispose",
        "run", "start", "logout", "auth", "upload", "install",
    ];

    pub fn new() -> Self {
        let pattern = format!("(?i)({})", Self::VERBS.join("|"));
        Self {
            pattern: Regex::new(&pattern)
                .expect("Invalid regex pattern - built from constant verbs"),
        }
    }
}

impl Default for VerbHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationClassifier for VerbHeuristic {
    fn is_mutating(&self, tool_name: &str) -> bool {
        self.pattern.is_match(tool_name)
    }
}
