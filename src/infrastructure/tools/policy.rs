//! # Command Policy
//!
//! Decides whether a command may run, based only on its leading verb.
//!
//! This is defense in depth, not a sandbox. Flags and later arguments are never
//! inspected, so an allowed verb such as `exec` can still run arbitrary code inside a
//! target container, and `scale` can change cluster state. Which verbs are allowed is a
//! deployment decision made in `commands.allowed_verbs`.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionResult {
    Allowed,
    Blocked(String),
}

/// Fixed set of permitted verbs for one external tool. Immutable once built.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    tool: String,
    allowed: BTreeSet<String>,
}

impl CommandPolicy {
    pub fn new<I, S>(tool: impl Into<String>, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tool: tool.into(),
            allowed: verbs
                .into_iter()
                .map(|v| v.as_ref().trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
        }
    }

    /// Name of the external program every command runs through.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Allowed verbs in sorted order.
    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn is_allowed(&self, verb: &str) -> bool {
        self.allowed.contains(&verb.to_lowercase())
    }

    pub fn check_verb(&self, verb: &str) -> PermissionResult {
        if self.is_allowed(verb) {
            PermissionResult::Allowed
        } else {
            PermissionResult::Blocked(crate::strings::messages::verb_not_allowed(
                &verb.to_lowercase(),
            ))
        }
    }
}
