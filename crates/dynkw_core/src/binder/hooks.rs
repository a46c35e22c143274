//! Hook capability flags and hook-facing error types.

use crate::compile::ast::SourceSpan;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One optional behavior a keyword type may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hook {
    PreParse,
    PostParse,
    SemanticCheck,
    EnterScope,
    LeaveScope,
}

impl Hook {
    pub const ALL: [Hook; 5] = [
        Hook::PreParse,
        Hook::PostParse,
        Hook::SemanticCheck,
        Hook::EnterScope,
        Hook::LeaveScope,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreParse => "pre_parse",
            Self::PostParse => "post_parse",
            Self::SemanticCheck => "semantic_check",
            Self::EnterScope => "enter_scope",
            Self::LeaveScope => "leave_scope",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::PreParse => 1,
            Self::PostParse => 1 << 1,
            Self::SemanticCheck => 1 << 2,
            Self::EnterScope => 1 << 3,
            Self::LeaveScope => 1 << 4,
        }
    }
}

/// Set of hooks a keyword type implements, declared once at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HookSet(u8);

impl HookSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn of(hooks: &[Hook]) -> Self {
        hooks.iter().fold(Self::empty(), |set, hook| set.with(*hook))
    }

    pub fn with(self, hook: Hook) -> Self {
        Self(self.0 | hook.bit())
    }

    pub fn contains(self, hook: Hook) -> bool {
        self.0 & hook.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Hook> {
        Hook::ALL.into_iter().filter(move |hook| self.contains(*hook))
    }
}

impl Display for HookSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(Hook::as_str).collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Failure raised by user-supplied hook code.
///
/// The engine never wraps or rewrites these: whatever the hook returned is
/// what the caller sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for HookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HookError {}

/// Diagnostic reported (not raised) by parse-time hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{span}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Hook, HookSet};

    #[test]
    fn hook_set_tracks_membership() {
        let set = HookSet::of(&[Hook::EnterScope, Hook::SemanticCheck]);
        assert!(set.contains(Hook::EnterScope));
        assert!(set.contains(Hook::SemanticCheck));
        assert!(!set.contains(Hook::LeaveScope));
        assert_eq!(set.iter().count(), 2);
        assert_eq!(set.to_string(), "semantic_check|enter_scope");
    }

    #[test]
    fn empty_set_displays_none() {
        assert!(HookSet::empty().is_empty());
        assert_eq!(HookSet::default().to_string(), "none");
    }
}
