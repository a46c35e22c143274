//! LIFO scope engine for nested keyword invocations.
//!
//! Two parallel stacks: active frames and, per frame, the results of the
//! direct children that entered and left while it was open. Every entered
//! child contributes exactly one entry (`None` when it has no leave hook).
//! Keywords with neither hook never reach this engine.

use crate::binder::hooks::HookError;
use crate::model::value::Value;
use crate::runtime::instance::KeywordInstance;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One active invocation and whatever its enter hook returned.
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub instance: KeywordInstance,
    pub entry_result: Option<Value>,
}

/// Enter/leave counters, mainly for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeStats {
    pub enters: usize,
    pub leaves: usize,
}

#[derive(Debug, Default)]
pub struct ScopeContext {
    scopes: Vec<ScopeFrame>,
    results: Vec<Vec<Option<Value>>>,
    stats: ScopeStats,
}

impl ScopeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope for `instance`.
    ///
    /// The enter hook sees the ancestor stack as it was before this push. If
    /// the hook fails nothing is pushed.
    pub fn enter_scope(&mut self, instance: KeywordInstance) -> Result<(), ScopeError> {
        let runtime = instance
            .keyword()
            .runtime()
            .ok_or_else(|| ScopeError::Unbound(instance.name().to_string()))?;

        let entry_result = if runtime.has_enter_hook() {
            Some(
                runtime
                    .implementation()
                    .enter_scope(&instance, &self.scopes)
                    .map_err(ScopeError::Hook)?,
            )
        } else {
            None
        };

        self.results.push(Vec::new());
        self.scopes.push(ScopeFrame {
            instance,
            entry_result,
        });
        self.stats.enters += 1;
        Ok(())
    }

    /// Closes the innermost scope and reports its result to the parent.
    pub fn leave_scope(&mut self) -> Result<Option<Value>, ScopeError> {
        let (Some(frame), Some(child_results)) = (self.scopes.pop(), self.results.pop()) else {
            return Err(ScopeError::Underflow);
        };
        self.stats.leaves += 1;

        let result = match frame.instance.keyword().runtime() {
            Some(runtime) if runtime.has_leave_hook() => Some(
                runtime
                    .implementation()
                    .leave_scope(&frame, &self.scopes, &child_results)
                    .map_err(ScopeError::Hook)?,
            ),
            _ => None,
        };

        if let Some(parent_results) = self.results.last_mut() {
            parent_results.push(result.clone());
        }
        Ok(result)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[ScopeFrame] {
        &self.scopes
    }

    pub fn stats(&self) -> ScopeStats {
        self.stats
    }

    /// Drops frames above `depth` without running leave hooks.
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        self.scopes.truncate(depth);
        self.results.truncate(depth);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// A user hook failed; the hook's own error is carried unchanged.
    Hook(HookError),
    /// The keyword has no runtime info; its module was never bound.
    Unbound(String),
    Underflow,
}

impl Display for ScopeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hook(err) => write!(f, "{err}"),
            Self::Unbound(name) => write!(f, "keyword `{name}` is not bound"),
            Self::Underflow => write!(f, "leave_scope called with no active scope"),
        }
    }
}

impl Error for ScopeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hook(err) => Some(err),
            Self::Unbound(_) | Self::Underflow => None,
        }
    }
}
