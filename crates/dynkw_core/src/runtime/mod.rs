//! Script-execution side of keyword invocations.
//!
//! # Responsibility
//! - Hold per-invocation keyword state.
//! - Track active invocations in a LIFO scope engine and aggregate child
//!   results into parents.
//! - Execute compiled keyword fragments against an explicit context.
//!
//! # Invariants
//! - Scope state lives in a context value threaded through execution; there
//!   is no process-wide scope stack.
//! - A parent's leave hook runs only after every child it entered has left.

pub mod executor;
pub mod instance;
pub mod scope;

pub use executor::{execute, ExecutionContext, ExecutionError};
pub use instance::KeywordInstance;
pub use scope::{ScopeContext, ScopeError, ScopeFrame};
