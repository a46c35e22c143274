//! Compilation of keyword invocations into executable fragments.
//!
//! # Responsibility
//! - Define the AST contract the host parser hands to the keyword engine.
//! - Bind invocation arguments through a pluggable parameter binder.
//! - Emit a fragment per body mode that drives the scope engine.
//!
//! # Invariants
//! - Compile errors carry the source span of the offending node and never
//!   yield a partial fragment.
//! - A keyword without scope hooks emits no scope instructions.
//! - Parse-hook errors propagate unchanged.

pub mod ast;
pub mod dispatcher;
pub mod error;
pub mod fragment;
pub mod params;

pub use ast::{CommandElement, Expr, HashtableEntry, KeywordInvocation, ScriptBlock, SourceSpan, Statement};
pub use dispatcher::KeywordCompiler;
pub use error::{CompileError, CompileResult, InvocationError, InvocationErrorKind};
pub use fragment::{ArgumentPlan, Fragment, Instruction, Operand, PropertyPlan};
pub use params::{BoundArguments, ParameterBinder, StaticParameterBinder};
