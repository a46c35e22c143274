//! Binding of discovered keyword specs to loaded module code.
//!
//! # Responsibility
//! - Load each referenced module once and resolve keyword implementations.
//! - Attach immutable runtime info to specs only after a whole request
//!   resolves.
//!
//! # Invariants
//! - A module is loaded at most once per binder, however many specs use it.
//! - Binding is all-or-nothing: on error no spec in the request is bound.
//! - Hook presence is read once from declared capability flags.

pub mod bind;
pub mod hooks;
pub mod loader;
pub mod static_module;

pub use bind::{bind, BindResult, Binder, BindingError, BoundForest, RuntimeInfo};
pub use hooks::{Hook, HookError, HookSet, ParseError};
pub use loader::{KeywordType, LoadedModule, ModuleCache, ModuleLoader};
pub use static_module::{KeywordTypeDef, StaticModule, StaticModuleLoader};
