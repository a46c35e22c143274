//! Dynamic keyword engine.
//!
//! Modules publish keyword declarations as metadata; this crate discovers
//! them without running module code, binds them to module implementations,
//! compiles keyword invocations into fragments and executes those fragments
//! against an explicit scope context.

pub mod binder;
pub mod compile;
pub mod db;
pub mod discovery;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod registry;
pub mod repo;
pub mod runtime;

pub use binder::{
    bind, BindResult, Binder, BindingError, BoundForest, Hook, HookError, HookSet, KeywordType,
    KeywordTypeDef, LoadedModule, ModuleLoader, ParseError, RuntimeInfo, StaticModule,
    StaticModuleLoader,
};
pub use compile::{
    CompileError, CompileResult, Expr, Fragment, InvocationError, InvocationErrorKind,
    KeywordCompiler, KeywordInvocation, SourceSpan, Statement,
};
pub use db::{open_db, open_db_in_memory, write_module_metadata, DbError, DbResult};
pub use discovery::{discover_keywords, DiscoveryError, DiscoveryResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::spec::{BodyMode, KeywordSpec, ModuleRef, UseMode};
pub use model::value::{TypeConstraint, Value};
pub use registry::{KeywordRegistry, ModuleReport, RegistryError};
pub use repo::metadata_repo::{
    MetadataError, MetadataRepository, MetadataResult, SqliteMetadataRepository,
};
pub use runtime::{execute, ExecutionContext, ExecutionError, KeywordInstance, ScopeContext, ScopeFrame};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
