//! Executable-side contracts: keyword types, loaded modules and loaders.

use crate::binder::hooks::{HookError, HookSet, ParseError};
use crate::binder::BindingError;
use crate::compile::ast::KeywordInvocation;
use crate::model::spec::{KeywordSpec, ModuleRef};
use crate::model::value::Value;
use crate::runtime::instance::KeywordInstance;
use crate::runtime::scope::ScopeFrame;
use log::{error, info};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Implementation of one keyword inside a loaded module.
///
/// `hooks()` declares which hook methods carry behavior; the engine only
/// calls hooks listed there and never probes the others.
pub trait KeywordType: Send + Sync {
    fn type_name(&self) -> &str;

    /// Resolves a keyword type declared inside this one.
    fn nested_type(&self, _name: &str) -> Option<Arc<dyn KeywordType>> {
        None
    }

    fn hooks(&self) -> HookSet {
        HookSet::empty()
    }

    fn pre_parse(&self, _keyword: &KeywordSpec) -> Result<Vec<ParseError>, HookError> {
        Ok(Vec::new())
    }

    fn post_parse(&self, _node: &KeywordInvocation) -> Result<Vec<ParseError>, HookError> {
        Ok(Vec::new())
    }

    fn semantic_check(&self, _node: &KeywordInvocation) -> Result<Vec<ParseError>, HookError> {
        Ok(Vec::new())
    }

    /// Runs when an invocation opens its scope. `ancestors` is the scope
    /// stack before this invocation was pushed, outermost first.
    fn enter_scope(
        &self,
        _instance: &KeywordInstance,
        _ancestors: &[ScopeFrame],
    ) -> Result<Value, HookError> {
        Ok(Value::Null)
    }

    /// Runs when an invocation closes its scope, after all of its children.
    fn leave_scope(
        &self,
        _frame: &ScopeFrame,
        _ancestors: &[ScopeFrame],
        _child_results: &[Option<Value>],
    ) -> Result<Value, HookError> {
        Ok(Value::Null)
    }
}

/// Executable representation of a module.
pub trait LoadedModule: Send + Sync {
    fn module(&self) -> &ModuleRef;

    /// Resolves a top-level keyword type by name.
    fn resolve_type(&self, name: &str) -> Option<Arc<dyn KeywordType>>;
}

/// Turns a module reference into its executable representation.
pub trait ModuleLoader {
    fn load(&self, module: &ModuleRef) -> Result<Arc<dyn LoadedModule>, BindingError>;
}

/// Memoizes loaded modules by identity so each is loaded at most once.
#[derive(Default)]
pub struct ModuleCache {
    loaded: BTreeMap<Uuid, Arc<dyn LoadedModule>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &mut self,
        loader: &dyn ModuleLoader,
        module: &ModuleRef,
    ) -> Result<Arc<dyn LoadedModule>, BindingError> {
        if let Some(loaded) = self.loaded.get(&module.id) {
            return Ok(Arc::clone(loaded));
        }

        let started_at = Instant::now();
        match loader.load(module) {
            Ok(loaded) => {
                info!(
                    "event=module_load module=binder status=ok target={} duration_ms={}",
                    module,
                    started_at.elapsed().as_millis()
                );
                self.loaded.insert(module.id, Arc::clone(&loaded));
                Ok(loaded)
            }
            Err(err) => {
                error!(
                    "event=module_load module=binder status=error target={} duration_ms={} error={}",
                    module,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn contains(&self, module: &ModuleRef) -> bool {
        self.loaded.contains_key(&module.id)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}
