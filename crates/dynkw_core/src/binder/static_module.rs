//! In-process keyword modules declared in Rust.
//!
//! A `KeywordTypeDef` is the registration manifest of one keyword type: its
//! name, nested types and whichever hooks it supplies. Hook flags are derived
//! from the closures actually registered, once, at build time.

use crate::binder::hooks::{Hook, HookError, HookSet, ParseError};
use crate::binder::loader::{KeywordType, LoadedModule, ModuleLoader};
use crate::binder::BindingError;
use crate::compile::ast::KeywordInvocation;
use crate::model::spec::{KeywordSpec, ModuleRef};
use crate::model::value::Value;
use crate::runtime::instance::KeywordInstance;
use crate::runtime::scope::ScopeFrame;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

type EnterFn = Arc<dyn Fn(&KeywordInstance, &[ScopeFrame]) -> Result<Value, HookError> + Send + Sync>;
type LeaveFn = Arc<
    dyn Fn(&ScopeFrame, &[ScopeFrame], &[Option<Value>]) -> Result<Value, HookError> + Send + Sync,
>;
type SpecCheckFn = Arc<dyn Fn(&KeywordSpec) -> Result<Vec<ParseError>, HookError> + Send + Sync>;
type NodeCheckFn =
    Arc<dyn Fn(&KeywordInvocation) -> Result<Vec<ParseError>, HookError> + Send + Sync>;

/// Declarative keyword type built from closures.
#[derive(Clone, Default)]
pub struct KeywordTypeDef {
    name: String,
    /// Keyed by lowercase name.
    nested: BTreeMap<String, Arc<KeywordTypeDef>>,
    enter: Option<EnterFn>,
    leave: Option<LeaveFn>,
    pre_parse: Option<SpecCheckFn>,
    post_parse: Option<NodeCheckFn>,
    semantic_check: Option<NodeCheckFn>,
}

impl KeywordTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_nested(mut self, nested: KeywordTypeDef) -> Self {
        self.nested.insert(type_key(&nested.name), Arc::new(nested));
        self
    }

    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&KeywordInstance, &[ScopeFrame]) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.enter = Some(Arc::new(hook));
        self
    }

    pub fn on_leave<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ScopeFrame, &[ScopeFrame], &[Option<Value>]) -> Result<Value, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.leave = Some(Arc::new(hook));
        self
    }

    pub fn on_pre_parse<F>(mut self, hook: F) -> Self
    where
        F: Fn(&KeywordSpec) -> Result<Vec<ParseError>, HookError> + Send + Sync + 'static,
    {
        self.pre_parse = Some(Arc::new(hook));
        self
    }

    pub fn on_post_parse<F>(mut self, hook: F) -> Self
    where
        F: Fn(&KeywordInvocation) -> Result<Vec<ParseError>, HookError> + Send + Sync + 'static,
    {
        self.post_parse = Some(Arc::new(hook));
        self
    }

    pub fn on_semantic_check<F>(mut self, hook: F) -> Self
    where
        F: Fn(&KeywordInvocation) -> Result<Vec<ParseError>, HookError> + Send + Sync + 'static,
    {
        self.semantic_check = Some(Arc::new(hook));
        self
    }
}

impl KeywordType for KeywordTypeDef {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn nested_type(&self, name: &str) -> Option<Arc<dyn KeywordType>> {
        self.nested
            .get(&type_key(name))
            .map(|nested| Arc::clone(nested) as Arc<dyn KeywordType>)
    }

    fn hooks(&self) -> HookSet {
        let mut set = HookSet::empty();
        if self.pre_parse.is_some() {
            set = set.with(Hook::PreParse);
        }
        if self.post_parse.is_some() {
            set = set.with(Hook::PostParse);
        }
        if self.semantic_check.is_some() {
            set = set.with(Hook::SemanticCheck);
        }
        if self.enter.is_some() {
            set = set.with(Hook::EnterScope);
        }
        if self.leave.is_some() {
            set = set.with(Hook::LeaveScope);
        }
        set
    }

    fn pre_parse(&self, keyword: &KeywordSpec) -> Result<Vec<ParseError>, HookError> {
        match &self.pre_parse {
            Some(hook) => hook(keyword),
            None => Ok(Vec::new()),
        }
    }

    fn post_parse(&self, node: &KeywordInvocation) -> Result<Vec<ParseError>, HookError> {
        match &self.post_parse {
            Some(hook) => hook(node),
            None => Ok(Vec::new()),
        }
    }

    fn semantic_check(&self, node: &KeywordInvocation) -> Result<Vec<ParseError>, HookError> {
        match &self.semantic_check {
            Some(hook) => hook(node),
            None => Ok(Vec::new()),
        }
    }

    fn enter_scope(
        &self,
        instance: &KeywordInstance,
        ancestors: &[ScopeFrame],
    ) -> Result<Value, HookError> {
        match &self.enter {
            Some(hook) => hook(instance, ancestors),
            None => Ok(Value::Null),
        }
    }

    fn leave_scope(
        &self,
        frame: &ScopeFrame,
        ancestors: &[ScopeFrame],
        child_results: &[Option<Value>],
    ) -> Result<Value, HookError> {
        match &self.leave {
            Some(hook) => hook(frame, ancestors, child_results),
            None => Ok(Value::Null),
        }
    }
}

/// Module whose keyword types are registered in-process.
pub struct StaticModule {
    module: ModuleRef,
    /// Keyed by lowercase name.
    types: BTreeMap<String, Arc<dyn KeywordType>>,
}

impl StaticModule {
    pub fn new(module: ModuleRef) -> Self {
        Self {
            module,
            types: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, definition: KeywordTypeDef) -> Self {
        self.register(Arc::new(definition));
        self
    }

    pub fn register(&mut self, keyword_type: Arc<dyn KeywordType>) {
        self.types
            .insert(type_key(keyword_type.type_name()), keyword_type);
    }
}

impl LoadedModule for StaticModule {
    fn module(&self) -> &ModuleRef {
        &self.module
    }

    fn resolve_type(&self, name: &str) -> Option<Arc<dyn KeywordType>> {
        self.types.get(&type_key(name)).cloned()
    }
}

fn type_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Loader over a fixed set of static modules; counts load requests.
#[derive(Default)]
pub struct StaticModuleLoader {
    modules: BTreeMap<Uuid, Arc<StaticModule>>,
    loads: AtomicUsize,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: StaticModule) -> Self {
        self.modules.insert(module.module.id, Arc::new(module));
        self
    }

    /// Number of `load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, module: &ModuleRef) -> Result<Arc<dyn LoadedModule>, BindingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.modules
            .get(&module.id)
            .map(|loaded| Arc::clone(loaded) as Arc<dyn LoadedModule>)
            .ok_or_else(|| BindingError::ModuleLoad {
                module: module.to_string(),
                message: "module is not registered with this loader".to_string(),
            })
    }
}
