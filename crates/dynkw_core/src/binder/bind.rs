//! Type binder: resolves spec trees against loaded modules.

use crate::binder::hooks::{Hook, HookSet};
use crate::binder::loader::{KeywordType, ModuleCache, ModuleLoader};
use crate::model::spec::KeywordSpec;
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub type BindResult<T> = Result<T, BindingError>;

/// Runtime half of a bound keyword, shared by all of its invocations.
pub struct RuntimeInfo {
    implementation: Arc<dyn KeywordType>,
    hooks: HookSet,
}

impl RuntimeInfo {
    fn new(implementation: Arc<dyn KeywordType>) -> Self {
        let hooks = implementation.hooks();
        Self {
            implementation,
            hooks,
        }
    }

    pub fn implementation(&self) -> &Arc<dyn KeywordType> {
        &self.implementation
    }

    pub fn hooks(&self) -> HookSet {
        self.hooks
    }

    pub fn has_enter_hook(&self) -> bool {
        self.hooks.contains(Hook::EnterScope)
    }

    pub fn has_leave_hook(&self) -> bool {
        self.hooks.contains(Hook::LeaveScope)
    }

    /// True when invocations need the scope engine at all.
    pub fn uses_scope(&self) -> bool {
        self.has_enter_hook() || self.has_leave_hook()
    }
}

impl Debug for RuntimeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeInfo")
            .field("type_name", &self.implementation.type_name())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Binding failures; each aborts the whole request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    ModuleLoad { module: String, message: String },
    /// A top-level keyword has no implementing type in its module.
    MissingType { module: String, type_name: String },
    /// A nested keyword seen at discovery is gone from its parent type.
    MissingNestedType { parent: String, type_name: String },
    /// A nested spec was passed where a top-level spec was expected.
    NestedSpecAtTopLevel(String),
}

impl Display for BindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModuleLoad { module, message } => {
                write!(f, "failed to load module `{module}`: {message}")
            }
            Self::MissingType { module, type_name } => {
                write!(f, "module `{module}` has no keyword type `{type_name}`")
            }
            Self::MissingNestedType { parent, type_name } => write!(
                f,
                "keyword type `{parent}` no longer declares nested type `{type_name}`; module is stale"
            ),
            Self::NestedSpecAtTopLevel(name) => {
                write!(f, "nested keyword `{name}` cannot be bound on its own")
            }
        }
    }
}

impl Error for BindingError {}

/// Specs of one bind request, all carrying runtime info.
#[derive(Debug, Clone)]
pub struct BoundForest {
    pub keywords: Vec<Arc<KeywordSpec>>,
}

impl BoundForest {
    pub fn get(&self, name: &str) -> Option<&Arc<KeywordSpec>> {
        self.keywords
            .iter()
            .find(|keyword| keyword.name.eq_ignore_ascii_case(name))
    }
}

/// Resolved-but-uncommitted binding of one spec subtree.
struct PendingBinding {
    spec: Arc<KeywordSpec>,
    implementation: Arc<dyn KeywordType>,
    children: Vec<PendingBinding>,
}

/// Binder with a module cache that persists across requests.
#[derive(Default)]
pub struct Binder {
    cache: ModuleCache,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every spec in `forest`, or none of them.
    pub fn bind(
        &mut self,
        forest: &[Arc<KeywordSpec>],
        loader: &dyn ModuleLoader,
    ) -> BindResult<BoundForest> {
        let started_at = Instant::now();
        match self.resolve_forest(forest, loader) {
            Ok(pending) => {
                let mut committed = 0;
                for binding in pending {
                    committed += commit(binding);
                }
                info!(
                    "event=keyword_bind module=binder status=ok keyword_count={} committed={} duration_ms={}",
                    forest.len(),
                    committed,
                    started_at.elapsed().as_millis()
                );
                Ok(BoundForest {
                    keywords: forest.to_vec(),
                })
            }
            Err(err) => {
                error!(
                    "event=keyword_bind module=binder status=error keyword_count={} duration_ms={} error={}",
                    forest.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn loaded_module_count(&self) -> usize {
        self.cache.len()
    }

    fn resolve_forest(
        &mut self,
        forest: &[Arc<KeywordSpec>],
        loader: &dyn ModuleLoader,
    ) -> BindResult<Vec<PendingBinding>> {
        let mut by_module: BTreeMap<Uuid, Vec<&Arc<KeywordSpec>>> = BTreeMap::new();
        for spec in forest {
            if spec.is_nested {
                return Err(BindingError::NestedSpecAtTopLevel(spec.name.clone()));
            }
            by_module.entry(spec.source_module.id).or_default().push(spec);
        }

        let mut pending = Vec::with_capacity(forest.len());
        for specs in by_module.values() {
            let module_ref = &specs[0].source_module;
            let module = self.cache.get_or_load(loader, module_ref)?;
            for spec in specs {
                let implementation =
                    module
                        .resolve_type(&spec.name)
                        .ok_or_else(|| BindingError::MissingType {
                            module: module_ref.to_string(),
                            type_name: spec.name.clone(),
                        })?;
                pending.push(resolve_tree(spec, implementation)?);
            }
        }
        Ok(pending)
    }
}

/// Binds `forest` with a fresh module cache.
pub fn bind(forest: &[Arc<KeywordSpec>], loader: &dyn ModuleLoader) -> BindResult<BoundForest> {
    Binder::new().bind(forest, loader)
}

fn resolve_tree(
    spec: &Arc<KeywordSpec>,
    implementation: Arc<dyn KeywordType>,
) -> BindResult<PendingBinding> {
    let mut children = Vec::with_capacity(spec.children.len());
    for child in &spec.children {
        let nested = implementation.nested_type(&child.name).ok_or_else(|| {
            BindingError::MissingNestedType {
                parent: spec.name.clone(),
                type_name: child.name.clone(),
            }
        })?;
        children.push(resolve_tree(child, nested)?);
    }
    Ok(PendingBinding {
        spec: Arc::clone(spec),
        implementation,
        children,
    })
}

/// Attaches runtime info children-first; returns the number of new bindings.
fn commit(binding: PendingBinding) -> usize {
    let mut committed = 0;
    for child in binding.children {
        committed += commit(child);
    }
    if binding
        .spec
        .attach_runtime(RuntimeInfo::new(binding.implementation))
    {
        committed += 1;
    } else {
        debug!(
            "event=keyword_bind module=binder status=skip keyword={} reason=already_bound",
            binding.spec.name
        );
    }
    committed
}
