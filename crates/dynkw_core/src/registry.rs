//! Per-module keyword registry.
//!
//! # Responsibility
//! - Register each module's discovered keyword forest independently.
//! - Index top-level keywords by case-insensitive name.
//! - Bind registered modules through a shared binder.
//!
//! # Invariants
//! - A module is registered at most once.
//! - Top-level keyword names are unique across all registered modules.
//! - A failing module never leaves any of its keywords registered, and never
//!   affects modules registered before or after it.

use crate::binder::{BindResult, Binder, BoundForest, ModuleLoader};
use crate::discovery::{discover_keywords, DiscoveryError};
use crate::metadata::ModuleMetadata;
use crate::model::spec::{KeywordSpec, ModuleRef};
use crate::repo::metadata_repo::{MetadataError, MetadataRepository};
use log::{error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// One registered module and its top-level keywords in name order.
#[derive(Debug, Clone)]
pub struct RegisteredModule {
    pub module: ModuleRef,
    pub keywords: Vec<Arc<KeywordSpec>>,
}

/// Outcome of registering one stored module.
#[derive(Debug)]
pub struct ModuleReport {
    pub module: ModuleRef,
    /// Number of top-level keywords registered.
    pub outcome: Result<usize, RegistryError>,
}

#[derive(Debug, Default)]
pub struct KeywordRegistry {
    modules: BTreeMap<Uuid, RegisteredModule>,
    index: BTreeMap<String, Arc<KeywordSpec>>,
}

impl KeywordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovers and registers the keywords of one module.
    ///
    /// Returns the number of top-level keywords registered.
    pub fn register_metadata(&mut self, metadata: &ModuleMetadata) -> Result<usize, RegistryError> {
        let module = &metadata.module;
        let outcome = self.try_register(metadata);
        match &outcome {
            Ok(count) => info!(
                "event=registry_register module=registry status=ok target={} keyword_count={}",
                module, count
            ),
            Err(err) => error!(
                "event=registry_register module=registry status=error target={} error={}",
                module, err
            ),
        }
        outcome
    }

    fn try_register(&mut self, metadata: &ModuleMetadata) -> Result<usize, RegistryError> {
        let module = &metadata.module;
        if self.modules.contains_key(&module.id) {
            return Err(RegistryError::DuplicateModule(module.to_string()));
        }

        let forest = discover_keywords(metadata)?;
        for name in forest.keys() {
            if let Some(existing) = self.index.get(&index_key(name)) {
                return Err(RegistryError::KeywordConflict {
                    keyword: name.clone(),
                    registered_by: existing.source_module.to_string(),
                    module: module.to_string(),
                });
            }
        }

        let keywords: Vec<Arc<KeywordSpec>> = forest.into_values().collect();
        for keyword in &keywords {
            self.index.insert(index_key(&keyword.name), Arc::clone(keyword));
        }
        let count = keywords.len();
        self.modules.insert(
            module.id,
            RegisteredModule {
                module: module.clone(),
                keywords,
            },
        );
        Ok(count)
    }

    /// Registers every module in a metadata store, one report per module.
    ///
    /// Only a failure to list the store aborts; per-module failures are
    /// reported and skipped.
    pub fn register_from_store(
        &mut self,
        repo: &impl MetadataRepository,
    ) -> Result<Vec<ModuleReport>, MetadataError> {
        let modules = repo.list_modules()?;
        let mut reports = Vec::with_capacity(modules.len());
        for module in modules {
            let outcome = repo
                .load_module(module.id)
                .map_err(RegistryError::from)
                .and_then(|metadata| self.register_metadata(&metadata));
            reports.push(ModuleReport { module, outcome });
        }
        Ok(reports)
    }

    /// Top-level keyword by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&Arc<KeywordSpec>> {
        self.index.get(&index_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&index_key(name))
    }

    /// All top-level keywords, ordered by name.
    pub fn keywords(&self) -> impl Iterator<Item = &Arc<KeywordSpec>> {
        self.index.values()
    }

    pub fn keywords_for_module(&self, id: Uuid) -> Option<&[Arc<KeywordSpec>]> {
        self.modules.get(&id).map(|entry| entry.keywords.as_slice())
    }

    pub fn modules(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.modules.values()
    }

    /// Unregisters a module and its keywords. Returns whether it was present.
    pub fn remove_module(&mut self, id: Uuid) -> bool {
        let Some(entry) = self.modules.remove(&id) else {
            return false;
        };
        for keyword in &entry.keywords {
            self.index.remove(&index_key(&keyword.name));
        }
        true
    }

    pub fn reset(&mut self) {
        self.modules.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Binds each registered module as its own request, so one stale module
    /// does not block the rest.
    pub fn bind_all(
        &self,
        binder: &mut Binder,
        loader: &dyn ModuleLoader,
    ) -> Vec<(ModuleRef, BindResult<BoundForest>)> {
        self.modules
            .values()
            .map(|entry| (entry.module.clone(), binder.bind(&entry.keywords, loader)))
            .collect()
    }
}

fn index_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[derive(Debug)]
pub enum RegistryError {
    Discovery(DiscoveryError),
    Metadata(MetadataError),
    DuplicateModule(String),
    KeywordConflict {
        keyword: String,
        registered_by: String,
        module: String,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery(err) => write!(f, "{err}"),
            Self::Metadata(err) => write!(f, "{err}"),
            Self::DuplicateModule(module) => write!(f, "module already registered: {module}"),
            Self::KeywordConflict {
                keyword,
                registered_by,
                module,
            } => write!(
                f,
                "keyword `{keyword}` from `{module}` is already registered by `{registered_by}`"
            ),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Discovery(err) => Some(err),
            Self::Metadata(err) => Some(err),
            Self::DuplicateModule(_) | Self::KeywordConflict { .. } => None,
        }
    }
}

impl From<DiscoveryError> for RegistryError {
    fn from(value: DiscoveryError) -> Self {
        Self::Discovery(value)
    }
}

impl From<MetadataError> for RegistryError {
    fn from(value: MetadataError) -> Self {
        Self::Metadata(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{KeywordRegistry, RegistryError};
    use crate::metadata::markers::keyword_attribute;
    use crate::metadata::{ModuleMetadata, TypeRecord};
    use crate::model::spec::{BodyMode, ModuleRef, UseMode};

    fn module_with(name: &str, keywords: &[&str]) -> ModuleMetadata {
        keywords.iter().fold(
            ModuleMetadata::new(ModuleRef::generate(name, "1.0.0")),
            |metadata, keyword| {
                metadata.with_type(
                    TypeRecord::class(*keyword)
                        .extends("Keyword")
                        .with_attribute(keyword_attribute(BodyMode::Command, UseMode::OptionalMany)),
                )
            },
        )
    }

    #[test]
    fn registers_and_removes_modules() {
        let mut registry = KeywordRegistry::new();
        let first = module_with("First", &["Alpha", "Beta"]);
        assert_eq!(registry.register_metadata(&first).expect("first module"), 2);
        assert!(registry.contains("alpha"));
        assert_eq!(registry.module_count(), 1);

        assert!(registry.remove_module(first.module.id));
        assert!(registry.is_empty());
        assert!(!registry.remove_module(first.module.id));
    }

    #[test]
    fn rejects_duplicate_module_and_cross_module_name_conflict() {
        let mut registry = KeywordRegistry::new();
        let first = module_with("First", &["Alpha"]);
        registry.register_metadata(&first).expect("first module");

        let again = registry
            .register_metadata(&first)
            .expect_err("same module twice");
        assert!(matches!(again, RegistryError::DuplicateModule(_)));

        let clash = module_with("Second", &["ALPHA", "Gamma"]);
        let err = registry
            .register_metadata(&clash)
            .expect_err("name clash across modules");
        assert!(matches!(err, RegistryError::KeywordConflict { .. }));
        assert!(!registry.contains("Gamma"));
        assert_eq!(registry.len(), 1);
    }
}
