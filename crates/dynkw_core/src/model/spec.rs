//! Keyword specification model.
//!
//! # Responsibility
//! - Describe discovered keywords, their parameters, properties and nested
//!   keywords as plain data.
//! - Enforce declaration-level invariants before a spec is registered.
//!
//! # Invariants
//! - A non-nested keyword uses `UseMode::OptionalMany`.
//! - Sibling keyword names are unique (case-insensitive).
//! - Only non-command keywords may declare nested keywords.
//! - Within one parameter set no two parameters share a position.
//! - Runtime info is attached at most once, after binding succeeds.

use crate::binder::RuntimeInfo;
use crate::discovery::DiscoveryError;
use crate::model::value::TypeConstraint;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Parameter-set name meaning "member of every parameter set".
pub const ALL_PARAMETER_SETS: &str = "__AllParameterSets";

static KEYWORD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid keyword name regex"));

/// Syntactic shape following a keyword name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BodyMode {
    /// Arguments only, no body.
    Command,
    /// `Keyword ... @{ Key = Value }`-style body assigning properties.
    Hashtable,
    /// `Keyword ... { statements }` body that may contain nested keywords.
    ScriptBlock,
}

impl BodyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "Command",
            Self::Hashtable => "Hashtable",
            Self::ScriptBlock => "ScriptBlock",
        }
    }

    /// Parses the metadata spelling (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Command, Self::Hashtable, Self::ScriptBlock]
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl Display for BodyMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinality of a keyword within one enclosing scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UseMode {
    Optional,
    OptionalMany,
    Required,
    RequiredMany,
}

impl UseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optional => "Optional",
            Self::OptionalMany => "OptionalMany",
            Self::Required => "Required",
            Self::RequiredMany => "RequiredMany",
        }
    }

    /// Parses the metadata spelling (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::Optional,
            Self::OptionalMany,
            Self::Required,
            Self::RequiredMany,
        ]
        .into_iter()
        .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn is_required(self) -> bool {
        matches!(self, Self::Required | Self::RequiredMany)
    }

    pub fn allows_many(self) -> bool {
        matches!(self, Self::OptionalMany | Self::RequiredMany)
    }
}

impl Display for UseMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the module a keyword was discovered in.
///
/// This is an identifier, not an owner: specs never keep a module loaded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModuleRef {
    pub id: Uuid,
    pub name: String,
    pub version: String,
}

impl ModuleRef {
    pub fn new(id: Uuid, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
        }
    }

    /// Reference with a fresh random identity, for a module written the
    /// first time.
    pub fn generate(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), name, version)
    }
}

impl Display for ModuleRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Position and mandatory flag of a parameter within one parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterSetData {
    /// `None` when the parameter is not positional in this set.
    pub position: Option<u32>,
    pub mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub type_name: String,
    /// Populated only when `type_name` resolved to a locally declared enum.
    pub enum_values: BTreeSet<String>,
    /// Keyed by parameter-set name; `ALL_PARAMETER_SETS` applies to every set.
    pub parameter_sets: BTreeMap<String, ParameterSetData>,
}

impl ParameterSpec {
    /// Returns this parameter's data for `parameter_set`, falling back to
    /// its all-sets declaration.
    pub fn in_set(&self, parameter_set: &str) -> Option<&ParameterSetData> {
        self.parameter_sets
            .get(parameter_set)
            .or_else(|| self.parameter_sets.get(ALL_PARAMETER_SETS))
    }

    pub fn type_constraint(&self) -> TypeConstraint {
        TypeConstraint::from_type_name(&self.type_name, &self.enum_values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySpec {
    pub name: String,
    pub type_constraint: String,
    pub mandatory: bool,
    pub enum_values: BTreeSet<String>,
}

impl PropertySpec {
    pub fn constraint(&self) -> TypeConstraint {
        TypeConstraint::from_type_name(&self.type_constraint, &self.enum_values)
    }
}

/// Static description of one keyword, optionally annotated with runtime info
/// once its module has been bound.
#[derive(Debug, Serialize)]
pub struct KeywordSpec {
    pub name: String,
    pub body_mode: BodyMode,
    pub use_mode: UseMode,
    pub default_parameter_set: Option<String>,
    pub parameters: Vec<ParameterSpec>,
    pub properties: Vec<PropertySpec>,
    pub children: Vec<Arc<KeywordSpec>>,
    pub is_nested: bool,
    pub source_module: ModuleRef,
    #[serde(skip)]
    runtime: OnceCell<RuntimeInfo>,
}

impl KeywordSpec {
    pub fn new(
        name: impl Into<String>,
        body_mode: BodyMode,
        use_mode: UseMode,
        source_module: ModuleRef,
    ) -> Self {
        Self {
            name: name.into(),
            body_mode,
            use_mode,
            default_parameter_set: None,
            parameters: Vec::new(),
            properties: Vec::new(),
            children: Vec::new(),
            is_nested: false,
            source_module,
            runtime: OnceCell::new(),
        }
    }

    /// Checks declaration invariants of this spec and its direct children.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if !KEYWORD_NAME_RE.is_match(&self.name) {
            return Err(DiscoveryError::InvalidKeywordName(self.name.clone()));
        }
        if !self.is_nested && self.use_mode != UseMode::OptionalMany {
            return Err(DiscoveryError::InvalidUseMode {
                keyword: self.name.clone(),
                use_mode: self.use_mode,
            });
        }
        if self.body_mode == BodyMode::Command {
            if let Some(child) = self.children.first() {
                return Err(DiscoveryError::NestedUnderCommand {
                    parent: self.name.clone(),
                    child: child.name.clone(),
                });
            }
        }
        validate_siblings(&self.children, &self.name)?;
        self.validate_positions()
    }

    /// All-sets parameters take part in every named set, so each named set
    /// is checked together with them.
    fn validate_positions(&self) -> Result<(), DiscoveryError> {
        let mut groups = self.parameter_set_names();
        groups.push(ALL_PARAMETER_SETS);
        for set_name in groups {
            let mut seen = BTreeSet::new();
            for parameter in &self.parameters {
                let Some(position) = parameter.in_set(set_name).and_then(|data| data.position)
                else {
                    continue;
                };
                if !seen.insert(position) {
                    return Err(DiscoveryError::DuplicatePosition {
                        keyword: self.name.clone(),
                        parameter_set: set_name.to_string(),
                        position,
                    });
                }
            }
        }
        Ok(())
    }

    /// Runtime info attached by the binder, if this spec is bound.
    pub fn runtime(&self) -> Option<&RuntimeInfo> {
        self.runtime.get()
    }

    pub fn is_bound(&self) -> bool {
        self.runtime.get().is_some()
    }

    /// Attaches runtime info once. Returns false when already bound.
    pub(crate) fn attach_runtime(&self, info: RuntimeInfo) -> bool {
        self.runtime.set(info).is_ok()
    }

    pub fn child(&self, name: &str) -> Option<&Arc<KeywordSpec>> {
        self.children
            .iter()
            .find(|child| child.name.eq_ignore_ascii_case(name))
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }

    /// Explicitly declared parameter-set names in first-declaration order.
    pub fn parameter_set_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for parameter in &self.parameters {
            for set_name in parameter.parameter_sets.keys() {
                if set_name != ALL_PARAMETER_SETS && !names.contains(&set_name.as_str()) {
                    names.push(set_name.as_str());
                }
            }
        }
        names
    }
}

/// Rejects two specs in one sibling group sharing a name.
pub fn validate_siblings(siblings: &[Arc<KeywordSpec>], scope: &str) -> Result<(), DiscoveryError> {
    let mut names = BTreeSet::new();
    for sibling in siblings {
        if !names.insert(sibling.name.to_ascii_lowercase()) {
            return Err(DiscoveryError::DuplicateKeyword {
                name: sibling.name.clone(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        BodyMode, KeywordSpec, ModuleRef, ParameterSetData, ParameterSpec, UseMode,
        ALL_PARAMETER_SETS,
    };
    use crate::discovery::DiscoveryError;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;
    use uuid::Uuid;

    fn module() -> ModuleRef {
        ModuleRef::new(Uuid::nil(), "Sample", "1.0.0")
    }

    fn nested(name: &str) -> Arc<KeywordSpec> {
        let mut spec = KeywordSpec::new(name, BodyMode::Command, UseMode::Optional, module());
        spec.is_nested = true;
        Arc::new(spec)
    }

    fn positional(name: &str, set: &str, position: u32) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            type_name: "string".to_string(),
            enum_values: BTreeSet::new(),
            parameter_sets: BTreeMap::from([(
                set.to_string(),
                ParameterSetData {
                    position: Some(position),
                    mandatory: false,
                },
            )]),
        }
    }

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!(BodyMode::parse("scriptblock"), Some(BodyMode::ScriptBlock));
        assert_eq!(UseMode::parse(" RequiredMany "), Some(UseMode::RequiredMany));
        assert_eq!(BodyMode::parse("Block"), None);
    }

    #[test]
    fn rejects_global_keyword_with_restricted_use_mode() {
        let spec = KeywordSpec::new("Widget", BodyMode::Command, UseMode::Required, module());
        let err = spec.validate().expect_err("top-level Required must fail");
        assert!(matches!(err, DiscoveryError::InvalidUseMode { .. }));
    }

    #[test]
    fn rejects_children_under_command_body() {
        let mut spec =
            KeywordSpec::new("Widget", BodyMode::Command, UseMode::OptionalMany, module());
        spec.children.push(nested("Part"));
        let err = spec.validate().expect_err("command parent must fail");
        assert!(matches!(err, DiscoveryError::NestedUnderCommand { .. }));
    }

    #[test]
    fn rejects_case_insensitive_duplicate_children() {
        let mut spec =
            KeywordSpec::new("Widget", BodyMode::ScriptBlock, UseMode::OptionalMany, module());
        spec.children.push(nested("Part"));
        spec.children.push(nested("PART"));
        let err = spec.validate().expect_err("duplicate child must fail");
        assert!(matches!(err, DiscoveryError::DuplicateKeyword { .. }));
    }

    #[test]
    fn rejects_duplicate_positions_within_one_set() {
        let mut spec =
            KeywordSpec::new("Widget", BodyMode::Command, UseMode::OptionalMany, module());
        spec.parameters.push(positional("Name", ALL_PARAMETER_SETS, 0));
        spec.parameters.push(positional("Size", ALL_PARAMETER_SETS, 0));
        let err = spec.validate().expect_err("shared position must fail");
        assert!(matches!(err, DiscoveryError::DuplicatePosition { position: 0, .. }));

        spec.parameters[0] = positional("Name", "ByName", 0);
        spec.parameters[1] = positional("Size", "BySize", 0);
        spec.validate().expect("same position in different named sets is allowed");
    }

    #[test]
    fn all_sets_parameters_collide_with_every_named_set() {
        let mut spec =
            KeywordSpec::new("Service", BodyMode::Command, UseMode::OptionalMany, module());
        spec.parameters.push(positional("Name", ALL_PARAMETER_SETS, 0));
        spec.parameters.push(positional("Id", "ById", 0));
        let err = spec.validate().expect_err("all-sets position is shared by ById");
        assert_eq!(
            err,
            DiscoveryError::DuplicatePosition {
                keyword: "Service".to_string(),
                parameter_set: "ById".to_string(),
                position: 0,
            }
        );

        spec.parameters[1] = positional("Id", "ById", 1);
        spec.validate().expect("distinct positions across the merged set");
    }

    #[test]
    fn rejects_non_identifier_names() {
        let spec = KeywordSpec::new("My Widget", BodyMode::Command, UseMode::OptionalMany, module());
        assert!(matches!(
            spec.validate(),
            Err(DiscoveryError::InvalidKeywordName(_))
        ));
    }

    #[test]
    fn parameter_falls_back_to_all_sets_declaration() {
        let parameter = positional("Name", ALL_PARAMETER_SETS, 1);
        assert_eq!(
            parameter.in_set("ByName").and_then(|data| data.position),
            Some(1)
        );
    }
}
