//! Metadata scanner producing keyword specs.
//!
//! The scanner walks type records level by level. Two stacks mirror lexical
//! nesting: enum tables (so enum-typed members resolve without loading code)
//! and sibling-name sets (so duplicate names are caught per scope).

use crate::discovery::{DiscoveryError, DiscoveryResult};
use crate::metadata::markers::{
    ARG_BODY, ARG_DEFAULT_PARAMETER_SET, ARG_MANDATORY, ARG_PARAMETER_SET, ARG_POSITION, ARG_USE,
    DEFAULT_BODY_MODE, DEFAULT_USE_MODE, ENUM_BACKING_FIELD, KEYWORD_ATTRIBUTE, KEYWORD_BASE_TYPE,
    NOT_POSITIONAL, PARAMETER_ATTRIBUTE, PROPERTY_ATTRIBUTE,
};
use crate::metadata::signature::{decode_type_name, simple_name};
use crate::metadata::{AttributeRecord, AttributeValue, MemberRecord, ModuleMetadata, TypeKind, TypeRecord};
use crate::model::spec::{
    BodyMode, KeywordSpec, ModuleRef, ParameterSetData, ParameterSpec, PropertySpec, UseMode,
    ALL_PARAMETER_SETS,
};
use log::{error, info};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

type EnumTable = BTreeMap<String, BTreeSet<String>>;

/// Discovers every top-level keyword declared in `metadata`.
///
/// Returns a mapping from keyword name to spec. Any invariant violation
/// anywhere in the module aborts discovery and returns no specs.
pub fn discover_keywords(
    metadata: &ModuleMetadata,
) -> DiscoveryResult<BTreeMap<String, Arc<KeywordSpec>>> {
    let started_at = Instant::now();
    let mut scanner = Scanner::new(&metadata.module);

    match scanner.scan_module(&metadata.types) {
        Ok(specs) => {
            info!(
                "event=module_discovery module=discovery status=ok target={} keyword_count={} duration_ms={}",
                metadata.module,
                specs.len(),
                started_at.elapsed().as_millis()
            );
            Ok(specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect())
        }
        Err(err) => {
            error!(
                "event=module_discovery module=discovery status=error target={} duration_ms={} error={}",
                metadata.module,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

struct Scanner<'a> {
    module: &'a ModuleRef,
    enum_tables: Vec<EnumTable>,
    sibling_names: Vec<BTreeSet<String>>,
}

impl<'a> Scanner<'a> {
    fn new(module: &'a ModuleRef) -> Self {
        Self {
            module,
            enum_tables: Vec::new(),
            sibling_names: Vec::new(),
        }
    }

    fn scan_module(&mut self, types: &[TypeRecord]) -> DiscoveryResult<Vec<Arc<KeywordSpec>>> {
        self.enum_tables.push(collect_enums(types));
        self.sibling_names.push(BTreeSet::new());

        // Keyword types nested inside non-keyword types are never reached:
        // only module-root types and keyword children are visited.
        let scope = self.module.name.clone();
        let mut specs = Vec::new();
        for (record, marker) in types.iter().filter_map(keyword_marker) {
            specs.push(self.scan_keyword(record, marker, false, &scope)?);
        }

        self.sibling_names.pop();
        self.enum_tables.pop();
        Ok(specs)
    }

    fn scan_keyword(
        &mut self,
        record: &TypeRecord,
        marker: &AttributeRecord,
        is_nested: bool,
        scope: &str,
    ) -> DiscoveryResult<Arc<KeywordSpec>> {
        let body_mode = read_body_mode(&record.name, marker)?;
        let use_mode = read_use_mode(&record.name, marker)?;
        let default_parameter_set =
            read_string(&record.name, marker, ARG_DEFAULT_PARAMETER_SET)?.filter(|name| !name.is_empty());

        if !is_nested && use_mode != UseMode::OptionalMany {
            return Err(DiscoveryError::InvalidUseMode {
                keyword: record.name.clone(),
                use_mode,
            });
        }

        // Enums declared inside this keyword are visible to its own members
        // and to everything nested below it.
        self.enum_tables.push(collect_enums(&record.nested));

        let mut parameters = Vec::new();
        let mut properties = Vec::new();
        for member in record.members.iter().filter(|member| member.settable) {
            if let Some(parameter) = self.extract_parameter(&record.name, member)? {
                parameters.push(parameter);
            } else if let Some(property) = self.extract_property(&record.name, member)? {
                properties.push(property);
            }
        }

        self.sibling_names.push(BTreeSet::new());
        let mut children = Vec::new();
        for (nested, nested_marker) in record.nested.iter().filter_map(keyword_marker) {
            if body_mode == BodyMode::Command {
                return Err(DiscoveryError::NestedUnderCommand {
                    parent: record.name.clone(),
                    child: nested.name.clone(),
                });
            }
            children.push(self.scan_keyword(nested, nested_marker, true, &record.name)?);
        }
        self.sibling_names.pop();
        self.enum_tables.pop();

        let mut spec = KeywordSpec::new(record.name.clone(), body_mode, use_mode, self.module.clone());
        spec.default_parameter_set = default_parameter_set;
        spec.parameters = parameters;
        spec.properties = properties;
        spec.children = children;
        spec.is_nested = is_nested;
        spec.validate()?;

        let registered = self
            .sibling_names
            .last_mut()
            .is_some_and(|siblings| siblings.insert(spec.name.to_ascii_lowercase()));
        if !registered {
            return Err(DiscoveryError::DuplicateKeyword {
                name: spec.name.clone(),
                scope: scope.to_string(),
            });
        }

        Ok(Arc::new(spec))
    }

    fn extract_parameter(
        &self,
        keyword: &str,
        member: &MemberRecord,
    ) -> DiscoveryResult<Option<ParameterSpec>> {
        let markers: Vec<&AttributeRecord> = member
            .attributes
            .iter()
            .filter(|attribute| attribute.is(PARAMETER_ATTRIBUTE))
            .collect();
        if markers.is_empty() {
            return Ok(None);
        }

        let owner = format!("{keyword}.{}", member.name);
        let mut parameter_sets = BTreeMap::new();
        for marker in markers {
            let mandatory = read_bool(&owner, marker, ARG_MANDATORY)?.unwrap_or(false);
            let position = read_position(&owner, marker)?;
            let set_name = read_string(&owner, marker, ARG_PARAMETER_SET)?
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| ALL_PARAMETER_SETS.to_string());
            parameter_sets.insert(set_name, ParameterSetData { position, mandatory });
        }

        let type_name = decode_type_name(&member.type_name);
        Ok(Some(ParameterSpec {
            name: member.name.clone(),
            enum_values: self.resolve_enum(&type_name),
            type_name,
            parameter_sets,
        }))
    }

    fn extract_property(
        &self,
        keyword: &str,
        member: &MemberRecord,
    ) -> DiscoveryResult<Option<PropertySpec>> {
        let Some(marker) = member
            .attributes
            .iter()
            .find(|attribute| attribute.is(PROPERTY_ATTRIBUTE))
        else {
            return Ok(None);
        };

        let owner = format!("{keyword}.{}", member.name);
        let type_name = decode_type_name(&member.type_name);
        Ok(Some(PropertySpec {
            name: member.name.clone(),
            mandatory: read_bool(&owner, marker, ARG_MANDATORY)?.unwrap_or(false),
            enum_values: self.resolve_enum(&type_name),
            type_constraint: type_name,
        }))
    }

    /// Searches enum tables innermost to outermost.
    fn resolve_enum(&self, type_name: &str) -> BTreeSet<String> {
        let element = type_name.trim_end_matches("[]");
        self.enum_tables
            .iter()
            .rev()
            .find_map(|table| table.get(element))
            .cloned()
            .unwrap_or_default()
    }
}

/// Returns the keyword marker of a class deriving from the keyword base.
fn keyword_marker(record: &TypeRecord) -> Option<(&TypeRecord, &AttributeRecord)> {
    let derives_keyword = record
        .base_type
        .as_deref()
        .is_some_and(|base| simple_name(base) == KEYWORD_BASE_TYPE);
    if record.kind != TypeKind::Class || !derives_keyword {
        return None;
    }
    record
        .attribute(KEYWORD_ATTRIBUTE)
        .map(|marker| (record, marker))
}

fn collect_enums(types: &[TypeRecord]) -> EnumTable {
    types
        .iter()
        .filter(|record| record.kind == TypeKind::Enum)
        .map(|record| {
            let values = record
                .enum_fields
                .iter()
                .filter(|field| field.as_str() != ENUM_BACKING_FIELD)
                .cloned()
                .collect();
            (record.name.clone(), values)
        })
        .collect()
}

fn invalid_argument(owner: &str, argument: &str, value: &AttributeValue) -> DiscoveryError {
    DiscoveryError::InvalidAttributeArgument {
        owner: owner.to_string(),
        argument: argument.to_string(),
        value: value.to_string(),
    }
}

fn read_string(
    owner: &str,
    attribute: &AttributeRecord,
    argument: &str,
) -> DiscoveryResult<Option<String>> {
    match attribute.argument(argument) {
        None => Ok(None),
        Some(AttributeValue::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(invalid_argument(owner, argument, other)),
    }
}

fn read_bool(owner: &str, attribute: &AttributeRecord, argument: &str) -> DiscoveryResult<Option<bool>> {
    match attribute.argument(argument) {
        None => Ok(None),
        Some(AttributeValue::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(invalid_argument(owner, argument, other)),
    }
}

fn read_position(owner: &str, attribute: &AttributeRecord) -> DiscoveryResult<Option<u32>> {
    match attribute.argument(ARG_POSITION) {
        None => Ok(None),
        Some(AttributeValue::Int(NOT_POSITIONAL)) => Ok(None),
        Some(value @ AttributeValue::Int(position)) => u32::try_from(*position)
            .map(Some)
            .map_err(|_| invalid_argument(owner, ARG_POSITION, value)),
        Some(other) => Err(invalid_argument(owner, ARG_POSITION, other)),
    }
}

fn read_body_mode(owner: &str, attribute: &AttributeRecord) -> DiscoveryResult<BodyMode> {
    match read_string(owner, attribute, ARG_BODY)? {
        None => Ok(DEFAULT_BODY_MODE),
        Some(value) => BodyMode::parse(&value).ok_or_else(|| {
            invalid_argument(owner, ARG_BODY, &AttributeValue::String(value.clone()))
        }),
    }
}

fn read_use_mode(owner: &str, attribute: &AttributeRecord) -> DiscoveryResult<UseMode> {
    match read_string(owner, attribute, ARG_USE)? {
        None => Ok(DEFAULT_USE_MODE),
        Some(value) => UseMode::parse(&value)
            .ok_or_else(|| invalid_argument(owner, ARG_USE, &AttributeValue::String(value.clone()))),
    }
}
