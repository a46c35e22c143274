//! Per-invocation keyword state.

use crate::model::spec::KeywordSpec;
use crate::model::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One executing invocation of a keyword with its bound values.
#[derive(Debug, Clone)]
pub struct KeywordInstance {
    keyword: Arc<KeywordSpec>,
    parameter_set: String,
    parameters: BTreeMap<String, Value>,
    properties: BTreeMap<String, Value>,
}

impl KeywordInstance {
    pub fn new(keyword: Arc<KeywordSpec>, parameter_set: impl Into<String>) -> Self {
        Self {
            keyword,
            parameter_set: parameter_set.into(),
            parameters: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn keyword(&self) -> &Arc<KeywordSpec> {
        &self.keyword
    }

    pub fn name(&self) -> &str {
        &self.keyword.name
    }

    pub fn parameter_set(&self) -> &str {
        &self.parameter_set
    }

    /// Parameter value by name (case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        lookup(&self.parameters, name)
    }

    /// Property value by name (case-insensitive).
    pub fn property(&self, name: &str) -> Option<&Value> {
        lookup(&self.properties, name)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub(crate) fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Applies already-validated property values in one step.
    pub(crate) fn assign_properties(&mut self, values: Vec<(String, Value)>) {
        self.properties.extend(values);
    }
}

fn lookup<'a>(values: &'a BTreeMap<String, Value>, name: &str) -> Option<&'a Value> {
    values.get(name).or_else(|| {
        values
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
