//! Runtime values and declared type constraints.
//!
//! # Responsibility
//! - Represent argument, property and hook-result values flowing through
//!   compiled keyword fragments.
//! - Coerce values to the type a parameter or property declares.
//!
//! # Invariants
//! - Coercion never mutates its input; a failed coercion leaves no trace.
//! - Enum-constrained values are normalized to the declared member spelling.

use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value produced by evaluating script expressions or keyword hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Array(Vec<Value>),
    /// Ordered key/value pairs. Keys are not restricted to strings here;
    /// callers that need string keys check them explicitly.
    Hashtable(Vec<(Value, Value)>),
}

impl Value {
    /// Short type label used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Hashtable(_) => "hashtable",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "\"{value}\""),
            Self::Array(items) => {
                write!(f, "@(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Hashtable(entries) => {
                write!(f, "@{{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Type a parameter or property accepts, derived from its declared type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeConstraint {
    /// `object` or an undeclared type: everything is accepted as-is.
    Any,
    Bool,
    Int,
    String,
    Hashtable,
    /// Locally declared enum; values are its member names.
    Enum {
        name: String,
        values: BTreeSet<String>,
    },
    Array(Box<TypeConstraint>),
    /// A type the engine cannot check (e.g. a host object type).
    Opaque(String),
}

impl TypeConstraint {
    /// Builds a constraint from a decoded engine type name.
    ///
    /// `enum_values` is non-empty only when discovery resolved the type name
    /// to a locally declared enum.
    pub fn from_type_name(type_name: &str, enum_values: &BTreeSet<String>) -> Self {
        let trimmed = type_name.trim();
        if let Some(element) = trimmed.strip_suffix("[]") {
            return Self::Array(Box::new(Self::from_type_name(element, enum_values)));
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "" | "object" => Self::Any,
            "bool" | "switch" => Self::Bool,
            "int" | "long" => Self::Int,
            "string" => Self::String,
            "hashtable" => Self::Hashtable,
            _ if !enum_values.is_empty() => Self::Enum {
                name: trimmed.to_string(),
                values: enum_values.clone(),
            },
            _ => Self::Opaque(trimmed.to_string()),
        }
    }

    /// Returns true for constraints a bare `-Name` switch may satisfy.
    pub fn is_switch(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Converts `value` to this constraint, or explains why it cannot.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoercionError> {
        let mismatch = || CoercionError {
            expected: self.to_string(),
            found: value.type_name(),
            value: value.to_string(),
        };

        match self {
            Self::Any | Self::Opaque(_) => Ok(value.clone()),
            Self::Bool => match value {
                Value::Bool(flag) => Ok(Value::Bool(*flag)),
                Value::Int(number) => Ok(Value::Bool(*number != 0)),
                Value::String(text) if text.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(text) if text.eq_ignore_ascii_case("false") => {
                    Ok(Value::Bool(false))
                }
                _ => Err(mismatch()),
            },
            Self::Int => match value {
                Value::Int(number) => Ok(Value::Int(*number)),
                Value::String(text) => text
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            Self::String => match value {
                Value::String(text) => Ok(Value::String(text.clone())),
                Value::Int(number) => Ok(Value::String(number.to_string())),
                Value::Bool(flag) => Ok(Value::String(flag.to_string())),
                _ => Err(mismatch()),
            },
            Self::Hashtable => match value {
                Value::Hashtable(entries) => Ok(Value::Hashtable(entries.clone())),
                _ => Err(mismatch()),
            },
            Self::Enum { values, .. } => {
                let Value::String(text) = value else {
                    return Err(mismatch());
                };
                values
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(text.trim()))
                    .map(|candidate| Value::String(candidate.clone()))
                    .ok_or_else(mismatch)
            }
            Self::Array(element) => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| element.coerce(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
                    .map_err(|_| mismatch()),
                Value::Null => Err(mismatch()),
                scalar => element
                    .coerce(scalar)
                    .map(|item| Value::Array(vec![item]))
                    .map_err(|_| mismatch()),
            },
        }
    }
}

impl Display for TypeConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "object"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
            Self::Hashtable => write!(f, "hashtable"),
            Self::Enum { name, .. } => write!(f, "{name}"),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::Opaque(name) => write!(f, "{name}"),
        }
    }
}

/// A value could not be converted to a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    pub expected: String,
    pub found: &'static str,
    pub value: String,
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot convert {} value {} to type `{}`",
            self.found, self.value, self.expected
        )
    }
}

impl Error for CoercionError {}
