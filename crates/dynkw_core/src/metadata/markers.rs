//! Marker vocabulary recognized by keyword discovery.
//!
//! Module builds emit these names into their metadata; discovery matches them
//! by decoded simple name so namespaces do not matter.

use crate::metadata::records::{AttributeRecord, AttributeValue};
use crate::model::spec::{BodyMode, UseMode, ALL_PARAMETER_SETS};

/// Base type every keyword type derives from.
pub const KEYWORD_BASE_TYPE: &str = "Keyword";
/// Attribute marking a type as a keyword declaration.
pub const KEYWORD_ATTRIBUTE: &str = "KeywordAttribute";
/// Attribute marking a member as a keyword parameter.
pub const PARAMETER_ATTRIBUTE: &str = "KeywordParameterAttribute";
/// Attribute marking a member as a hashtable-body property.
pub const PROPERTY_ATTRIBUTE: &str = "KeywordPropertyAttribute";

pub const ARG_BODY: &str = "Body";
pub const ARG_USE: &str = "Use";
pub const ARG_DEFAULT_PARAMETER_SET: &str = "DefaultParameterSetName";
pub const ARG_MANDATORY: &str = "Mandatory";
pub const ARG_POSITION: &str = "Position";
pub const ARG_PARAMETER_SET: &str = "ParameterSetName";

/// `Position` value meaning "not positional".
pub const NOT_POSITIONAL: i64 = i32::MIN as i64;
/// Numeric backing field emitted for every enum; not a member value.
pub const ENUM_BACKING_FIELD: &str = "value__";

pub const DEFAULT_BODY_MODE: BodyMode = BodyMode::Command;
pub const DEFAULT_USE_MODE: UseMode = UseMode::OptionalMany;

/// Keyword marker with explicit body and use modes.
pub fn keyword_attribute(body: BodyMode, use_mode: UseMode) -> AttributeRecord {
    AttributeRecord::new(KEYWORD_ATTRIBUTE)
        .with_argument(ARG_BODY, AttributeValue::String(body.as_str().to_string()))
        .with_argument(ARG_USE, AttributeValue::String(use_mode.as_str().to_string()))
}

/// Parameter marker for one parameter set (`None` means all sets).
pub fn parameter_attribute(
    mandatory: bool,
    position: Option<u32>,
    parameter_set: Option<&str>,
) -> AttributeRecord {
    let position = position.map_or(NOT_POSITIONAL, i64::from);
    AttributeRecord::new(PARAMETER_ATTRIBUTE)
        .with_argument(ARG_MANDATORY, AttributeValue::Bool(mandatory))
        .with_argument(ARG_POSITION, AttributeValue::Int(position))
        .with_argument(
            ARG_PARAMETER_SET,
            AttributeValue::String(parameter_set.unwrap_or(ALL_PARAMETER_SETS).to_string()),
        )
}

pub fn property_attribute(mandatory: bool) -> AttributeRecord {
    AttributeRecord::new(PROPERTY_ATTRIBUTE)
        .with_argument(ARG_MANDATORY, AttributeValue::Bool(mandatory))
}
