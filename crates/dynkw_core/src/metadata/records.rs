//! Metadata record types and builders.

use crate::metadata::signature::simple_name;
use crate::model::spec::ModuleRef;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Enum,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Enum => "enum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "class" => Some(Self::Class),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Property => "property",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "field" => Some(Self::Field),
            "property" => Some(Self::Property),
            _ => None,
        }
    }
}

/// Typed named-argument value of a custom attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl AttributeValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub name: String,
    pub arguments: Vec<(String, AttributeValue)>,
}

impl AttributeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    /// True when this attribute's simple name is `marker`, whatever its namespace.
    pub fn is(&self, marker: &str) -> bool {
        simple_name(&self.name) == marker
    }

    /// Looks up a named argument (case-insensitive).
    pub fn argument(&self, name: &str) -> Option<&AttributeValue> {
        self.arguments
            .iter()
            .find(|(arg_name, _)| arg_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub name: String,
    /// Raw type signature, e.g. `System.Int32` or `Contoso.Widget+Shape`.
    pub type_name: String,
    pub kind: MemberKind,
    pub settable: bool,
    pub attributes: Vec<AttributeRecord>,
}

impl MemberRecord {
    /// Settable property record.
    pub fn property(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: MemberKind::Property,
            settable: true,
            attributes: Vec::new(),
        }
    }

    /// Public field record.
    pub fn field(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Field,
            ..Self::property(name, type_name)
        }
    }

    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeRecord) -> Self {
        self.attributes.push(attribute);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    pub name: String,
    pub base_type: Option<String>,
    pub kind: TypeKind,
    pub attributes: Vec<AttributeRecord>,
    pub members: Vec<MemberRecord>,
    /// Enum member names, including the numeric backing field when present.
    pub enum_fields: Vec<String>,
    pub nested: Vec<TypeRecord>,
}

impl TypeRecord {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
            kind: TypeKind::Class,
            attributes: Vec::new(),
            members: Vec::new(),
            enum_fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: TypeKind::Enum,
            base_type: Some("System.Enum".to_string()),
            enum_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::class(name)
        }
    }

    pub fn extends(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeRecord) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_member(mut self, member: MemberRecord) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_nested(mut self, nested: TypeRecord) -> Self {
        self.nested.push(nested);
        self
    }

    /// First attribute whose simple name is `name`.
    pub fn attribute(&self, name: &str) -> Option<&AttributeRecord> {
        self.attributes.iter().find(|attribute| attribute.is(name))
    }
}

/// All type records of one module, rooted at the module namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub module: ModuleRef,
    pub types: Vec<TypeRecord>,
}

impl ModuleMetadata {
    pub fn new(module: ModuleRef) -> Self {
        Self {
            module,
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, record: TypeRecord) -> Self {
        self.types.push(record);
        self
    }
}
