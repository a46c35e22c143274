use crate::binder::hooks::{HookError, ParseError};
use crate::compile::ast::SourceSpan;
use crate::model::spec::BodyMode;
use crate::model::value::CoercionError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CompileResult<T> = Result<T, CompileError>;

/// Why an invocation was rejected at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationErrorKind {
    UnknownParameter(String),
    DuplicateParameter(String),
    ParameterNotInSet {
        parameter: String,
        parameter_set: String,
    },
    MissingArgument(String),
    TooManyPositionalArguments(usize),
    MissingMandatoryParameter(String),
    ParameterTypeMismatch {
        parameter: String,
        error: CoercionError,
    },
    NonStringKey(String),
    UnknownProperty(String),
    DuplicateProperty(String),
    PropertyTypeMismatch {
        property: String,
        error: CoercionError,
    },
    MissingMandatoryProperty(String),
    MalformedBody {
        expected: BodyMode,
    },
    KeywordNotInScope(String),
    MissingRequiredKeyword(String),
    KeywordUsedMoreThanOnce(String),
    UnboundKeyword,
    /// Diagnostics reported by a parse-time hook.
    ParseErrors(Vec<ParseError>),
}

impl Display for InvocationErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownParameter(name) => write!(f, "unknown parameter `{name}`"),
            Self::DuplicateParameter(name) => write!(f, "parameter `{name}` is bound more than once"),
            Self::ParameterNotInSet {
                parameter,
                parameter_set,
            } => write!(
                f,
                "parameter `{parameter}` cannot be used with parameter set `{parameter_set}`"
            ),
            Self::MissingArgument(name) => write!(f, "parameter `{name}` requires an argument"),
            Self::TooManyPositionalArguments(count) => {
                write!(f, "{count} positional argument(s) could not be bound")
            }
            Self::MissingMandatoryParameter(name) => {
                write!(f, "mandatory parameter `{name}` is missing")
            }
            Self::ParameterTypeMismatch { parameter, error } => {
                write!(f, "parameter `{parameter}`: {error}")
            }
            Self::NonStringKey(key) => write!(f, "hashtable key {key} is not a string"),
            Self::UnknownProperty(name) => write!(f, "unknown property `{name}`"),
            Self::DuplicateProperty(name) => write!(f, "property `{name}` is assigned more than once"),
            Self::PropertyTypeMismatch { property, error } => {
                write!(f, "property `{property}`: {error}")
            }
            Self::MissingMandatoryProperty(name) => {
                write!(f, "mandatory property `{name}` is missing")
            }
            Self::MalformedBody { expected } => {
                write!(f, "body does not match body mode {expected}")
            }
            Self::KeywordNotInScope(name) => {
                write!(f, "keyword `{name}` is not valid in this scope")
            }
            Self::MissingRequiredKeyword(name) => {
                write!(f, "required keyword `{name}` is missing")
            }
            Self::KeywordUsedMoreThanOnce(name) => {
                write!(f, "keyword `{name}` may appear at most once")
            }
            Self::UnboundKeyword => write!(f, "keyword is not bound to module code"),
            Self::ParseErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                write!(f, "{}", messages.join("; "))
            }
        }
    }
}

/// Compile-time rejection of one keyword invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationError {
    pub keyword: String,
    pub span: SourceSpan,
    pub kind: InvocationErrorKind,
}

impl InvocationError {
    pub fn new(keyword: impl Into<String>, span: SourceSpan, kind: InvocationErrorKind) -> Self {
        Self {
            keyword: keyword.into(),
            span,
            kind,
        }
    }
}

impl Display for InvocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: keyword `{}`: {}", self.span, self.keyword, self.kind)
    }
}

impl Error for InvocationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Invocation(InvocationError),
    /// A parse-time hook raised; carried unchanged.
    Hook(HookError),
}

impl CompileError {
    pub fn invocation(&self) -> Option<&InvocationError> {
        match self {
            Self::Invocation(err) => Some(err),
            Self::Hook(_) => None,
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invocation(err) => write!(f, "{err}"),
            Self::Hook(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invocation(err) => Some(err),
            Self::Hook(err) => Some(err),
        }
    }
}

impl From<InvocationError> for CompileError {
    fn from(value: InvocationError) -> Self {
        Self::Invocation(value)
    }
}

impl From<HookError> for CompileError {
    fn from(value: HookError) -> Self {
        Self::Hook(value)
    }
}
