use crate::model::spec::UseMode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Reasons a module's keyword declarations are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Two keywords in one nesting scope share a name.
    DuplicateKeyword { name: String, scope: String },
    /// A non-nested keyword declares a use mode other than `OptionalMany`.
    InvalidUseMode { keyword: String, use_mode: UseMode },
    /// A keyword is nested under a command-mode keyword.
    NestedUnderCommand { parent: String, child: String },
    /// Two parameters of one keyword claim the same position in a set.
    DuplicatePosition {
        keyword: String,
        parameter_set: String,
        position: u32,
    },
    InvalidKeywordName(String),
    /// A marker attribute argument has the wrong type or an unknown value.
    InvalidAttributeArgument {
        owner: String,
        argument: String,
        value: String,
    },
}

impl Display for DiscoveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKeyword { name, scope } => {
                write!(f, "keyword `{name}` is declared more than once in `{scope}`")
            }
            Self::InvalidUseMode { keyword, use_mode } => write!(
                f,
                "top-level keyword `{keyword}` must use OptionalMany, found {use_mode}"
            ),
            Self::NestedUnderCommand { parent, child } => write!(
                f,
                "keyword `{child}` cannot be nested under command-mode keyword `{parent}`"
            ),
            Self::DuplicatePosition {
                keyword,
                parameter_set,
                position,
            } => write!(
                f,
                "keyword `{keyword}` declares position {position} twice in parameter set `{parameter_set}`"
            ),
            Self::InvalidKeywordName(name) => write!(f, "keyword name is invalid: {name}"),
            Self::InvalidAttributeArgument {
                owner,
                argument,
                value,
            } => write!(
                f,
                "attribute argument `{argument}` on `{owner}` has invalid value: {value}"
            ),
        }
    }
}

impl Error for DiscoveryError {}
