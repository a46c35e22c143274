//! Parser-facing AST contract for keyword invocations.
//!
//! The host parser owns statement and expression parsing; it hands the
//! compiler these nodes with the keyword already resolved to its spec.

use crate::model::spec::KeywordSpec;
use crate::model::value::Value;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Source location of a node, used to attribute compile errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span of a whole line, for callers that only track lines.
    pub fn line(line: u32) -> Self {
        Self {
            line,
            column: 1,
            ..Self::default()
        }
    }
}

impl Display for SourceSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Array(Vec<Expr>),
    Hashtable(Vec<HashtableEntry>),
    ScriptBlock(ScriptBlock),
}

impl Expr {
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Value::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::Literal(Value::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Value of the expression when it is known without running anything.
    pub fn constant_value(&self) -> Option<Value> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Variable(_) | Self::ScriptBlock(_) => None,
            Self::Array(items) => items
                .iter()
                .map(Expr::constant_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Self::Hashtable(entries) => entries
                .iter()
                .map(|entry| Some((entry.key.constant_value()?, entry.value.constant_value()?)))
                .collect::<Option<Vec<_>>>()
                .map(Value::Hashtable),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HashtableEntry {
    pub key: Expr,
    pub value: Expr,
    pub span: SourceSpan,
}

impl HashtableEntry {
    pub fn new(key: Expr, value: Expr, span: SourceSpan) -> Self {
        Self { key, value, span }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptBlock {
    pub statements: Vec<Statement>,
    pub span: SourceSpan,
}

impl ScriptBlock {
    pub fn new(statements: Vec<Statement>, span: SourceSpan) -> Self {
        Self { statements, span }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Keyword(KeywordInvocation),
    Assignment {
        variable: String,
        value: Expr,
        span: SourceSpan,
    },
    Expression {
        expr: Expr,
        span: SourceSpan,
    },
}

impl Statement {
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Keyword(node) => node.span,
            Self::Assignment { span, .. } | Self::Expression { span, .. } => *span,
        }
    }
}

/// One element following the keyword name.
#[derive(Debug, Clone)]
pub enum CommandElement {
    /// `-Name [argument]`
    Parameter {
        name: String,
        argument: Option<Expr>,
        span: SourceSpan,
    },
    /// A positional argument.
    Argument { value: Expr, span: SourceSpan },
}

impl CommandElement {
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::Parameter { span, .. } | Self::Argument { span, .. } => *span,
        }
    }
}

/// A keyword invocation with its flattened elements and optional body.
#[derive(Debug, Clone)]
pub struct KeywordInvocation {
    pub keyword: Arc<KeywordSpec>,
    pub elements: Vec<CommandElement>,
    pub body: Option<Expr>,
    pub span: SourceSpan,
}

impl KeywordInvocation {
    pub fn new(keyword: Arc<KeywordSpec>, span: SourceSpan) -> Self {
        Self {
            keyword,
            elements: Vec::new(),
            body: None,
            span,
        }
    }

    pub fn argument(mut self, value: Expr) -> Self {
        self.elements.push(CommandElement::Argument {
            value,
            span: self.span,
        });
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, argument: Expr) -> Self {
        self.elements.push(CommandElement::Parameter {
            name: name.into(),
            argument: Some(argument),
            span: self.span,
        });
        self
    }

    pub fn switch(mut self, name: impl Into<String>) -> Self {
        self.elements.push(CommandElement::Parameter {
            name: name.into(),
            argument: None,
            span: self.span,
        });
        self
    }

    pub fn body(mut self, body: Expr) -> Self {
        self.body = Some(body);
        self
    }

    pub fn into_statement(self) -> Statement {
        Statement::Keyword(self)
    }
}
