//! Executes compiled keyword fragments against an explicit context.

use crate::binder::hooks::HookError;
use crate::compile::ast::Expr;
use crate::compile::fragment::{Fragment, Instruction, Operand};
use crate::model::value::{CoercionError, TypeConstraint, Value};
use crate::runtime::instance::KeywordInstance;
use crate::runtime::scope::{ScopeContext, ScopeError};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// State threaded through one script execution.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    scope: ScopeContext,
    variables: BTreeMap<String, Value>,
    output: Vec<Option<Value>>,
    pending: Option<KeywordInstance>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_variable(name, value.into());
        self
    }

    /// Variable names are case-insensitive.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_ascii_lowercase(), value);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(&name.to_ascii_lowercase())
    }

    pub fn scope(&self) -> &ScopeContext {
        &self.scope
    }

    /// Results of outermost invocations, in completion order.
    pub fn output(&self) -> &[Option<Value>] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<Option<Value>> {
        std::mem::take(&mut self.output)
    }

    fn step(&mut self, instruction: &Instruction) -> Result<(), ExecutionError> {
        match instruction {
            Instruction::Instantiate {
                keyword,
                parameter_set,
                arguments,
            } => {
                let mut instance = KeywordInstance::new(keyword.clone(), parameter_set.as_str());
                for argument in arguments {
                    let value = self.resolve(&argument.value, &argument.constraint, &argument.parameter)?;
                    instance.set_parameter(argument.parameter.clone(), value);
                }
                self.pending = Some(instance);
            }
            Instruction::AssignProperties(plans) => {
                let values = plans
                    .iter()
                    .map(|plan| {
                        self.resolve(&plan.value, &plan.constraint, &plan.property)
                            .map(|value| (plan.property.clone(), value))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.pending
                    .as_mut()
                    .ok_or(ExecutionError::NoPendingInstance)?
                    .assign_properties(values);
            }
            Instruction::EnterScope => {
                let instance = self.pending.take().ok_or(ExecutionError::NoPendingInstance)?;
                self.scope.enter_scope(instance)?;
            }
            Instruction::LeaveScope => {
                let result = self.scope.leave_scope()?;
                if self.scope.is_empty() {
                    self.output.push(result);
                }
            }
            Instruction::Assign { variable, value } => {
                let value = self.evaluate(value)?;
                self.set_variable(variable, value);
            }
            Instruction::Evaluate(expr) => {
                self.evaluate(expr)?;
            }
        }
        Ok(())
    }

    fn resolve(
        &self,
        operand: &Operand,
        constraint: &TypeConstraint,
        target: &str,
    ) -> Result<Value, ExecutionError> {
        match operand {
            Operand::Constant(value) => Ok(value.clone()),
            Operand::Deferred(expr) => {
                let value = self.evaluate(expr)?;
                constraint
                    .coerce(&value)
                    .map_err(|error| ExecutionError::Coercion {
                        target: target.to_string(),
                        error,
                    })
            }
        }
    }

    fn evaluate(&self, expr: &Expr) -> Result<Value, ExecutionError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => self
                .variable(name)
                .cloned()
                .ok_or_else(|| ExecutionError::UnknownVariable(name.clone())),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Hashtable(entries) => entries
                .iter()
                .map(|entry| Ok((self.evaluate(&entry.key)?, self.evaluate(&entry.value)?)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Hashtable),
            Expr::ScriptBlock(_) => Err(ExecutionError::UnsupportedExpression("scriptblock")),
        }
    }
}

/// Runs `fragment` to completion.
///
/// On error, scopes opened by this call are dropped without running their
/// leave hooks and the error is returned as raised.
pub fn execute(fragment: &Fragment, context: &mut ExecutionContext) -> Result<(), ExecutionError> {
    let depth = context.scope.depth();
    let outcome = fragment
        .instructions
        .iter()
        .try_for_each(|instruction| context.step(instruction));
    if outcome.is_err() {
        context.scope.unwind_to(depth);
        context.pending = None;
    }
    outcome
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    Scope(ScopeError),
    Coercion { target: String, error: CoercionError },
    UnknownVariable(String),
    NoPendingInstance,
    UnsupportedExpression(&'static str),
}

impl ExecutionError {
    /// The user hook error behind this failure, if any.
    pub fn hook_error(&self) -> Option<&HookError> {
        match self {
            Self::Scope(ScopeError::Hook(err)) => Some(err),
            _ => None,
        }
    }
}

impl Display for ExecutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scope(err) => write!(f, "{err}"),
            Self::Coercion { target, error } => write!(f, "`{target}`: {error}"),
            Self::UnknownVariable(name) => write!(f, "variable `${name}` is not defined"),
            Self::NoPendingInstance => write!(f, "no keyword instance is pending"),
            Self::UnsupportedExpression(kind) => {
                write!(f, "{kind} expressions cannot be evaluated here")
            }
        }
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scope(err) => Some(err),
            Self::Coercion { error, .. } => Some(error),
            Self::UnknownVariable(_) | Self::NoPendingInstance | Self::UnsupportedExpression(_) => {
                None
            }
        }
    }
}

impl From<ScopeError> for ExecutionError {
    fn from(value: ScopeError) -> Self {
        Self::Scope(value)
    }
}
