//! Executable fragments emitted for keyword invocations.

use crate::compile::ast::Expr;
use crate::model::spec::KeywordSpec;
use crate::model::value::{CoercionError, TypeConstraint, Value};
use std::sync::Arc;

/// A value known at compile time or an expression evaluated at run time.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Already coerced to the target type.
    Constant(Value),
    /// Evaluated and coerced when the instruction runs.
    Deferred(Expr),
}

impl Operand {
    /// Folds constant expressions through `constraint` now; anything else is
    /// left for run time.
    pub fn plan(expr: &Expr, constraint: &TypeConstraint) -> Result<Self, CoercionError> {
        match expr.constant_value() {
            Some(value) => constraint.coerce(&value).map(Self::Constant),
            None => Ok(Self::Deferred(expr.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentPlan {
    pub parameter: String,
    pub constraint: TypeConstraint,
    pub value: Operand,
}

#[derive(Debug, Clone)]
pub struct PropertyPlan {
    pub property: String,
    pub constraint: TypeConstraint,
    pub value: Operand,
}

#[derive(Debug, Clone)]
pub enum Instruction {
    /// Creates the pending instance and binds its arguments.
    Instantiate {
        keyword: Arc<KeywordSpec>,
        parameter_set: String,
        arguments: Vec<ArgumentPlan>,
    },
    /// Assigns hashtable-body properties onto the pending instance, all or
    /// nothing.
    AssignProperties(Vec<PropertyPlan>),
    /// Opens a scope for the pending instance.
    EnterScope,
    LeaveScope,
    Assign { variable: String, value: Expr },
    Evaluate(Expr),
}

/// Ordered instruction sequence; an empty fragment is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub instructions: Vec<Instruction>,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Appends `next` after this fragment.
    pub fn then(mut self, next: Fragment) -> Self {
        self.instructions.extend(next.instructions);
        self
    }

    /// Number of scope-engine operations this fragment performs.
    pub fn scope_operation_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|instruction| {
                matches!(instruction, Instruction::EnterScope | Instruction::LeaveScope)
            })
            .count()
    }
}
