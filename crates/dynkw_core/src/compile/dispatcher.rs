//! Per-body-mode compilation of keyword invocations into fragments.

use crate::binder::hooks::{Hook, HookError, ParseError};
use crate::compile::ast::{Expr, HashtableEntry, KeywordInvocation, ScriptBlock, SourceSpan, Statement};
use crate::compile::error::{CompileError, CompileResult, InvocationError, InvocationErrorKind};
use crate::compile::fragment::{Fragment, Instruction, Operand, PropertyPlan};
use crate::compile::params::{ParameterBinder, StaticParameterBinder};
use crate::model::spec::{BodyMode, KeywordSpec};
use crate::model::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry point the host compiler calls once per keyword invocation.
///
/// Keywords whose bound type has neither scope hook compile to no scope
/// instructions at all; their arguments and bodies are still validated.
#[derive(Debug, Clone, Default)]
pub struct KeywordCompiler<B: ParameterBinder = StaticParameterBinder> {
    binder: B,
}

impl KeywordCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: ParameterBinder> KeywordCompiler<B> {
    pub fn with_binder(binder: B) -> Self {
        Self { binder }
    }

    /// Compiles one invocation. Errors never yield a partial fragment.
    pub fn compile(&self, node: &KeywordInvocation) -> CompileResult<Fragment> {
        let keyword = node.keyword.as_ref();
        let runtime = keyword
            .runtime()
            .ok_or_else(|| invocation_error(keyword, node.span, InvocationErrorKind::UnboundKeyword))?;
        let hooks = runtime.hooks();
        let implementation = runtime.implementation();

        if hooks.contains(Hook::PreParse) {
            check_diagnostics(keyword, node.span, implementation.pre_parse(keyword))?;
        }

        let bound = self.binder.bind(keyword, &node.elements, node.span)?;

        if hooks.contains(Hook::PostParse) {
            check_diagnostics(keyword, node.span, implementation.post_parse(node))?;
        }

        let uses_scope = runtime.uses_scope();
        let instantiate = Instruction::Instantiate {
            keyword: Arc::clone(&node.keyword),
            parameter_set: bound.parameter_set,
            arguments: bound.arguments,
        };

        let mut fragment = Fragment::empty();
        match keyword.body_mode {
            BodyMode::Command => {
                if node.body.is_some() {
                    return Err(malformed_body(keyword, node));
                }
                if uses_scope {
                    fragment.push(instantiate);
                    fragment.push(Instruction::EnterScope);
                    fragment.push(Instruction::LeaveScope);
                }
            }
            BodyMode::Hashtable => {
                let Some(Expr::Hashtable(entries)) = &node.body else {
                    return Err(malformed_body(keyword, node));
                };
                let properties = plan_properties(keyword, entries, node.span)?;
                if uses_scope {
                    fragment.push(instantiate);
                    fragment.push(Instruction::AssignProperties(properties));
                    fragment.push(Instruction::EnterScope);
                    fragment = fragment.then(Fragment {
                        instructions: vec![Instruction::LeaveScope],
                    });
                }
            }
            BodyMode::ScriptBlock => {
                let Some(Expr::ScriptBlock(block)) = &node.body else {
                    return Err(malformed_body(keyword, node));
                };
                check_nested_usage(keyword, block)?;
                let body = self.compile_block(&block.statements, Some(keyword))?;
                if uses_scope {
                    fragment.push(instantiate);
                    fragment.push(Instruction::EnterScope);
                }
                fragment = fragment.then(body);
                if uses_scope {
                    fragment.push(Instruction::LeaveScope);
                }
            }
        }

        if hooks.contains(Hook::SemanticCheck) {
            check_diagnostics(keyword, node.span, implementation.semantic_check(node))?;
        }

        Ok(fragment)
    }

    /// Compiles top-level script statements. Nested keywords are rejected
    /// here; they are only valid inside their parent's body.
    pub fn compile_script(&self, statements: &[Statement]) -> CompileResult<Fragment> {
        self.compile_block(statements, None)
    }

    fn compile_block(
        &self,
        statements: &[Statement],
        parent: Option<&KeywordSpec>,
    ) -> CompileResult<Fragment> {
        let mut fragment = Fragment::empty();
        for statement in statements {
            let compiled = match statement {
                Statement::Keyword(node) => {
                    if parent.is_none() && node.keyword.is_nested {
                        return Err(invocation_error(
                            &node.keyword,
                            node.span,
                            InvocationErrorKind::KeywordNotInScope(node.keyword.name.clone()),
                        ));
                    }
                    self.compile(node)?
                }
                Statement::Assignment {
                    variable, value, ..
                } => Fragment {
                    instructions: vec![Instruction::Assign {
                        variable: variable.clone(),
                        value: value.clone(),
                    }],
                },
                Statement::Expression { expr, .. } => Fragment {
                    instructions: vec![Instruction::Evaluate(expr.clone())],
                },
            };
            fragment = fragment.then(compiled);
        }
        Ok(fragment)
    }
}

fn invocation_error(keyword: &KeywordSpec, span: SourceSpan, kind: InvocationErrorKind) -> CompileError {
    CompileError::Invocation(InvocationError::new(keyword.name.clone(), span, kind))
}

fn malformed_body(keyword: &KeywordSpec, node: &KeywordInvocation) -> CompileError {
    invocation_error(
        keyword,
        node.span,
        InvocationErrorKind::MalformedBody {
            expected: keyword.body_mode,
        },
    )
}

/// Hook errors pass through unchanged; reported diagnostics reject the node.
fn check_diagnostics(
    keyword: &KeywordSpec,
    span: SourceSpan,
    outcome: Result<Vec<ParseError>, HookError>,
) -> CompileResult<()> {
    let diagnostics = outcome?;
    if diagnostics.is_empty() {
        return Ok(());
    }
    Err(invocation_error(
        keyword,
        span,
        InvocationErrorKind::ParseErrors(diagnostics),
    ))
}

fn plan_properties(
    keyword: &KeywordSpec,
    entries: &[HashtableEntry],
    span: SourceSpan,
) -> CompileResult<Vec<PropertyPlan>> {
    let mut plans: Vec<PropertyPlan> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Expr::Literal(Value::String(key)) = &entry.key else {
            return Err(invocation_error(
                keyword,
                entry.span,
                InvocationErrorKind::NonStringKey(describe_key(&entry.key)),
            ));
        };
        let property = keyword.property(key).ok_or_else(|| {
            invocation_error(
                keyword,
                entry.span,
                InvocationErrorKind::UnknownProperty(key.clone()),
            )
        })?;
        if plans.iter().any(|plan| plan.property == property.name) {
            return Err(invocation_error(
                keyword,
                entry.span,
                InvocationErrorKind::DuplicateProperty(property.name.clone()),
            ));
        }

        let constraint = property.constraint();
        let value = Operand::plan(&entry.value, &constraint).map_err(|error| {
            invocation_error(
                keyword,
                entry.span,
                InvocationErrorKind::PropertyTypeMismatch {
                    property: property.name.clone(),
                    error,
                },
            )
        })?;
        plans.push(PropertyPlan {
            property: property.name.clone(),
            constraint,
            value,
        });
    }

    if let Some(missing) = keyword
        .properties
        .iter()
        .find(|property| property.mandatory && !plans.iter().any(|plan| plan.property == property.name))
    {
        return Err(invocation_error(
            keyword,
            span,
            InvocationErrorKind::MissingMandatoryProperty(missing.name.clone()),
        ));
    }
    Ok(plans)
}

fn describe_key(key: &Expr) -> String {
    match key {
        Expr::Literal(value) => format!("{value} ({})", value.type_name()),
        Expr::Variable(name) => format!("${name}"),
        Expr::Array(_) => "array".to_string(),
        Expr::Hashtable(_) => "hashtable".to_string(),
        Expr::ScriptBlock(_) => "scriptblock".to_string(),
    }
}

/// Checks the direct keyword statements of `parent`'s body against the
/// declared children and their use modes.
fn check_nested_usage(parent: &KeywordSpec, block: &ScriptBlock) -> CompileResult<()> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for statement in &block.statements {
        let Statement::Keyword(node) = statement else {
            continue;
        };
        let declared = parent
            .children
            .iter()
            .any(|child| Arc::ptr_eq(child, &node.keyword));
        if !declared {
            if !node.keyword.is_nested {
                continue;
            }
            return Err(invocation_error(
                &node.keyword,
                node.span,
                InvocationErrorKind::KeywordNotInScope(node.keyword.name.clone()),
            ));
        }

        let seen = counts.entry(node.keyword.name.as_str()).or_default();
        *seen += 1;
        if *seen > 1 && !node.keyword.use_mode.allows_many() {
            return Err(invocation_error(
                &node.keyword,
                node.span,
                InvocationErrorKind::KeywordUsedMoreThanOnce(node.keyword.name.clone()),
            ));
        }
    }

    if let Some(missing) = parent
        .children
        .iter()
        .find(|child| child.use_mode.is_required() && !counts.contains_key(child.name.as_str()))
    {
        return Err(invocation_error(
            parent,
            block.span,
            InvocationErrorKind::MissingRequiredKeyword(missing.name.clone()),
        ));
    }
    Ok(())
}
