//! Parameter binding for keyword arguments.
//!
//! The compiler delegates argument binding through `ParameterBinder`, so a
//! host with its own binder can plug it in. `StaticParameterBinder` binds
//! against the declared parameter metadata alone.

use crate::compile::ast::{CommandElement, Expr, SourceSpan};
use crate::compile::error::{InvocationError, InvocationErrorKind};
use crate::compile::fragment::{ArgumentPlan, Operand};
use crate::model::spec::{KeywordSpec, ParameterSpec, ALL_PARAMETER_SETS};
use crate::model::value::Value;

/// Arguments bound to declared parameters within one parameter set.
#[derive(Debug, Clone)]
pub struct BoundArguments {
    pub parameter_set: String,
    pub arguments: Vec<ArgumentPlan>,
}

pub trait ParameterBinder {
    fn bind(
        &self,
        keyword: &KeywordSpec,
        elements: &[CommandElement],
        span: SourceSpan,
    ) -> Result<BoundArguments, InvocationError>;
}

/// Binds named arguments first, then positional ones by declared position.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticParameterBinder;

struct NamedArgument<'a> {
    parameter: &'a ParameterSpec,
    argument: Option<&'a Expr>,
    span: SourceSpan,
}

impl ParameterBinder for StaticParameterBinder {
    fn bind(
        &self,
        keyword: &KeywordSpec,
        elements: &[CommandElement],
        span: SourceSpan,
    ) -> Result<BoundArguments, InvocationError> {
        let fail = |at: SourceSpan, kind| InvocationError::new(keyword.name.clone(), at, kind);

        let mut named: Vec<NamedArgument<'_>> = Vec::new();
        let mut positional: Vec<(&Expr, SourceSpan)> = Vec::new();
        for element in elements {
            match element {
                CommandElement::Parameter {
                    name,
                    argument,
                    span,
                } => {
                    let parameter = keyword.parameter(name).ok_or_else(|| {
                        fail(*span, InvocationErrorKind::UnknownParameter(name.clone()))
                    })?;
                    if named.iter().any(|bound| bound.parameter.name == parameter.name) {
                        return Err(fail(
                            *span,
                            InvocationErrorKind::DuplicateParameter(parameter.name.clone()),
                        ));
                    }
                    named.push(NamedArgument {
                        parameter,
                        argument: argument.as_ref(),
                        span: *span,
                    });
                }
                CommandElement::Argument { value, span } => positional.push((value, *span)),
            }
        }

        let parameter_set = resolve_parameter_set(keyword, &named)?;

        let mut arguments = Vec::with_capacity(named.len() + positional.len());
        for bound in &named {
            let constraint = bound.parameter.type_constraint();
            let value = match bound.argument {
                Some(expr) => Operand::plan(expr, &constraint).map_err(|error| {
                    fail(
                        bound.span,
                        InvocationErrorKind::ParameterTypeMismatch {
                            parameter: bound.parameter.name.clone(),
                            error,
                        },
                    )
                })?,
                None if constraint.is_switch() => Operand::Constant(Value::Bool(true)),
                None => {
                    return Err(fail(
                        bound.span,
                        InvocationErrorKind::MissingArgument(bound.parameter.name.clone()),
                    ))
                }
            };
            arguments.push(ArgumentPlan {
                parameter: bound.parameter.name.clone(),
                constraint,
                value,
            });
        }

        let mut slots: Vec<(u32, &ParameterSpec)> = keyword
            .parameters
            .iter()
            .filter(|parameter| !named.iter().any(|bound| bound.parameter.name == parameter.name))
            .filter_map(|parameter| {
                parameter
                    .in_set(&parameter_set)
                    .and_then(|data| data.position)
                    .map(|position| (position, parameter))
            })
            .collect();
        slots.sort_by_key(|(position, _)| *position);

        if positional.len() > slots.len() {
            let (_, first_unbound) = positional[slots.len()];
            return Err(fail(
                first_unbound,
                InvocationErrorKind::TooManyPositionalArguments(positional.len() - slots.len()),
            ));
        }
        for ((_, parameter), (expr, at)) in slots.iter().zip(positional) {
            let constraint = parameter.type_constraint();
            let value = Operand::plan(expr, &constraint).map_err(|error| {
                fail(
                    at,
                    InvocationErrorKind::ParameterTypeMismatch {
                        parameter: parameter.name.clone(),
                        error,
                    },
                )
            })?;
            arguments.push(ArgumentPlan {
                parameter: parameter.name.clone(),
                constraint,
                value,
            });
        }

        for parameter in &keyword.parameters {
            let mandatory = parameter
                .in_set(&parameter_set)
                .is_some_and(|data| data.mandatory);
            if mandatory && !arguments.iter().any(|plan| plan.parameter == parameter.name) {
                return Err(fail(
                    span,
                    InvocationErrorKind::MissingMandatoryParameter(parameter.name.clone()),
                ));
            }
        }

        Ok(BoundArguments {
            parameter_set,
            arguments,
        })
    }
}

/// Narrows declared sets by the named parameters used; prefers the default
/// set, then declaration order.
fn resolve_parameter_set(
    keyword: &KeywordSpec,
    named: &[NamedArgument<'_>],
) -> Result<String, InvocationError> {
    let declared = keyword.parameter_set_names();
    if declared.is_empty() {
        return Ok(ALL_PARAMETER_SETS.to_string());
    }

    let mut candidates = declared;
    for bound in named {
        let before = choose(keyword, &candidates);
        candidates.retain(|set| bound.parameter.in_set(set).is_some());
        if candidates.is_empty() {
            return Err(InvocationError::new(
                keyword.name.clone(),
                bound.span,
                InvocationErrorKind::ParameterNotInSet {
                    parameter: bound.parameter.name.clone(),
                    parameter_set: before,
                },
            ));
        }
    }
    Ok(choose(keyword, &candidates))
}

fn choose(keyword: &KeywordSpec, candidates: &[&str]) -> String {
    keyword
        .default_parameter_set
        .as_deref()
        .filter(|default| candidates.contains(default))
        .or_else(|| candidates.first().copied())
        .unwrap_or(ALL_PARAMETER_SETS)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{ParameterBinder, StaticParameterBinder};
    use crate::compile::ast::{CommandElement, Expr, SourceSpan};
    use crate::compile::error::InvocationErrorKind;
    use crate::compile::fragment::Operand;
    use crate::model::spec::{
        BodyMode, KeywordSpec, ModuleRef, ParameterSetData, ParameterSpec, UseMode,
        ALL_PARAMETER_SETS,
    };
    use crate::model::value::Value;
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn parameter(name: &str, type_name: &str, sets: &[(&str, Option<u32>, bool)]) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            type_name: type_name.to_string(),
            enum_values: BTreeSet::new(),
            parameter_sets: sets
                .iter()
                .map(|(set, position, mandatory)| {
                    (
                        set.to_string(),
                        ParameterSetData {
                            position: *position,
                            mandatory: *mandatory,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn keyword() -> KeywordSpec {
        let module = ModuleRef::new(Uuid::nil(), "Sample", "1.0.0");
        let mut spec = KeywordSpec::new("Service", BodyMode::Command, UseMode::OptionalMany, module);
        spec.default_parameter_set = Some("ByName".to_string());
        spec.parameters = vec![
            parameter("Name", "string", &[("ByName", Some(0), true)]),
            parameter("Id", "int", &[("ById", Some(0), true)]),
            parameter("Force", "bool", &[(ALL_PARAMETER_SETS, None, false)]),
        ];
        spec
    }

    fn named(name: &str, argument: Option<Expr>) -> CommandElement {
        CommandElement::Parameter {
            name: name.to_string(),
            argument,
            span: SourceSpan::line(1),
        }
    }

    fn positional(value: Expr) -> CommandElement {
        CommandElement::Argument {
            value,
            span: SourceSpan::line(1),
        }
    }

    #[test]
    fn positional_argument_binds_in_default_set() {
        let bound = StaticParameterBinder
            .bind(&keyword(), &[positional(Expr::string("web"))], SourceSpan::line(1))
            .expect("positional binding");
        assert_eq!(bound.parameter_set, "ByName");
        assert_eq!(bound.arguments[0].parameter, "Name");
        assert!(matches!(
            &bound.arguments[0].value,
            Operand::Constant(Value::String(name)) if name == "web"
        ));
    }

    #[test]
    fn named_parameter_selects_its_set() {
        let bound = StaticParameterBinder
            .bind(
                &keyword(),
                &[named("id", Some(Expr::string("7"))), named("Force", None)],
                SourceSpan::line(1),
            )
            .expect("named binding");
        assert_eq!(bound.parameter_set, "ById");
        assert!(matches!(
            &bound.arguments[0].value,
            Operand::Constant(Value::Int(7))
        ));
        assert!(matches!(
            &bound.arguments[1].value,
            Operand::Constant(Value::Bool(true))
        ));
    }

    #[test]
    fn rejects_parameters_from_conflicting_sets() {
        let err = StaticParameterBinder
            .bind(
                &keyword(),
                &[
                    named("Name", Some(Expr::string("web"))),
                    named("Id", Some(Expr::int(1))),
                ],
                SourceSpan::line(1),
            )
            .expect_err("Name and Id are in different sets");
        assert_eq!(
            err.kind,
            InvocationErrorKind::ParameterNotInSet {
                parameter: "Id".to_string(),
                parameter_set: "ByName".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unknown_duplicate_and_missing_mandatory() {
        let spec = keyword();
        let unknown = StaticParameterBinder
            .bind(&spec, &[named("Colour", Some(Expr::int(1)))], SourceSpan::line(1))
            .expect_err("unknown parameter");
        assert_eq!(
            unknown.kind,
            InvocationErrorKind::UnknownParameter("Colour".to_string())
        );

        let duplicate = StaticParameterBinder
            .bind(
                &spec,
                &[named("Name", Some(Expr::string("a"))), named("name", Some(Expr::string("b")))],
                SourceSpan::line(1),
            )
            .expect_err("duplicate parameter");
        assert_eq!(
            duplicate.kind,
            InvocationErrorKind::DuplicateParameter("Name".to_string())
        );

        let missing = StaticParameterBinder
            .bind(&spec, &[named("Force", None)], SourceSpan::line(1))
            .expect_err("mandatory Name missing");
        assert_eq!(
            missing.kind,
            InvocationErrorKind::MissingMandatoryParameter("Name".to_string())
        );
    }

    #[test]
    fn rejects_extra_positional_arguments_and_defers_variables() {
        let spec = keyword();
        let err = StaticParameterBinder
            .bind(
                &spec,
                &[positional(Expr::string("a")), positional(Expr::string("b"))],
                SourceSpan::line(1),
            )
            .expect_err("only one positional slot");
        assert_eq!(err.kind, InvocationErrorKind::TooManyPositionalArguments(1));

        let bound = StaticParameterBinder
            .bind(&spec, &[positional(Expr::variable("name"))], SourceSpan::line(1))
            .expect("variables bind");
        assert!(matches!(bound.arguments[0].value, Operand::Deferred(_)));
    }
}
