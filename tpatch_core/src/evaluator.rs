use std::fmt;

use crate::ConditionMode;
use crate::ConditionSet;
use crate::DiagnosticScope;
use crate::EvaluationContext;
use crate::Leaf;
use crate::context::BUILD_TYPE_ENV;
use crate::context::BUILD_TYPE_PROPERTY;
use crate::version::evaluate_version_constraint;

/// Result of evaluating a [`ConditionSet`], with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
	pub satisfied: bool,
	/// The first predicate that did not hold. `None` when satisfied.
	pub failure: Option<ConditionFailure>,
}

/// Where and why a condition evaluated to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFailure {
	/// Path of the failing node within the condition tree, e.g.
	/// `allOf[1].not`.
	pub path: String,
	pub reason: String,
}

impl fmt::Display for ConditionFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.path.is_empty() {
			f.write_str(&self.reason)
		} else {
			write!(f, "{}: {}", self.path, self.reason)
		}
	}
}

/// Evaluate `conditions` against `context`. Absent conditions always hold.
pub fn evaluate<C>(
	conditions: Option<&ConditionSet>,
	context: &C,
	scope: &DiagnosticScope<'_>,
) -> bool
where
	C: EvaluationContext + ?Sized,
{
	evaluate_detailed(conditions, context, scope).satisfied
}

/// Evaluate `conditions` and record the first failing predicate.
pub fn evaluate_detailed<C>(
	conditions: Option<&ConditionSet>,
	context: &C,
	scope: &DiagnosticScope<'_>,
) -> Evaluation
where
	C: EvaluationContext + ?Sized,
{
	let Some(conditions) = conditions else {
		return Evaluation {
			satisfied: true,
			failure: None,
		};
	};

	match evaluate_node(conditions, context, "") {
		Ok(()) => {
			Evaluation {
				satisfied: true,
				failure: None,
			}
		}
		Err(failure) => {
			tracing::debug!(
				template = scope.template,
				directive = scope.directive,
				%failure,
				"conditions not satisfied"
			);
			Evaluation {
				satisfied: false,
				failure: Some(failure),
			}
		}
	}
}

fn evaluate_node<C>(node: &ConditionSet, context: &C, path: &str) -> Result<(), ConditionFailure>
where
	C: EvaluationContext + ?Sized,
{
	match node.mode() {
		ConditionMode::AllOf(members) => {
			for (index, member) in members.iter().enumerate() {
				evaluate_node(member, context, &join_path(path, &format!("allOf[{index}]")))?;
			}
			Ok(())
		}
		ConditionMode::AnyOf(members) => {
			let matched = members.iter().enumerate().any(|(index, member)| {
				evaluate_node(member, context, &join_path(path, &format!("anyOf[{index}]"))).is_ok()
			});
			if matched {
				Ok(())
			} else {
				Err(ConditionFailure {
					path: join_path(path, "anyOf"),
					reason: format!("none of {} alternative(s) matched", members.len()),
				})
			}
		}
		ConditionMode::Not(inner) => {
			match evaluate_node(inner, context, &join_path(path, "not")) {
				Ok(()) => {
					Err(ConditionFailure {
						path: join_path(path, "not"),
						reason: "negated condition holds".to_string(),
					})
				}
				Err(_) => Ok(()),
			}
		}
		ConditionMode::Leaves => {
			for leaf in node.leaves() {
				if !check_leaf(leaf, context) {
					return Err(ConditionFailure {
						path: path.to_string(),
						reason: format!("`{leaf}` does not hold"),
					});
				}
			}
			Ok(())
		}
	}
}

fn check_leaf<C>(leaf: Leaf<'_>, context: &C) -> bool
where
	C: EvaluationContext + ?Sized,
{
	match leaf {
		Leaf::GeneratorVersion(constraint) => {
			let Some(actual) = context.generator_version() else {
				tracing::warn!(constraint, "generator version is unknown, constraint fails");
				return false;
			};
			evaluate_version_constraint(constraint, actual)
		}
		Leaf::TemplateContains(pattern) => context.template_contains(pattern),
		Leaf::TemplateNotContains(pattern) => !context.template_contains(pattern),
		Leaf::TemplateContainsAll(patterns) => {
			patterns
				.iter()
				.all(|pattern| context.template_contains(pattern))
		}
		Leaf::TemplateContainsAny(patterns) => {
			patterns
				.iter()
				.any(|pattern| context.template_contains(pattern))
		}
		Leaf::HasFeature(name) => context.has_feature(name),
		Leaf::HasAllFeatures(names) => names.iter().all(|name| context.has_feature(name)),
		Leaf::HasAnyFeatures(names) => names.iter().any(|name| context.has_feature(name)),
		Leaf::ProjectProperty(name) => context.has_project_property(name),
		Leaf::EnvironmentVariable(name) => context.has_environment_variable(name),
		Leaf::BuildType(expected) => resolve_build_type(context) == Some(expected),
	}
}

/// The active build type: the `buildType` project property, else the
/// `BUILD_TYPE` environment variable.
pub fn resolve_build_type<C>(context: &C) -> Option<&str>
where
	C: EvaluationContext + ?Sized,
{
	context
		.project_property(BUILD_TYPE_PROPERTY)
		.or_else(|| context.environment_variable(BUILD_TYPE_ENV))
}

fn join_path(parent: &str, segment: &str) -> String {
	if parent.is_empty() {
		segment.to_string()
	} else {
		format!("{parent}.{segment}")
	}
}
