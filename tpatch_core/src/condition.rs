use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::TpatchError;
use crate::TpatchResult;

/// A recursive boolean expression describing when a directive applies.
///
/// Exactly one mode is evaluated per node. When several are populated the
/// precedence is `allOf` > `anyOf` > `not` > the conjunction of leaf fields,
/// and the lower precedence fields are ignored. See [`ConditionSet::mode`].
///
/// ```yaml
/// allOf:
///   - generatorVersion: ">=7.0.0"
///   - anyOf:
///       - hasFeature: validation
///       - templateContains: "@Valid"
///   - not:
///       buildType: debug
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ConditionSet {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub all_of: Option<Vec<ConditionSet>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub any_of: Option<Vec<ConditionSet>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub not: Option<Box<ConditionSet>>,
	/// Version constraint such as `>=7.0.0`, `~>7.1.0` or `^7.0.0`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub generator_version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub template_contains: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub template_not_contains: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub template_contains_all: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub template_contains_any: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub has_feature: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub has_all_features: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub has_any_features: Option<Vec<String>>,
	/// Holds when the named project property is present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub project_property: Option<String>,
	/// Holds when the named environment variable is present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment_variable: Option<String>,
	/// Compared against the `buildType` project property, falling back to the
	/// `BUILD_TYPE` environment variable.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub build_type: Option<String>,
}

/// The single branch of a [`ConditionSet`] that is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionMode<'a> {
	AllOf(&'a [ConditionSet]),
	AnyOf(&'a [ConditionSet]),
	Not(&'a ConditionSet),
	Leaves,
}

/// A single non-logical predicate borrowed from a [`ConditionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a> {
	GeneratorVersion(&'a str),
	TemplateContains(&'a str),
	TemplateNotContains(&'a str),
	TemplateContainsAll(&'a [String]),
	TemplateContainsAny(&'a [String]),
	HasFeature(&'a str),
	HasAllFeatures(&'a [String]),
	HasAnyFeatures(&'a [String]),
	ProjectProperty(&'a str),
	EnvironmentVariable(&'a str),
	BuildType(&'a str),
}

impl Leaf<'_> {
	/// The rule document field this leaf was read from.
	pub fn field(&self) -> &'static str {
		match self {
			Self::GeneratorVersion(_) => "generatorVersion",
			Self::TemplateContains(_) => "templateContains",
			Self::TemplateNotContains(_) => "templateNotContains",
			Self::TemplateContainsAll(_) => "templateContainsAll",
			Self::TemplateContainsAny(_) => "templateContainsAny",
			Self::HasFeature(_) => "hasFeature",
			Self::HasAllFeatures(_) => "hasAllFeatures",
			Self::HasAnyFeatures(_) => "hasAnyFeatures",
			Self::ProjectProperty(_) => "projectProperty",
			Self::EnvironmentVariable(_) => "environmentVariable",
			Self::BuildType(_) => "buildType",
		}
	}
}

impl fmt::Display for Leaf<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::GeneratorVersion(value)
			| Self::TemplateContains(value)
			| Self::TemplateNotContains(value)
			| Self::HasFeature(value)
			| Self::ProjectProperty(value)
			| Self::EnvironmentVariable(value)
			| Self::BuildType(value) => write!(f, "{}: {value:?}", self.field()),
			Self::TemplateContainsAll(values)
			| Self::TemplateContainsAny(values)
			| Self::HasAllFeatures(values)
			| Self::HasAnyFeatures(values) => write!(f, "{}: {values:?}", self.field()),
		}
	}
}

impl ConditionSet {
	pub fn all_of(members: Vec<ConditionSet>) -> Self {
		Self {
			all_of: Some(members),
			..Self::default()
		}
	}

	pub fn any_of(members: Vec<ConditionSet>) -> Self {
		Self {
			any_of: Some(members),
			..Self::default()
		}
	}

	pub fn negate(inner: ConditionSet) -> Self {
		Self {
			not: Some(Box::new(inner)),
			..Self::default()
		}
	}

	pub fn generator_version(constraint: impl Into<String>) -> Self {
		Self {
			generator_version: Some(constraint.into()),
			..Self::default()
		}
	}

	pub fn template_contains(pattern: impl Into<String>) -> Self {
		Self {
			template_contains: Some(pattern.into()),
			..Self::default()
		}
	}

	pub fn has_feature(name: impl Into<String>) -> Self {
		Self {
			has_feature: Some(name.into()),
			..Self::default()
		}
	}

	/// Select the branch to evaluate, honoring `allOf` > `anyOf` > `not` >
	/// leaves.
	pub fn mode(&self) -> ConditionMode<'_> {
		if let Some(members) = &self.all_of {
			ConditionMode::AllOf(members)
		} else if let Some(members) = &self.any_of {
			ConditionMode::AnyOf(members)
		} else if let Some(inner) = &self.not {
			ConditionMode::Not(inner)
		} else {
			ConditionMode::Leaves
		}
	}

	/// Populated leaf predicates in evaluation order. Absent fields are
	/// skipped.
	pub fn leaves(&self) -> Vec<Leaf<'_>> {
		let mut leaves = Vec::new();

		if let Some(value) = &self.generator_version {
			leaves.push(Leaf::GeneratorVersion(value));
		}
		if let Some(value) = &self.template_contains {
			leaves.push(Leaf::TemplateContains(value));
		}
		if let Some(value) = &self.template_not_contains {
			leaves.push(Leaf::TemplateNotContains(value));
		}
		if let Some(values) = &self.template_contains_all {
			leaves.push(Leaf::TemplateContainsAll(values));
		}
		if let Some(values) = &self.template_contains_any {
			leaves.push(Leaf::TemplateContainsAny(values));
		}
		if let Some(value) = &self.has_feature {
			leaves.push(Leaf::HasFeature(value));
		}
		if let Some(values) = &self.has_all_features {
			leaves.push(Leaf::HasAllFeatures(values));
		}
		if let Some(values) = &self.has_any_features {
			leaves.push(Leaf::HasAnyFeatures(values));
		}
		if let Some(value) = &self.project_property {
			leaves.push(Leaf::ProjectProperty(value));
		}
		if let Some(value) = &self.environment_variable {
			leaves.push(Leaf::EnvironmentVariable(value));
		}
		if let Some(value) = &self.build_type {
			leaves.push(Leaf::BuildType(value));
		}

		leaves
	}

	/// Names of every mode populated on this node, highest precedence first.
	pub fn populated_modes(&self) -> Vec<&'static str> {
		let mut modes = Vec::new();
		if self.all_of.is_some() {
			modes.push("allOf");
		}
		if self.any_of.is_some() {
			modes.push("anyOf");
		}
		if self.not.is_some() {
			modes.push("not");
		}
		if !self.leaves().is_empty() {
			modes.push("leaves");
		}
		modes
	}

	/// Check the node and its children for shape problems.
	///
	/// Nodes with more than one populated mode are rejected when `strict` is
	/// set. Otherwise they are reported with a warning and evaluated by
	/// precedence.
	pub fn validate(&self, location: &str, strict: bool) -> TpatchResult<()> {
		let modes = self.populated_modes();
		if modes.len() > 1 {
			let modes = modes.join(", ");
			if strict {
				return Err(TpatchError::AmbiguousCondition {
					location: location.to_string(),
					modes,
				});
			}
			tracing::warn!(
				location,
				%modes,
				"condition sets several modes, only the highest precedence one is evaluated"
			);
		}

		for (field, members) in [("allOf", &self.all_of), ("anyOf", &self.any_of)] {
			for (index, member) in members.iter().flatten().enumerate() {
				member.validate(&format!("{location}.{field}[{index}]"), strict)?;
			}
		}

		if let Some(inner) = &self.not {
			inner.validate(&format!("{location}.not"), strict)?;
		}

		Ok(())
	}
}
