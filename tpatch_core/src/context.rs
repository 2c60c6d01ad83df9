use std::collections::BTreeMap;
use std::collections::BTreeSet;

use derive_more::Deref;
use derive_more::DerefMut;

/// Project property consulted first when resolving a `buildType` condition.
pub const BUILD_TYPE_PROPERTY: &str = "buildType";
/// Environment variable consulted when the `buildType` property is absent.
pub const BUILD_TYPE_ENV: &str = "BUILD_TYPE";

/// Read-only lookups a condition is evaluated against.
///
/// Implementations must present a consistent snapshot for the duration of an
/// evaluation. [`GeneratorEnvironment`] captures the process environment once
/// at construction for this reason.
pub trait EvaluationContext {
	/// The version string of the code generator in use, if known.
	fn generator_version(&self) -> Option<&str>;

	/// Whether the template text contains `pattern` verbatim.
	fn template_contains(&self, pattern: &str) -> bool;

	fn has_feature(&self, name: &str) -> bool;

	fn project_property(&self, name: &str) -> Option<&str>;

	fn environment_variable(&self, name: &str) -> Option<&str>;

	fn has_project_property(&self, name: &str) -> bool {
		self.project_property(name).is_some()
	}

	fn has_environment_variable(&self, name: &str) -> bool {
		self.environment_variable(name).is_some()
	}
}

/// The set of feature flags enabled for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct FeatureSet(BTreeSet<String>);

impl<S: Into<String>> FromIterator<S> for FeatureSet {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self(iter.into_iter().map(Into::into).collect())
	}
}

/// Immutable snapshot of everything a rule may ask about the generator and
/// the surrounding project, except the template text itself.
#[derive(Debug, Clone, Default)]
pub struct GeneratorEnvironment {
	generator: Option<String>,
	version: Option<String>,
	features: FeatureSet,
	properties: BTreeMap<String, String>,
	environment: BTreeMap<String, String>,
}

impl GeneratorEnvironment {
	/// An empty environment: no version, features, properties or variables.
	pub fn new() -> Self {
		Self::default()
	}

	/// An environment holding a copy of the current process environment.
	/// Variables that are not valid unicode are skipped.
	pub fn capture() -> Self {
		let environment = std::env::vars_os()
			.filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
			.collect();

		Self {
			environment,
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
		self.generator = Some(generator.into());
		self
	}

	#[must_use]
	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = Some(version.into());
		self
	}

	#[must_use]
	pub fn with_feature(mut self, name: impl Into<String>) -> Self {
		self.features.insert(name.into());
		self
	}

	#[must_use]
	pub fn with_features<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.features.extend(names.into_iter().map(Into::into));
		self
	}

	#[must_use]
	pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.properties.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_environment_variable(
		mut self,
		name: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		self.environment.insert(name.into(), value.into());
		self
	}

	pub fn generator(&self) -> Option<&str> {
		self.generator.as_deref()
	}

	pub fn version(&self) -> Option<&str> {
		self.version.as_deref()
	}

	pub fn features(&self) -> &FeatureSet {
		&self.features
	}

	pub fn properties(&self) -> &BTreeMap<String, String> {
		&self.properties
	}

	/// Bind this environment to a template's original text.
	pub fn for_template<'a>(&'a self, template: &'a str) -> TemplateContext<'a> {
		TemplateContext {
			environment: self,
			template,
		}
	}
}

/// A [`GeneratorEnvironment`] paired with the original text of the template
/// being customized.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
	environment: &'a GeneratorEnvironment,
	template: &'a str,
}

impl TemplateContext<'_> {
	pub fn template(&self) -> &str {
		self.template
	}
}

impl EvaluationContext for TemplateContext<'_> {
	fn generator_version(&self) -> Option<&str> {
		self.environment.version()
	}

	fn template_contains(&self, pattern: &str) -> bool {
		self.template.contains(pattern)
	}

	fn has_feature(&self, name: &str) -> bool {
		self.environment.features.contains(name)
	}

	fn project_property(&self, name: &str) -> Option<&str> {
		self.environment.properties.get(name).map(String::as_str)
	}

	fn environment_variable(&self, name: &str) -> Option<&str> {
		self.environment.environment.get(name).map(String::as_str)
	}
}

/// Names the template and directive being processed so that log lines and
/// reports can be attributed without ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticScope<'a> {
	pub template: &'a str,
	pub directive: &'a str,
}

impl<'a> DiagnosticScope<'a> {
	pub fn new(template: &'a str, directive: &'a str) -> Self {
		Self {
			template,
			directive,
		}
	}
}
