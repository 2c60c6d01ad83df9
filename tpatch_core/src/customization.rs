use std::collections::BTreeMap;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::Attempt;
use crate::ConditionFailure;
use crate::ConditionSet;
use crate::DiagnosticScope;
use crate::GeneratorEnvironment;
use crate::Insertion;
use crate::SmartInsertion;
use crate::TpatchError;
use crate::TpatchResult;
use crate::evaluator::evaluate_detailed;
use crate::resolver::apply_insertion;
use crate::resolver::apply_smart_insertion;

/// File extensions recognized as customization documents.
pub const CUSTOMIZATION_EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "toml"];

/// A declarative set of changes for one template.
///
/// Directives run in a fixed order: `replacements`, then `insertions`, then
/// `smartInsertions`, each list in declared order.
///
/// ```yaml
/// template: pojo.mustache
/// conditions:
///   generatorVersion: ">=7.0.0"
/// replacements:
///   - find: "javax.annotation"
///     replace: "jakarta.annotation"
/// insertions:
///   - after: "import java.util.Objects;"
///     content: "\n{{>validationImports}}"
/// smartInsertions:
///   - semantic: class_annotations
///     findInsertionPoint:
///       patterns:
///         - before: "public class {{classname}}"
///     content: "@lombok.Builder\n"
/// partials:
///   validationImports: "import jakarta.validation.Valid;"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomizationDocument {
	/// Template file name. Defaults to the document's file name without its
	/// format extension.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub template: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	/// Gate for the whole document.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conditions: Option<ConditionSet>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub replacements: Vec<Replacement>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub insertions: Vec<Insertion>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub smart_insertions: Vec<SmartInsertion>,
	/// Named snippets written beside the patched templates so the generator
	/// can resolve `{{>name}}` references.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub partials: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

/// How [`Replacement::find`] is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementKind {
	#[default]
	String,
	Regex,
}

/// Replace every occurrence of `find` with `replace`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Replacement {
	pub find: String,
	pub replace: String,
	#[serde(default, rename = "type")]
	pub kind: ReplacementKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conditions: Option<ConditionSet>,
}

impl CustomizationDocument {
	/// Parse a document from `content` in the given format.
	pub fn parse(content: &str, format: &str, path_display: &str) -> TpatchResult<Self> {
		let rule_parse = |reason: String| {
			TpatchError::RuleParse {
				path: path_display.to_string(),
				reason,
			}
		};

		match format {
			"yaml" | "yml" => serde_yaml_ng::from_str(content).map_err(|e| rule_parse(e.to_string())),
			"json" => serde_json::from_str(content).map_err(|e| rule_parse(e.to_string())),
			"toml" => toml::from_str(content).map_err(|e| rule_parse(e.to_string())),
			other => Err(TpatchError::UnsupportedRuleFormat(other.to_string())),
		}
	}
}

#[derive(Debug, Clone)]
enum Matcher {
	Literal,
	Pattern(Regex),
}

/// A validated document bound to the template it customizes.
#[derive(Debug, Clone)]
pub struct Customization {
	pub template: String,
	/// File the document was loaded from. Empty for in-memory documents.
	pub path: PathBuf,
	pub document: CustomizationDocument,
	matchers: Vec<Matcher>,
}

impl Customization {
	/// Validate `document` and bind it to `template`.
	///
	/// All shape problems are reported here, before any template is touched.
	pub fn new(
		template: impl Into<String>,
		path: impl Into<PathBuf>,
		document: CustomizationDocument,
		strict: bool,
	) -> TpatchResult<Self> {
		let template = template.into();
		let path = path.into();
		let root = path.display().to_string();
		let root = if root.is_empty() { template.clone() } else { root };

		check_relative_name(&template, &format!("{root}:template"))?;
		for name in document.partials.keys() {
			check_relative_name(name, &format!("{root}:partials.{name}"))?;
		}

		if let Some(conditions) = &document.conditions {
			conditions.validate(&format!("{root}:conditions"), strict)?;
		}

		let mut matchers = Vec::with_capacity(document.replacements.len());
		for (index, replacement) in document.replacements.iter().enumerate() {
			let location = format!("{root}:replacements[{index}]");
			if replacement.find.is_empty() {
				return Err(TpatchError::InvalidDirective {
					location,
					reason: "`find` is empty".to_string(),
				});
			}
			if let Some(conditions) = &replacement.conditions {
				conditions.validate(&format!("{location}.conditions"), strict)?;
			}
			let matcher = match replacement.kind {
				ReplacementKind::String => Matcher::Literal,
				ReplacementKind::Regex => {
					Matcher::Pattern(Regex::new(&replacement.find).map_err(|e| {
						TpatchError::InvalidRegex {
							location: location.clone(),
							pattern: replacement.find.clone(),
							reason: e.to_string(),
						}
					})?)
				}
			};
			matchers.push(matcher);
		}

		for (index, insertion) in document.insertions.iter().enumerate() {
			insertion.validate(&format!("{root}:insertions[{index}]"), strict)?;
		}

		for (index, smart) in document.smart_insertions.iter().enumerate() {
			smart.validate(&format!("{root}:smartInsertions[{index}]"), strict)?;
		}

		Ok(Self {
			template,
			path,
			document,
			matchers,
		})
	}

	/// Load and validate a document from disk.
	pub fn load(path: &Path, strict: bool) -> TpatchResult<Self> {
		let content = std::fs::read_to_string(path)?;
		let format = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();
		let document =
			CustomizationDocument::parse(&content, &format, &path.display().to_string())?;
		let template = match &document.template {
			Some(template) => template.clone(),
			None => default_template_name(path),
		};

		Self::new(template, path, document, strict)
	}

	/// Number of directives across all three lists.
	pub fn directive_count(&self) -> usize {
		self.document.replacements.len()
			+ self.document.insertions.len()
			+ self.document.smart_insertions.len()
	}
}

/// Template and partial names are joined onto the templates and output
/// directories, so they must stay inside them.
fn check_relative_name(name: &str, location: &str) -> TpatchResult<()> {
	let path = Path::new(name);
	let escapes = path
		.components()
		.any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

	if name.is_empty() || path.is_absolute() || escapes {
		return Err(TpatchError::InvalidDirective {
			location: location.to_string(),
			reason: format!("`{name}` must be a relative path without `..` components"),
		});
	}

	Ok(())
}

/// Template name implied by a document path: the file name without its
/// format extension, e.g. `pojo.mustache.yaml` → `pojo.mustache`.
pub fn default_template_name(path: &Path) -> String {
	path.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.unwrap_or_default()
}

/// Outcome of one directive within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveReport {
	/// Directive label such as `insertions[2]` or the smart insertion's
	/// `semantic` name.
	pub directive: String,
	pub applied: bool,
	pub attempts: Vec<Attempt>,
}

/// Outcome of applying a whole document to a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomizationReport {
	pub template: String,
	/// The patched text. Equal to the input when nothing applied.
	pub text: String,
	/// Whether the document-level conditions failed and nothing ran.
	pub skipped: bool,
	/// Why the document-level conditions failed.
	pub gate_failure: Option<ConditionFailure>,
	pub directives: Vec<DirectiveReport>,
}

impl CustomizationReport {
	pub fn applied_count(&self) -> usize {
		self.directives.iter().filter(|d| d.applied).count()
	}

	pub fn skipped_directives(&self) -> impl Iterator<Item = &DirectiveReport> {
		self.directives.iter().filter(|d| !d.applied)
	}
}

/// Apply every directive of `customization` to `template`.
///
/// Conditions are evaluated against the original template text, so every
/// directive in the document sees the same snapshot. Patterns are located in
/// the text as patched by the preceding directives.
pub fn apply_customization(
	template: &str,
	customization: &Customization,
	environment: &GeneratorEnvironment,
) -> TpatchResult<CustomizationReport> {
	let context = environment.for_template(template);
	let document = &customization.document;
	let name = customization.template.as_str();

	let gate = evaluate_detailed(
		document.conditions.as_ref(),
		&context,
		&DiagnosticScope::new(name, "conditions"),
	);
	if !gate.satisfied {
		tracing::info!(template = name, "customization conditions not met, template left unchanged");
		return Ok(CustomizationReport {
			template: name.to_string(),
			text: template.to_string(),
			skipped: true,
			gate_failure: gate.failure,
			directives: Vec::new(),
		});
	}

	let mut text = template.to_string();
	let mut directives = Vec::with_capacity(customization.directive_count());

	for (index, (replacement, matcher)) in document
		.replacements
		.iter()
		.zip(&customization.matchers)
		.enumerate()
	{
		let label = format!("replacements[{index}]");
		let scope = DiagnosticScope::new(name, &label);
		let evaluation = evaluate_detailed(replacement.conditions.as_ref(), &context, &scope);
		let attempt = if !evaluation.satisfied {
			Attempt::ConditionsFailed {
				depth: 0,
				failure: evaluation.failure,
			}
		} else if let Some(replaced) = replace_all(&text, replacement, matcher) {
			text = replaced;
			Attempt::Applied {
				depth: 0,
				anchor: format!("replace {:?}", replacement.find),
			}
		} else {
			Attempt::PatternMissing {
				depth: 0,
				anchor: format!("replace {:?}", replacement.find),
			}
		};

		directives.push(DirectiveReport {
			directive: label,
			applied: matches!(attempt, Attempt::Applied { .. }),
			attempts: vec![attempt],
		});
	}

	for (index, insertion) in document.insertions.iter().enumerate() {
		let label = format!("insertions[{index}]");
		let resolution =
			apply_insertion(&text, insertion, &context, &DiagnosticScope::new(name, &label))?;
		text = resolution.text;
		directives.push(DirectiveReport {
			directive: label,
			applied: resolution.applied,
			attempts: resolution.attempts,
		});
	}

	for (index, smart) in document.smart_insertions.iter().enumerate() {
		let label = match &smart.semantic {
			Some(semantic) => semantic.clone(),
			None => format!("smartInsertions[{index}]"),
		};
		let resolution =
			apply_smart_insertion(&text, smart, &context, &DiagnosticScope::new(name, &label))?;
		text = resolution.text;
		directives.push(DirectiveReport {
			directive: label,
			applied: resolution.applied,
			attempts: resolution.attempts,
		});
	}

	Ok(CustomizationReport {
		template: name.to_string(),
		text,
		skipped: false,
		gate_failure: None,
		directives,
	})
}

fn replace_all(text: &str, replacement: &Replacement, matcher: &Matcher) -> Option<String> {
	match matcher {
		Matcher::Literal => {
			text.contains(&replacement.find)
				.then(|| text.replace(&replacement.find, &replacement.replace))
		}
		Matcher::Pattern(regex) => {
			regex
				.is_match(text)
				.then(|| regex.replace_all(text, replacement.replace.as_str()).into_owned())
		}
	}
}
