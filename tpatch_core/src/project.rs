use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use rayon::prelude::*;

use crate::ConfigOverrides;
use crate::Customization;
use crate::CustomizationReport;
use crate::GeneratorEnvironment;
use crate::TpatchConfig;
use crate::TpatchError;
use crate::TpatchResult;
use crate::apply_customization;
use crate::customization::CUSTOMIZATION_EXTENSIONS;

/// Supplies the original text of generator templates.
pub trait TemplateSource: Sync {
	/// Load the template called `name`. Returns `None` when it does not
	/// exist.
	fn load_template(&self, name: &str) -> TpatchResult<Option<String>>;
}

/// Reads original templates from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateSource {
	root: PathBuf,
}

impl DirectoryTemplateSource {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}
}

impl TemplateSource for DirectoryTemplateSource {
	fn load_template(&self, name: &str) -> TpatchResult<Option<String>> {
		match std::fs::read_to_string(self.root.join(name)) {
			Ok(content) => Ok(Some(normalize_line_endings(&content))),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}
}

/// In-memory templates keyed by name.
impl TemplateSource for BTreeMap<String, String> {
	fn load_template(&self, name: &str) -> TpatchResult<Option<String>> {
		Ok(self.get(name).cloned())
	}
}

/// A loaded project: config, evaluation environment and validated
/// customization documents sorted by template name.
#[derive(Debug)]
pub struct ProjectContext {
	pub root: PathBuf,
	pub config: TpatchConfig,
	pub environment: GeneratorEnvironment,
	pub customizations: Vec<Customization>,
}

impl ProjectContext {
	pub fn templates_dir(&self) -> PathBuf {
		self.root.join(&self.config.templates)
	}

	pub fn customizations_dir(&self) -> PathBuf {
		self.root.join(&self.config.customizations)
	}

	pub fn output_dir(&self) -> PathBuf {
		self.root.join(&self.config.output)
	}

	pub fn template_source(&self) -> DirectoryTemplateSource {
		DirectoryTemplateSource::new(self.templates_dir())
	}
}

/// Load the config discovered at `root`, apply `overrides`, and load and
/// validate every customization document.
pub fn load_project(root: &Path, overrides: &ConfigOverrides) -> TpatchResult<ProjectContext> {
	let mut config = TpatchConfig::load(root)?.unwrap_or_default();
	config.apply_overrides(overrides);
	let environment = config.environment();
	let customizations = load_customizations(
		&root.join(&config.customizations),
		config.generator.as_deref(),
		&config.exclude.patterns,
		config.strict,
	)?;

	tracing::debug!(
		root = %root.display(),
		customizations = customizations.len(),
		"project loaded"
	);

	Ok(ProjectContext {
		root: root.to_path_buf(),
		config,
		environment,
		customizations,
	})
}

/// Load documents placed directly in `dir` (shared) and in `dir/<generator>`
/// (generator-specific). A generator-specific document replaces the shared
/// document for the same template.
pub fn load_customizations(
	dir: &Path,
	generator: Option<&str>,
	exclude_patterns: &[String],
	strict: bool,
) -> TpatchResult<Vec<Customization>> {
	let exclude = build_exclude_matcher(dir, exclude_patterns)?;
	let mut by_template = collect_level(dir, &exclude, strict)?;

	if let Some(generator) = generator {
		for (template, customization) in collect_level(&dir.join(generator), &exclude, strict)? {
			if let Some(shared) = by_template.insert(template, customization) {
				tracing::debug!(
					template = %shared.template,
					shared = %shared.path.display(),
					"shared customization overridden by generator-specific document"
				);
			}
		}
	}

	Ok(by_template.into_values().collect())
}

fn collect_level(
	dir: &Path,
	exclude: &Gitignore,
	strict: bool,
) -> TpatchResult<BTreeMap<String, Customization>> {
	let mut by_template: BTreeMap<String, Customization> = BTreeMap::new();

	for path in collect_files(dir, exclude)? {
		let customization = Customization::load(&path, strict)?;
		if let Some(existing) = by_template.get(&customization.template) {
			return Err(TpatchError::DuplicateCustomization {
				template: customization.template.clone(),
				first_file: existing.path.display().to_string(),
				second_file: customization.path.display().to_string(),
			});
		}
		by_template.insert(customization.template.clone(), customization);
	}

	Ok(by_template)
}

/// Customization document files directly inside `dir`, sorted.
fn collect_files(dir: &Path, exclude: &Gitignore) -> TpatchResult<Vec<PathBuf>> {
	if !dir.is_dir() {
		return Ok(Vec::new());
	}

	let mut files = Vec::new();
	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		if !path.is_file() || !is_customization_file(&path) {
			continue;
		}
		if exclude.matched_path_or_any_parents(&path, false).is_ignore() {
			continue;
		}
		files.push(path);
	}

	// Sort for deterministic ordering.
	files.sort();
	Ok(files)
}

/// Check if a file has a customization document extension.
pub fn is_customization_file(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|ext| CUSTOMIZATION_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Build a `Gitignore` matcher from `[exclude]` patterns, relative to the
/// customizations directory.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> TpatchResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			TpatchError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| TpatchError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

/// Normalize CRLF line endings to LF.
pub fn normalize_line_endings(content: &str) -> String {
	if content.contains('\r') {
		content.replace("\r\n", "\n").replace('\r', "\n")
	} else {
		content.to_string()
	}
}

/// Result of customizing one template.
#[derive(Debug)]
pub struct TemplateOutcome {
	pub template: String,
	/// Document the customization came from.
	pub source: PathBuf,
	pub original: Option<String>,
	pub result: TpatchResult<CustomizationReport>,
}

impl TemplateOutcome {
	/// The patched text, when it differs from the original.
	pub fn changed_text(&self) -> Option<&str> {
		let report = self.result.as_ref().ok()?;
		(self.original.as_deref() != Some(report.text.as_str())).then_some(report.text.as_str())
	}
}

/// Result of customizing every template in a project.
#[derive(Debug)]
pub struct ApplyOutcome {
	/// One entry per customization document, sorted by template name.
	pub templates: Vec<TemplateOutcome>,
	/// Partials contributed by documents whose conditions held.
	pub partials: BTreeMap<String, String>,
}

impl ApplyOutcome {
	pub fn errors(&self) -> impl Iterator<Item = (&str, &TpatchError)> {
		self.templates.iter().filter_map(|outcome| {
			outcome
				.result
				.as_ref()
				.err()
				.map(|error| (outcome.template.as_str(), error))
		})
	}

	pub fn has_errors(&self) -> bool {
		self.errors().next().is_some()
	}

	pub fn changed_count(&self) -> usize {
		self.templates
			.iter()
			.filter(|outcome| outcome.changed_text().is_some())
			.count()
	}
}

/// Customize every template in parallel. A failure for one template is
/// recorded in its [`TemplateOutcome`] and does not affect the others.
pub fn apply_project<S>(ctx: &ProjectContext, source: &S) -> ApplyOutcome
where
	S: TemplateSource + ?Sized,
{
	apply_all(&ctx.customizations, &ctx.environment, source)
}

/// Customize each template named by `customizations`, loading originals from
/// `source`.
pub fn apply_all<S>(
	customizations: &[Customization],
	environment: &GeneratorEnvironment,
	source: &S,
) -> ApplyOutcome
where
	S: TemplateSource + ?Sized,
{
	let templates: Vec<TemplateOutcome> = customizations
		.par_iter()
		.map(|customization| {
			let original = source.load_template(&customization.template);
			let (original, result) = match original {
				Ok(Some(text)) => {
					let result = apply_customization(&text, customization, environment);
					(Some(text), result)
				}
				Ok(None) => {
					(
						None,
						Err(TpatchError::TemplateNotFound(customization.template.clone())),
					)
				}
				Err(error) => (None, Err(error)),
			};

			TemplateOutcome {
				template: customization.template.clone(),
				source: customization.path.clone(),
				original,
				result,
			}
		})
		.collect();

	for outcome in &templates {
		if let Err(error) = &outcome.result {
			tracing::warn!(template = %outcome.template, %error, "template not customized");
		}
	}

	let mut partials = BTreeMap::new();
	for (outcome, customization) in templates.iter().zip(customizations) {
		let Ok(report) = &outcome.result else {
			continue;
		};
		if report.skipped {
			continue;
		}
		for (name, content) in &customization.document.partials {
			if partials.contains_key(name) {
				tracing::warn!(
					partial = %name,
					template = %customization.template,
					"partial already defined by another customization, keeping the first"
				);
				continue;
			}
			partials.insert(name.clone(), content.clone());
		}
	}

	ApplyOutcome {
		templates,
		partials,
	}
}

/// File name a partial is written to.
pub fn partial_file_name(name: &str) -> String {
	format!("{name}.mustache")
}

/// Write changed templates and all partials into `output_dir`. Returns the
/// paths written.
pub fn write_outcome(outcome: &ApplyOutcome, output_dir: &Path) -> TpatchResult<Vec<PathBuf>> {
	let mut written = Vec::new();
	std::fs::create_dir_all(output_dir)?;

	for template in &outcome.templates {
		let Some(text) = template.changed_text() else {
			continue;
		};
		let path = output_dir.join(&template.template);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, text)?;
		written.push(path);
	}

	for (name, content) in &outcome.partials {
		let path = output_dir.join(partial_file_name(name));
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, content)?;
		written.push(path);
	}

	Ok(written)
}
