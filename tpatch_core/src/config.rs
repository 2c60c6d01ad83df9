use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::GeneratorEnvironment;
use crate::TpatchError;
use crate::TpatchResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["tpatch.toml", ".tpatch.toml", ".config/tpatch.toml"];

pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_CUSTOMIZATIONS_DIR: &str = "customizations";
pub const DEFAULT_OUTPUT_DIR: &str = "build/templates";

/// Configuration loaded from a `tpatch.toml` file.
///
/// ```toml
/// generator = "spring"
/// generator_version = "7.14.0"
/// templates = "templates"
/// customizations = "customizations"
/// output = "build/templates"
/// features = ["validation", "lombok"]
/// strict = false
///
/// [properties]
/// buildType = "release"
///
/// [exclude]
/// patterns = ["drafts/"]
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TpatchConfig {
	/// Generator name. Selects the `customizations/<generator>/` directory of
	/// generator-specific documents.
	#[serde(default)]
	pub generator: Option<String>,
	/// Version of the generator in use. Without it every `generatorVersion`
	/// condition fails.
	#[serde(default)]
	pub generator_version: Option<String>,
	/// Directory holding the original templates.
	#[serde(default = "default_templates_dir")]
	pub templates: PathBuf,
	/// Directory holding customization documents.
	#[serde(default = "default_customizations_dir")]
	pub customizations: PathBuf,
	/// Directory patched templates and partials are written to.
	#[serde(default = "default_output_dir")]
	pub output: PathBuf,
	/// Feature flags visible to `hasFeature` conditions.
	#[serde(default)]
	pub features: Vec<String>,
	/// Project properties visible to `projectProperty` and `buildType`
	/// conditions.
	#[serde(default)]
	pub properties: BTreeMap<String, String>,
	/// Reject condition nodes that populate more than one of `allOf`, `anyOf`,
	/// `not` and leaf fields instead of warning about them.
	#[serde(default)]
	pub strict: bool,
	#[serde(default)]
	pub exclude: ExcludeConfig,
}

impl Default for TpatchConfig {
	fn default() -> Self {
		Self {
			generator: None,
			generator_version: None,
			templates: default_templates_dir(),
			customizations: default_customizations_dir(),
			output: default_output_dir(),
			features: Vec::new(),
			properties: BTreeMap::new(),
			strict: false,
			exclude: ExcludeConfig::default(),
		}
	}
}

/// Configuration for excluding customization documents from discovery.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns relative to the customizations directory.
	///
	/// Examples: `"drafts/"`, `"*.disabled.yaml"`, `"!keep.yaml"`.
	#[serde(default)]
	pub patterns: Vec<String>,
}

fn default_templates_dir() -> PathBuf {
	PathBuf::from(DEFAULT_TEMPLATES_DIR)
}

fn default_customizations_dir() -> PathBuf {
	PathBuf::from(DEFAULT_CUSTOMIZATIONS_DIR)
}

fn default_output_dir() -> PathBuf {
	PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Values supplied on the command line that take precedence over the config
/// file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
	pub generator_version: Option<String>,
	/// Added to the configured features.
	pub features: Vec<String>,
	/// Set or replace project properties.
	pub properties: Vec<(String, String)>,
	pub strict: Option<bool>,
}

impl TpatchConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> TpatchResult<Option<TpatchConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: TpatchConfig =
			toml::from_str(&content).map_err(|e| TpatchError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	/// Fold command line overrides into this config.
	pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
		if let Some(version) = &overrides.generator_version {
			self.generator_version = Some(version.clone());
		}
		for feature in &overrides.features {
			if !self.features.contains(feature) {
				self.features.push(feature.clone());
			}
		}
		for (name, value) in &overrides.properties {
			self.properties.insert(name.clone(), value.clone());
		}
		if let Some(strict) = overrides.strict {
			self.strict = strict;
		}
	}

	/// Build the evaluation environment. The process environment is captured
	/// once, here.
	pub fn environment(&self) -> GeneratorEnvironment {
		let mut environment = GeneratorEnvironment::capture().with_features(&self.features);
		if let Some(generator) = &self.generator {
			environment = environment.with_generator(generator);
		}
		if let Some(version) = &self.generator_version {
			environment = environment.with_version(version);
		}
		for (name, value) in &self.properties {
			environment = environment.with_property(name, value);
		}
		environment
	}
}
