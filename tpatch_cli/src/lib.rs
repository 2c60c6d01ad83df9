use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Customize code generator templates with declarative, condition-aware rules.",
	long_about = "tpatch patches the original templates of a code generator with declarative \
	              customization documents instead of hand-maintained forks.\n\nEach document \
	              targets one template and describes when a change applies (generator version, \
	              features, project properties) and where content goes (exact patterns, \
	              semantic insertion points, fallbacks).\n\nQuick start:\n  tpatch validate  \
	              Check every customization document\n  tpatch list      Show discovered \
	              documents\n  tpatch apply     Write patched templates to the output directory"
)]
pub struct TpatchCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Generator version to evaluate `generatorVersion` conditions against.
	/// Overrides `generator_version` in `tpatch.toml`.
	#[arg(long, global = true)]
	pub generator_version: Option<String>,

	/// Enable a feature flag in addition to the configured ones. Can be
	/// repeated.
	#[arg(long = "feature", global = true)]
	pub features: Vec<String>,

	/// Set a project property as `NAME=VALUE`, replacing the configured
	/// value. Can be repeated.
	#[arg(
		long = "property",
		global = true,
		value_name = "NAME=VALUE",
		value_parser = parse_property
	)]
	pub properties: Vec<(String, String)>,

	/// Reject ambiguous condition nodes instead of warning about them.
	#[arg(long, global = true, default_value_t = false)]
	pub strict: bool,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Apply every customization document and write the patched templates.
	///
	/// Loads the original templates, evaluates each document's conditions
	/// against the configured generator version, features and properties, and
	/// writes changed templates and partials into the output directory.
	///
	/// Use `--dry-run` to preview the result without writing to disk and
	/// `--diff` to see exactly what changed in each template.
	Apply {
		/// Report what would be written without touching the output
		/// directory.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Show a unified diff between each original and patched template.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Load and validate every customization document.
	///
	/// Parses each document, compiles regex replacements and checks the shape
	/// of every condition and insertion. Exits with a non-zero status code on
	/// the first invalid document.
	Validate,
	/// List discovered customization documents.
	///
	/// Shows the template each document targets, the file it was loaded from
	/// and how many directives of each kind it declares.
	List {
		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = ListOutputFormat::Text)]
		format: ListOutputFormat,
	},
	/// Evaluate a condition set against the project environment.
	///
	/// The condition is given inline as YAML, for example
	/// `tpatch eval '{generatorVersion: ">=7.0.0"}'`. Prints whether it holds
	/// and, when it does not, the first failing predicate. Exits with status
	/// code 1 when the condition does not hold.
	Eval {
		/// Condition set in YAML (or JSON) form.
		condition: String,

		/// Template file whose text `templateContains` conditions are checked
		/// against, relative to the templates directory.
		#[arg(long)]
		template: Option<String>,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListOutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

/// Parse a `NAME=VALUE` project property.
pub fn parse_property(value: &str) -> Result<(String, String), String> {
	match value.split_once('=') {
		Some((name, value)) if !name.trim().is_empty() => {
			Ok((name.trim().to_string(), value.to_string()))
		}
		_ => Err(format!("expected `NAME=VALUE`, got `{value}`")),
	}
}
