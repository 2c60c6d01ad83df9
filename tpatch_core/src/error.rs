use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TpatchError {
	#[error(transparent)]
	#[diagnostic(code(tpatch::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(tpatch::config_parse),
		help("check that tpatch.toml is valid TOML with `generator_version`, `features` and a `[properties]` table")
	)]
	ConfigParse(String),

	#[error("failed to parse customization `{path}`: {reason}")]
	#[diagnostic(code(tpatch::rule_parse))]
	RuleParse { path: String, reason: String },

	#[error("unsupported customization format: `{0}`")]
	#[diagnostic(
		code(tpatch::unsupported_format),
		help("supported formats: yaml, yml, json, toml")
	)]
	UnsupportedRuleFormat(String),

	#[error("invalid directive at `{location}`: {reason}")]
	#[diagnostic(
		code(tpatch::invalid_directive),
		help("each insertion needs exactly one of `after`, `before` or `at`")
	)]
	InvalidDirective { location: String, reason: String },

	#[error("ambiguous condition at `{location}`: {modes} are all set")]
	#[diagnostic(
		code(tpatch::ambiguous_condition),
		help(
			"only the highest precedence mode is evaluated (allOf > anyOf > not > leaves); split \
			 the node or nest it inside `allOf`"
		)
	)]
	AmbiguousCondition { location: String, modes: String },

	#[error("invalid regex `{pattern}` at `{location}`: {reason}")]
	#[diagnostic(code(tpatch::invalid_regex))]
	InvalidRegex {
		location: String,
		pattern: String,
		reason: String,
	},

	#[error("duplicate customization for template `{template}`: defined in `{first_file}` and `{second_file}`")]
	#[diagnostic(
		code(tpatch::duplicate_customization),
		help("each template can be customized by one shared and one generator-specific document")
	)]
	DuplicateCustomization {
		template: String,
		first_file: String,
		second_file: String,
	},

	#[error("original template not found: `{0}`")]
	#[diagnostic(
		code(tpatch::template_not_found),
		help("copy the generator's original template into the templates directory")
	)]
	TemplateNotFound(String),
}

pub type TpatchResult<T> = Result<T, TpatchError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
