use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tpatch_cli::Commands;
use tpatch_cli::ListOutputFormat;
use tpatch_cli::TpatchCli;
use tpatch_core::ConditionSet;
use tpatch_core::ConfigOverrides;
use tpatch_core::DiagnosticScope;
use tpatch_core::TemplateOutcome;
use tpatch_core::TpatchConfig;
use tpatch_core::TpatchError;
use tpatch_core::evaluate_detailed;
use tpatch_core::project::ProjectContext;
use tpatch_core::project::TemplateSource;
use tpatch_core::project::apply_project;
use tpatch_core::project::load_project;
use tpatch_core::project::write_outcome;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "TPATCH_LOG";

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TpatchCli::parse();

	// Respect NO_COLOR env var, --no-color flag and terminals without color.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_logging(args.verbose, use_color);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Apply { dry_run, diff }) => run_apply(&args, *dry_run, *diff),
		Some(Commands::Validate) => run_validate(&args),
		Some(Commands::List { format }) => run_list(&args, *format),
		Some(Commands::Eval {
			condition,
			template,
		}) => run_eval(&args, condition, template.as_deref()),
		None => {
			eprintln!("No subcommand specified. Run `tpatch --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<TpatchError>() {
			Ok(tpatch_err) => {
				let report: miette::Report = (*tpatch_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `TPATCH_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool, use_color: bool) {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("tpatch_core=debug")
		} else {
			EnvFilter::new("tpatch_core=warn")
		}
	});

	tracing_subscriber::registry()
		.with(
			fmt::layer()
				.with_writer(std::io::stderr)
				.with_ansi(use_color)
				.with_target(false)
				.without_time(),
		)
		.with(filter)
		.init();
}

fn resolve_root(args: &TpatchCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn config_overrides(args: &TpatchCli) -> ConfigOverrides {
	ConfigOverrides {
		generator_version: args.generator_version.clone(),
		features: args.features.clone(),
		properties: args.properties.clone(),
		strict: args.strict.then_some(true),
	}
}

fn load_and_report(args: &TpatchCli) -> Result<ProjectContext, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let ctx = load_project(&root, &config_overrides(args))?;

	if args.verbose {
		let config_path = TpatchConfig::resolve_path(&root)
			.map_or_else(|| "(defaults)".to_string(), |path| make_relative(&path, &root));
		println!("Config: {config_path}");
		println!(
			"Generator: {} {}",
			ctx.environment.generator().unwrap_or("(unnamed)"),
			ctx.environment.version().unwrap_or("(unknown version)")
		);
		if !ctx.environment.features().is_empty() {
			let features: Vec<&str> = ctx.environment.features().iter().map(String::as_str).collect();
			println!("Features: {}", features.join(", "));
		}
		println!(
			"Loaded {} customization document(s)",
			ctx.customizations.len()
		);
	}

	Ok(ctx)
}

fn run_apply(
	args: &TpatchCli,
	dry_run: bool,
	show_diff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load_and_report(args)?;
	let source = ctx.template_source();
	let outcome = apply_project(&ctx, &source);

	for template in &outcome.templates {
		print_template_outcome(template, &ctx.root, args.verbose);

		if show_diff {
			if let (Some(original), Some(patched)) =
				(template.original.as_deref(), template.changed_text())
			{
				print_diff(original, patched);
			}
		}
	}

	let output_dir = ctx.output_dir();
	let output_display = make_relative(&output_dir, &ctx.root);
	let changed = outcome.changed_count();
	let partials = outcome.partials.len();

	if dry_run {
		println!(
			"Dry run: {changed} template(s) and {partials} partial(s) would be written to \
			 {output_display}"
		);
	} else {
		let written = write_outcome(&outcome, &output_dir)?;
		println!(
			"{} {} file(s) to {output_display}",
			colored!("Wrote", green),
			written.len()
		);
	}

	let failures = outcome.errors().count();
	if failures > 0 {
		eprintln!(
			"{} {failures} template(s) could not be customized",
			colored!("error:", red)
		);
		process::exit(1);
	}

	Ok(())
}

fn print_template_outcome(template: &TemplateOutcome, root: &Path, verbose: bool) {
	let name = colored!(template.template.as_str(), bold);
	let report = match &template.result {
		Ok(report) => report,
		Err(error) => {
			eprintln!("{} {name}: {error}", colored!("error:", red));
			return;
		}
	};

	if report.skipped {
		let reason = report
			.gate_failure
			.as_ref()
			.map(ToString::to_string)
			.unwrap_or_default();
		println!("{} {name} (conditions not met: {reason})", colored!("skip", yellow));
		return;
	}

	let total = report.directives.len();
	let applied = report.applied_count();
	let status = if template.changed_text().is_some() {
		colored!("patch", green)
	} else {
		colored!("same ", yellow)
	};
	println!(
		"{status} {name} ({applied}/{total} directive(s) applied, {})",
		make_relative(&template.source, root)
	);

	if verbose {
		for directive in report.skipped_directives() {
			println!("    {} skipped", directive.directive);
			for attempt in &directive.attempts {
				println!("      {attempt}");
			}
		}
	}
}

fn run_validate(args: &TpatchCli) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load_and_report(args)?;

	let directives: usize = ctx
		.customizations
		.iter()
		.map(tpatch_core::Customization::directive_count)
		.sum();
	println!(
		"{} {} customization document(s) with {directives} directive(s)",
		colored!("Valid:", green),
		ctx.customizations.len()
	);

	Ok(())
}

fn run_list(args: &TpatchCli, format: ListOutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load_and_report(args)?;

	match format {
		ListOutputFormat::Json => {
			let entries: Vec<serde_json::Value> = ctx
				.customizations
				.iter()
				.map(|customization| {
					let document = &customization.document;
					serde_json::json!({
						"template": customization.template,
						"file": make_relative(&customization.path, &ctx.root),
						"conditional": document.conditions.is_some(),
						"replacements": document.replacements.len(),
						"insertions": document.insertions.len(),
						"smartInsertions": document.smart_insertions.len(),
						"partials": document.partials.keys().collect::<Vec<_>>(),
					})
				})
				.collect();
			let output = serde_json::json!({ "customizations": entries });
			println!("{output}");
		}
		ListOutputFormat::Text => {
			if ctx.customizations.is_empty() {
				println!("No customization documents found.");
				return Ok(());
			}

			println!(
				"{}",
				colored!(
					format!("Customizations ({}):", ctx.customizations.len()),
					bold
				)
			);
			for customization in &ctx.customizations {
				let document = &customization.document;
				println!(
					"  {} ({})",
					customization.template,
					make_relative(&customization.path, &ctx.root)
				);
				println!(
					"    {} replacement(s), {} insertion(s), {} smart insertion(s), {} partial(s)",
					document.replacements.len(),
					document.insertions.len(),
					document.smart_insertions.len(),
					document.partials.len()
				);
			}
		}
	}

	Ok(())
}

fn run_eval(
	args: &TpatchCli,
	condition: &str,
	template: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut config = TpatchConfig::load(&root)?.unwrap_or_default();
	config.apply_overrides(&config_overrides(args));

	let conditions: ConditionSet =
		serde_yaml_ng::from_str(condition).map_err(|e| {
			TpatchError::RuleParse {
				path: "<condition>".to_string(),
				reason: e.to_string(),
			}
		})?;
	conditions.validate("<condition>", config.strict)?;

	let text = match template {
		Some(name) => {
			tpatch_core::project::DirectoryTemplateSource::new(root.join(&config.templates))
				.load_template(name)?
				.ok_or_else(|| TpatchError::TemplateNotFound(name.to_string()))?
		}
		None => String::new(),
	};

	let environment = config.environment();
	let context = environment.for_template(&text);
	let evaluation = evaluate_detailed(
		Some(&conditions),
		&context,
		&DiagnosticScope::new(template.unwrap_or("<none>"), "eval"),
	);

	if evaluation.satisfied {
		println!("{}", colored!("true", green));
		return Ok(());
	}

	println!("{}", colored!("false", red));
	if let Some(failure) = evaluation.failure {
		println!("  {failure}");
	}
	process::exit(1);
}

/// Print a unified diff between two strings, colorized.
fn print_diff(original: &str, patched: &str) {
	let diff = TextDiff::from_lines(original, patched);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				print!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				print!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
