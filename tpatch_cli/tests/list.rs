mod common;

use clap::Parser;
use serde_json::Value;
use tpatch_cli::Commands;
use tpatch_cli::ListOutputFormat;
use tpatch_cli::TpatchCli;
use tpatch_core::AnyEmptyResult;

#[test]
fn list_shows_documents_and_directive_counts() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), "")?;

	common::tpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Customizations (1):"))
		.stdout(predicates::str::contains(
			"pojo.mustache (customizations/pojo.mustache.yaml)",
		))
		.stdout(predicates::str::contains(
			"0 replacement(s), 1 insertion(s), 1 smart insertion(s), 1 partial(s)",
		));

	Ok(())
}

#[test]
fn list_json_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), "")?;

	let output = common::tpatch_cmd()
		.arg("list")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let json: Value = serde_json::from_slice(&output.stdout)?;
	let entries = json["customizations"]
		.as_array()
		.ok_or("customizations should be an array")?;
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0]["template"], "pojo.mustache");
	assert_eq!(entries[0]["file"], "customizations/pojo.mustache.yaml");
	assert_eq!(entries[0]["conditional"], false);
	assert_eq!(entries[0]["insertions"], 1);
	assert_eq!(entries[0]["smartInsertions"], 1);
	assert_eq!(entries[0]["partials"][0], "lombokImports");

	Ok(())
}

#[test]
fn list_empty_project() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No customization documents found."));

	Ok(())
}

#[test]
fn list_format_defaults_to_text() {
	let cli = TpatchCli::parse_from(["tpatch", "list"]);
	match cli.command {
		Some(Commands::List { format }) => {
			assert!(matches!(format, ListOutputFormat::Text));
		}
		_ => panic!("expected List command"),
	}

	let cli = TpatchCli::parse_from(["tpatch", "list", "--format", "json"]);
	match cli.command {
		Some(Commands::List { format }) => {
			assert!(matches!(format, ListOutputFormat::Json));
		}
		_ => panic!("expected List command"),
	}
}

#[test]
fn global_flags_parse_after_subcommand() {
	let cli = TpatchCli::parse_from([
		"tpatch",
		"apply",
		"--dry-run",
		"--feature",
		"validation",
		"--feature",
		"lombok",
		"--generator-version",
		"7.1.0",
	]);

	assert_eq!(cli.features, vec!["validation", "lombok"]);
	assert_eq!(cli.generator_version.as_deref(), Some("7.1.0"));
	match cli.command {
		Some(Commands::Apply { dry_run, diff }) => {
			assert!(dry_run);
			assert!(!diff);
		}
		_ => panic!("expected Apply command"),
	}
}

#[test]
fn list_text_output_snapshot() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), "")?;
	common::write_file(
		tmp.path(),
		"customizations/api.mustache.json",
		r#"{"replacements": [{"find": "Api", "replace": "Client"}]}"#,
	)?;

	let output = common::tpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let stdout = String::from_utf8(output.stdout)?;
	insta::assert_snapshot!(stdout.trim_end(), @r"
	Customizations (2):
	  api.mustache (customizations/api.mustache.json)
	    1 replacement(s), 0 insertion(s), 0 smart insertion(s), 0 partial(s)
	  pojo.mustache (customizations/pojo.mustache.yaml)
	    0 replacement(s), 1 insertion(s), 1 smart insertion(s), 1 partial(s)
	");

	Ok(())
}
