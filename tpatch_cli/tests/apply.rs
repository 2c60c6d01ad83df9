mod common;

use predicates::prelude::PredicateBooleanExt;
use similar_asserts::assert_eq;
use tpatch_core::AnyEmptyResult;

const CONFIG: &str = r#"
generator = "spring"
generator_version = "7.14.0"
features = ["validation"]
"#;

#[test]
fn apply_writes_patched_templates_and_partials() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), CONFIG)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("patch pojo.mustache (2/2 directive(s) applied"))
		.stdout(predicates::str::contains("Wrote 2 file(s) to build/templates"));

	let patched = std::fs::read_to_string(tmp.path().join("build/templates/pojo.mustache"))?;
	assert_eq!(
		patched,
		"import java.util.Objects;\nimport jakarta.validation.Valid;\n\n@lombok.Builder\npublic \
		 class {{classname}} {\n}\n"
	);

	let partial =
		std::fs::read_to_string(tmp.path().join("build/templates/lombokImports.mustache"))?;
	assert_eq!(partial, "import lombok.Builder;");

	// The original template is never modified.
	let original = std::fs::read_to_string(tmp.path().join("templates/pojo.mustache"))?;
	assert_eq!(original, common::POJO_TEMPLATE);

	Ok(())
}

#[test]
fn apply_dry_run_does_not_write() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), CONFIG)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Dry run: 1 template(s) and 1 partial(s) would be written to build/templates",
		));

	assert!(!tmp.path().join("build").exists());

	Ok(())
}

#[test]
fn apply_diff_shows_inserted_lines() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), CONFIG)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--dry-run")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("+@lombok.Builder"))
		.stdout(predicates::str::contains("+import jakarta.validation.Valid;"));

	Ok(())
}

#[test]
fn apply_version_override_skips_version_gated_insertion() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), CONFIG)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--generator-version")
		.arg("6.6.0")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("(1/2 directive(s) applied"));

	let patched = std::fs::read_to_string(tmp.path().join("build/templates/pojo.mustache"))?;
	assert!(patched.contains("import jakarta.validation.Valid;"));
	assert!(!patched.contains("@lombok.Builder"));

	Ok(())
}

#[test]
fn apply_feature_flag_enables_feature_gated_insertion() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), "generator_version = \"7.14.0\"\n")?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	let without = std::fs::read_to_string(tmp.path().join("build/templates/pojo.mustache"))?;
	assert!(!without.contains("jakarta.validation"));

	common::tpatch_cmd()
		.arg("apply")
		.arg("--feature")
		.arg("validation")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	let with = std::fs::read_to_string(tmp.path().join("build/templates/pojo.mustache"))?;
	assert!(with.contains("import jakarta.validation.Valid;"));

	Ok(())
}

#[test]
fn apply_skips_document_when_gate_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "tpatch.toml", CONFIG)?;
	common::write_file(tmp.path(), "templates/api.mustache", "class {{classname}}Api {}\n")?;
	common::write_file(
		tmp.path(),
		"customizations/api.mustache.yaml",
		r#"
conditions:
  generatorVersion: "<7.0.0"
insertions:
  - at: start
    content: "// legacy\n"
"#,
	)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("skip api.mustache (conditions not met"))
		.stdout(predicates::str::contains("Wrote 0 file(s)"));

	assert!(!tmp.path().join("build/templates/api.mustache").exists());

	Ok(())
}

#[test]
fn apply_generator_specific_document_overrides_shared() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), CONFIG)?;
	common::write_file(
		tmp.path(),
		"customizations/spring/pojo.mustache.yaml",
		r#"
insertions:
  - at: end
    content: "// spring\n"
"#,
	)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let patched = std::fs::read_to_string(tmp.path().join("build/templates/pojo.mustache"))?;
	assert_eq!(patched, format!("{}// spring\n", common::POJO_TEMPLATE));
	assert!(!tmp.path().join("build/templates/lombokImports.mustache").exists());

	Ok(())
}

#[test]
fn apply_reports_missing_original_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pojo_project(tmp.path(), CONFIG)?;
	common::write_file(
		tmp.path(),
		"customizations/model.mustache.yaml",
		"insertions:\n  - at: start\n    content: \"x\"\n",
	)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("original template not found: `model.mustache`"))
		.stderr(predicates::str::contains("1 template(s) could not be customized"));

	// Other templates are still written.
	assert!(tmp.path().join("build/templates/pojo.mustache").exists());

	Ok(())
}

#[test]
fn apply_verbose_lists_skipped_directive_attempts() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "tpatch.toml", CONFIG)?;
	common::write_file(tmp.path(), "templates/api.mustache", "class {{classname}}Api {}\n")?;
	common::write_file(
		tmp.path(),
		"customizations/api.mustache.yaml",
		r#"
insertions:
  - after: "missing marker"
    content: "x"
    fallback:
      before: "also missing"
      content: "y"
"#,
	)?;

	common::tpatch_cmd()
		.arg("apply")
		.arg("--verbose")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("same  api.mustache (0/1 directive(s) applied"))
		.stdout(predicates::str::contains("insertions[0] skipped"))
		.stdout(predicates::str::contains("[0] pattern not found: after \"missing marker\""))
		.stdout(predicates::str::contains("[1] pattern not found: before \"also missing\""))
		.stderr(predicates::str::contains("no alternative applied").and(
			predicates::str::contains("panicked").not(),
		));

	Ok(())
}
