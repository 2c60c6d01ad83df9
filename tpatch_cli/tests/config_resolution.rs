mod common;

use rstest::rstest;
use tpatch_core::AnyEmptyResult;

#[rstest]
#[case::dot_file(".tpatch.toml")]
#[case::config_dir(".config/tpatch.toml")]
#[case::root_file("tpatch.toml")]
fn validate_resolves_config_candidate(#[case] candidate: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), candidate, "generator_version = \"7.0.0\"\n")?;

	common::tpatch_cmd()
		.arg("validate")
		.arg("--verbose")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(format!("Config: {candidate}")))
		.stdout(predicates::str::contains("Generator: (unnamed) 7.0.0"));

	Ok(())
}

#[test]
fn validate_prefers_tpatch_toml_over_other_candidates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "tpatch.toml", "generator = \"spring\"\n")?;
	common::write_file(tmp.path(), ".tpatch.toml", "generator = \"kotlin\"\n")?;
	common::write_file(tmp.path(), ".config/tpatch.toml", "generator = \"go\"\n")?;

	common::tpatch_cmd()
		.arg("validate")
		.arg("--verbose")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config: tpatch.toml"))
		.stdout(predicates::str::contains("Generator: spring (unknown version)"));

	Ok(())
}

#[test]
fn cli_generator_version_overrides_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "tpatch.toml", "generator_version = \"6.0.0\"\n")?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{generatorVersion: \">=7.0.0\"}")
		.arg("--generator-version")
		.arg("7.2.0")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("true\n");

	Ok(())
}
