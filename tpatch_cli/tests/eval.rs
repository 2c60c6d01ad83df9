mod common;

use rstest::rstest;
use tpatch_core::AnyEmptyResult;

#[rstest]
#[case::satisfied_version(r#"{generatorVersion: ">=7.0.0"}"#, "7.1.0", true)]
#[case::unsatisfied_version(r#"{generatorVersion: ">=7.0.0"}"#, "6.2.1", false)]
#[case::pessimistic(r#"{generatorVersion: "~>7.1.0"}"#, "7.1.9", true)]
#[case::caret_major_bump(r#"{generatorVersion: "^7.0.0"}"#, "8.0.0", false)]
#[case::negated(r#"{not: {generatorVersion: "<7.0.0"}}"#, "7.0.0", true)]
fn eval_version_conditions(
	#[case] condition: &str,
	#[case] version: &str,
	#[case] expected: bool,
) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let assert = common::tpatch_cmd()
		.arg("eval")
		.arg(condition)
		.arg("--generator-version")
		.arg(version)
		.arg("--path")
		.arg(tmp.path())
		.assert();

	if expected {
		assert.success().stdout("true\n");
	} else {
		assert
			.code(1)
			.stdout(predicates::str::starts_with("false\n"));
	}

	Ok(())
}

#[test]
fn eval_prints_failing_predicate() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{allOf: [{hasFeature: a}, {hasFeature: b}]}")
		.arg("--feature")
		.arg("a")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout("false\n  allOf[1]: `hasFeature: \"b\"` does not hold\n");

	Ok(())
}

#[test]
fn eval_uses_configured_properties() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"tpatch.toml",
		"[properties]\nbuildType = \"release\"\n",
	)?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{buildType: release}")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("true\n");

	Ok(())
}

#[test]
fn eval_property_flag_overrides_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"tpatch.toml",
		"[properties]\nbuildType = \"release\"\n",
	)?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{allOf: [{buildType: debug}, {projectProperty: apiPackage}]}")
		.arg("--property")
		.arg("buildType=debug")
		.arg("--property")
		.arg("apiPackage=org.acme.api")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("true\n");

	Ok(())
}

#[test]
fn eval_rejects_malformed_property() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{buildType: debug}")
		.arg("--property")
		.arg("buildType")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.failure()
		.stderr(predicates::str::contains("expected `NAME=VALUE`"));

	Ok(())
}

#[test]
fn eval_checks_template_text() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"templates/pojo.mustache",
		common::POJO_TEMPLATE,
	)?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{templateContains: \"java.util.Objects\"}")
		.arg("--template")
		.arg("pojo.mustache")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("true\n");

	common::tpatch_cmd()
		.arg("eval")
		.arg("{templateContains: \"java.util.Objects\"}")
		.arg("--template")
		.arg("missing.mustache")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tpatch::template_not_found"));

	Ok(())
}

#[test]
fn eval_rejects_malformed_condition() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{allOf: [unclosed")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tpatch::rule_parse"));

	Ok(())
}

#[test]
fn eval_unknown_generator_version_is_false() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::tpatch_cmd()
		.arg("eval")
		.arg("{generatorVersion: \">=1.0.0\"}")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::starts_with("false\n"))
		.stderr(predicates::str::contains("generator version is unknown"));

	Ok(())
}
