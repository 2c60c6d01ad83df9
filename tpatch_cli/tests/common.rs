#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const POJO_TEMPLATE: &str = "import java.util.Objects;\n\npublic class {{classname}} {\n}\n";

pub const POJO_CUSTOMIZATION: &str = r#"
metadata:
  name: pojo-extensions
  description: Validation imports and a lombok builder
insertions:
  - after: "import java.util.Objects;"
    content: "\nimport jakarta.validation.Valid;"
    conditions:
      hasFeature: validation
smartInsertions:
  - semantic: class_annotations
    findInsertionPoint:
      patterns:
        - before: "public final class"
        - before: "public class"
    content: "@lombok.Builder\n"
    conditions:
      generatorVersion: ">=7.0.0"
partials:
  lombokImports: "import lombok.Builder;"
"#;

pub fn tpatch_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("tpatch"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("TPATCH_LOG");
	cmd
}

/// Write `content` to `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> std::io::Result<()> {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}

/// A spring generator project with one template and one customization.
pub fn write_pojo_project(root: &Path, config: &str) -> std::io::Result<()> {
	write_file(root, "tpatch.toml", config)?;
	write_file(root, "templates/pojo.mustache", POJO_TEMPLATE)?;
	write_file(root, "customizations/pojo.mustache.yaml", POJO_CUSTOMIZATION)
}
