use std::cmp::Ordering;
use std::fmt;

use semver::Version;

/// Comparison operator prefix of a `generatorVersion` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOperator {
	/// No prefix.
	Eq,
	Gt,
	Ge,
	Lt,
	Le,
	/// `~>`: same major and minor, at least the given version.
	Pessimistic,
	/// `^`: same major, at least the given version.
	Caret,
}

impl VersionOperator {
	pub fn symbol(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::Gt => ">",
			Self::Ge => ">=",
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Pessimistic => "~>",
			Self::Caret => "^",
		}
	}

	fn accepts(self, ordering: Ordering) -> bool {
		match self {
			Self::Eq => ordering == Ordering::Equal,
			Self::Gt => ordering == Ordering::Greater,
			Self::Ge | Self::Pessimistic | Self::Caret => ordering != Ordering::Less,
			Self::Lt => ordering == Ordering::Less,
			Self::Le => ordering != Ordering::Greater,
		}
	}
}

impl fmt::Display for VersionOperator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.symbol())
	}
}

// Two character prefixes must be tried before their one character prefixes.
const OPERATOR_PREFIXES: [(&str, VersionOperator); 6] = [
	(">=", VersionOperator::Ge),
	("<=", VersionOperator::Le),
	("~>", VersionOperator::Pessimistic),
	(">", VersionOperator::Gt),
	("<", VersionOperator::Lt),
	("^", VersionOperator::Caret),
];

const QUALIFIER_SUFFIXES: [&str; 4] = [".release", ".final", ".ga", "-snapshot"];

/// Split a constraint into its operator and comparison version.
pub fn parse_constraint(constraint: &str) -> (VersionOperator, &str) {
	let constraint = constraint.trim();
	for (prefix, operator) in OPERATOR_PREFIXES {
		if let Some(rest) = constraint.strip_prefix(prefix) {
			return (operator, rest.trim());
		}
	}

	(VersionOperator::Eq, constraint)
}

/// Strip the noise generator versions commonly carry so they can be parsed
/// as semantic versions: surrounding whitespace, a leading `v`, build
/// metadata, `.RELEASE`/`.Final`/`.GA` qualifiers and a `-SNAPSHOT` suffix.
/// A bare `major` or `major.minor` is padded with zero components.
pub fn normalize_version(raw: &str) -> String {
	let mut version = raw.trim();

	if let Some(rest) = version
		.strip_prefix(['v', 'V'])
		.filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
	{
		version = rest;
	}

	if let Some((head, _build)) = version.split_once('+') {
		version = head;
	}

	for suffix in QUALIFIER_SUFFIXES {
		if let Some(head) = strip_suffix_ignore_ascii_case(version, suffix) {
			version = head;
		}
	}

	let components: Vec<&str> = version.split('.').collect();
	let numeric = components
		.iter()
		.all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
	if numeric {
		match components.len() {
			1 => return format!("{version}.0.0"),
			2 => return format!("{version}.0"),
			_ => {}
		}
	}

	version.to_string()
}

fn strip_suffix_ignore_ascii_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
	let split = value.len().checked_sub(suffix.len())?;
	if !value.is_char_boundary(split) {
		return None;
	}

	let (head, tail) = value.split_at(split);
	tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Check `actual` against a `generatorVersion` constraint.
///
/// Both sides are compared as semantic versions when they parse, and as
/// case-insensitive strings otherwise. `~>` and `^` have no meaning for
/// strings and never match in that case. Malformed input yields `false` and a
/// warning rather than an error.
pub fn evaluate_version_constraint(constraint: &str, actual: &str) -> bool {
	let (operator, expected) = parse_constraint(constraint);
	if expected.is_empty() {
		tracing::warn!(constraint, "version constraint has no version to compare against");
		return false;
	}

	let expected = normalize_version(expected);
	let actual = normalize_version(actual);
	if actual.is_empty() {
		tracing::warn!(constraint, "generator version is empty");
		return false;
	}

	match (Version::parse(&actual), Version::parse(&expected)) {
		(Ok(actual), Ok(expected)) => compare_semantic(operator, &actual, &expected),
		(actual_result, expected_result) => {
			tracing::debug!(
				constraint,
				actual = actual.as_str(),
				actual_error = ?actual_result.err(),
				expected_error = ?expected_result.err(),
				"not a semantic version, comparing as strings"
			);
			compare_lexical(operator, &actual, &expected)
		}
	}
}

fn compare_semantic(operator: VersionOperator, actual: &Version, expected: &Version) -> bool {
	let same_line = match operator {
		VersionOperator::Pessimistic => {
			actual.major == expected.major && actual.minor == expected.minor
		}
		VersionOperator::Caret => actual.major == expected.major,
		_ => true,
	};

	same_line && operator.accepts(actual.cmp(expected))
}

fn compare_lexical(operator: VersionOperator, actual: &str, expected: &str) -> bool {
	if matches!(
		operator,
		VersionOperator::Pessimistic | VersionOperator::Caret
	) {
		tracing::warn!(
			operator = operator.symbol(),
			actual,
			expected,
			"operator requires semantic versions"
		);
		return false;
	}

	let ordering = actual
		.to_ascii_lowercase()
		.cmp(&expected.to_ascii_lowercase());
	operator.accepts(ordering)
}
