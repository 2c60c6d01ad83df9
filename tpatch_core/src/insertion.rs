use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::ConditionSet;
use crate::TpatchError;
use crate::TpatchResult;

/// Template boundary targeted by [`Insertion::at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
	Start,
	End,
}

/// The resolved location of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor<'a> {
	/// Immediately after the first occurrence of the pattern.
	After(&'a str),
	/// Immediately before the first occurrence of the pattern.
	Before(&'a str),
	Start,
	End,
}

impl Anchor<'_> {
	/// The pattern this anchor searches for, if any.
	pub fn pattern(&self) -> Option<&str> {
		match self {
			Self::After(pattern) | Self::Before(pattern) => Some(*pattern),
			Self::Start | Self::End => None,
		}
	}
}

impl fmt::Display for Anchor<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::After(pattern) => write!(f, "after {pattern:?}"),
			Self::Before(pattern) => write!(f, "before {pattern:?}"),
			Self::Start => f.write_str("at start"),
			Self::End => f.write_str("at end"),
		}
	}
}

/// Insert `content` at an exact pattern or at a template boundary.
///
/// ```yaml
/// after: "import java.util.Objects;"
/// content: "\nimport jakarta.validation.Valid;"
/// conditions:
///   hasFeature: validation
/// fallback:
///   at: start
///   content: "{{! validation imports unavailable }}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Insertion {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub after: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub before: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub at: Option<Boundary>,
	/// Inserted verbatim. Partial references such as `{{>name}}` are left for
	/// the generator to expand.
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conditions: Option<ConditionSet>,
	/// Tried when the conditions fail or the pattern is absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fallback: Option<Box<Insertion>>,
}

impl Insertion {
	pub fn after(pattern: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			after: Some(pattern.into()),
			content: content.into(),
			..Self::default()
		}
	}

	pub fn before(pattern: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			before: Some(pattern.into()),
			content: content.into(),
			..Self::default()
		}
	}

	pub fn at(boundary: Boundary, content: impl Into<String>) -> Self {
		Self {
			at: Some(boundary),
			content: content.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
		self.conditions = Some(conditions);
		self
	}

	#[must_use]
	pub fn with_fallback(mut self, fallback: Insertion) -> Self {
		self.fallback = Some(Box::new(fallback));
		self
	}

	/// The single location this insertion targets.
	pub fn anchor(&self) -> TpatchResult<Anchor<'_>> {
		match (&self.after, &self.before, self.at) {
			(Some(pattern), None, None) => non_empty(Anchor::After(pattern)),
			(None, Some(pattern), None) => non_empty(Anchor::Before(pattern)),
			(None, None, Some(Boundary::Start)) => Ok(Anchor::Start),
			(None, None, Some(Boundary::End)) => Ok(Anchor::End),
			(None, None, None) => {
				Err(TpatchError::InvalidDirective {
					location: String::new(),
					reason: "none of `after`, `before` or `at` is set".to_string(),
				})
			}
			_ => {
				Err(TpatchError::InvalidDirective {
					location: String::new(),
					reason: "only one of `after`, `before` or `at` may be set".to_string(),
				})
			}
		}
	}

	/// Iterate over this insertion followed by its fallback chain.
	pub fn chain(&self) -> impl Iterator<Item = &Insertion> {
		std::iter::successors(Some(self), |insertion| insertion.fallback.as_deref())
	}

	/// Check the shape of this insertion and every fallback in its chain.
	pub fn validate(&self, location: &str, strict: bool) -> TpatchResult<()> {
		let mut location = location.to_string();
		for insertion in self.chain() {
			insertion
				.anchor()
				.map_err(|error| with_location(error, &location))?;
			if let Some(conditions) = &insertion.conditions {
				conditions.validate(&format!("{location}.conditions"), strict)?;
			}
			location.push_str(".fallback");
		}

		Ok(())
	}
}

/// One candidate marker for a semantic insertion point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternLocation {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub after: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub before: Option<String>,
}

impl PatternLocation {
	pub fn after(pattern: impl Into<String>) -> Self {
		Self {
			after: Some(pattern.into()),
			before: None,
		}
	}

	pub fn before(pattern: impl Into<String>) -> Self {
		Self {
			after: None,
			before: Some(pattern.into()),
		}
	}

	pub fn anchor(&self) -> TpatchResult<Anchor<'_>> {
		match (&self.after, &self.before) {
			(Some(pattern), None) => non_empty(Anchor::After(pattern)),
			(None, Some(pattern)) => non_empty(Anchor::Before(pattern)),
			(None, None) => {
				Err(TpatchError::InvalidDirective {
					location: String::new(),
					reason: "pattern location needs `after` or `before`".to_string(),
				})
			}
			(Some(_), Some(_)) => {
				Err(TpatchError::InvalidDirective {
					location: String::new(),
					reason: "pattern location may set only one of `after` or `before`".to_string(),
				})
			}
		}
	}
}

/// Ordered candidates for a [`SmartInsertion`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsertionPointSearch {
	pub patterns: Vec<PatternLocation>,
}

/// Insert `content` at a semantic insertion point found through the first
/// matching candidate pattern.
///
/// ```yaml
/// semantic: class_annotations
/// findInsertionPoint:
///   patterns:
///     - before: "public class {{classname}}"
///     - before: "public final class {{classname}}"
/// content: "@lombok.Builder\n"
/// fallback:
///   at: start
///   content: "{{! lombok builder skipped }}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SmartInsertion {
	pub find_insertion_point: InsertionPointSearch,
	/// Label of the semantic insertion point, used in diagnostics.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub semantic: Option<String>,
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conditions: Option<ConditionSet>,
	/// A plain insertion tried when the conditions fail or no candidate
	/// matches. Smart insertions cannot fall back to other smart insertions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fallback: Option<Insertion>,
}

impl SmartInsertion {
	pub fn new(patterns: Vec<PatternLocation>, content: impl Into<String>) -> Self {
		Self {
			find_insertion_point: InsertionPointSearch { patterns },
			content: content.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_semantic(mut self, semantic: impl Into<String>) -> Self {
		self.semantic = Some(semantic.into());
		self
	}

	#[must_use]
	pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
		self.conditions = Some(conditions);
		self
	}

	#[must_use]
	pub fn with_fallback(mut self, fallback: Insertion) -> Self {
		self.fallback = Some(fallback);
		self
	}

	/// The candidate patterns in declared order.
	pub fn candidates(&self) -> &[PatternLocation] {
		&self.find_insertion_point.patterns
	}

	/// The diagnostic label: `semantic` when set, otherwise `unnamed`.
	pub fn label(&self) -> &str {
		self.semantic.as_deref().unwrap_or("unnamed")
	}

	pub fn validate(&self, location: &str, strict: bool) -> TpatchResult<()> {
		if self.candidates().is_empty() {
			return Err(TpatchError::InvalidDirective {
				location: format!("{location}.findInsertionPoint.patterns"),
				reason: "at least one candidate pattern is required".to_string(),
			});
		}

		for (index, candidate) in self.candidates().iter().enumerate() {
			let candidate_location = format!("{location}.findInsertionPoint.patterns[{index}]");
			candidate
				.anchor()
				.map_err(|error| with_location(error, &candidate_location))?;
		}

		if let Some(conditions) = &self.conditions {
			conditions.validate(&format!("{location}.conditions"), strict)?;
		}

		if let Some(fallback) = &self.fallback {
			fallback.validate(&format!("{location}.fallback"), strict)?;
		}

		Ok(())
	}
}

fn non_empty(anchor: Anchor<'_>) -> TpatchResult<Anchor<'_>> {
	if anchor.pattern().is_some_and(str::is_empty) {
		return Err(TpatchError::InvalidDirective {
			location: String::new(),
			reason: format!("{anchor} has an empty pattern"),
		});
	}

	Ok(anchor)
}

fn with_location(error: TpatchError, location: &str) -> TpatchError {
	match error {
		TpatchError::InvalidDirective { reason, .. } => {
			TpatchError::InvalidDirective {
				location: location.to_string(),
				reason,
			}
		}
		other => other,
	}
}
