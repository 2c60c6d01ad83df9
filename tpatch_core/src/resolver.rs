use std::fmt;

use crate::Anchor;
use crate::ConditionFailure;
use crate::DiagnosticScope;
use crate::EvaluationContext;
use crate::Insertion;
use crate::SmartInsertion;
use crate::TpatchResult;
use crate::evaluator::evaluate_detailed;

/// A directive the resolver can apply to template text.
#[derive(Debug, Clone, Copy)]
pub enum Directive<'a> {
	Insertion(&'a Insertion),
	Smart(&'a SmartInsertion),
}

impl<'a> From<&'a Insertion> for Directive<'a> {
	fn from(value: &'a Insertion) -> Self {
		Self::Insertion(value)
	}
}

impl<'a> From<&'a SmartInsertion> for Directive<'a> {
	fn from(value: &'a SmartInsertion) -> Self {
		Self::Smart(value)
	}
}

/// One step taken while resolving a directive. `depth` is `0` for the
/// directive itself and increases by one for each fallback followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
	ConditionsFailed {
		depth: usize,
		failure: Option<ConditionFailure>,
	},
	PatternMissing {
		depth: usize,
		anchor: String,
	},
	NoCandidateMatched {
		semantic: String,
		candidates: Vec<String>,
	},
	Applied {
		depth: usize,
		anchor: String,
	},
}

impl fmt::Display for Attempt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ConditionsFailed {
				depth,
				failure: Some(failure),
			} => write!(f, "[{depth}] conditions failed ({failure})"),
			Self::ConditionsFailed {
				depth,
				failure: None,
			} => write!(f, "[{depth}] conditions failed"),
			Self::PatternMissing { depth, anchor } => {
				write!(f, "[{depth}] pattern not found: {anchor}")
			}
			Self::NoCandidateMatched {
				semantic,
				candidates,
			} => {
				write!(
					f,
					"[0] no candidate for `{semantic}` matched: {}",
					candidates.join(", ")
				)
			}
			Self::Applied { depth, anchor } => write!(f, "[{depth}] inserted {anchor}"),
		}
	}
}

/// Outcome of applying one directive. When `applied` is `false` the text is
/// the input, unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	pub text: String,
	pub applied: bool,
	/// Every step taken, in order. The last one is [`Attempt::Applied`] when
	/// the directive applied.
	pub attempts: Vec<Attempt>,
}

impl Resolution {
	/// How many fallbacks were followed before content was inserted.
	pub fn fallback_depth(&self) -> Option<usize> {
		match self.attempts.last() {
			Some(Attempt::Applied { depth, .. }) => Some(*depth),
			_ => None,
		}
	}
}

/// Apply a directive to `template`.
///
/// Errors are returned only for directives with an invalid shape. A failed
/// condition or a missing pattern routes to the fallback and, once the chain
/// is exhausted, leaves the template unchanged.
pub fn apply<'a, C>(
	template: &str,
	directive: impl Into<Directive<'a>>,
	context: &C,
	scope: &DiagnosticScope<'_>,
) -> TpatchResult<Resolution>
where
	C: EvaluationContext + ?Sized,
{
	match directive.into() {
		Directive::Insertion(insertion) => apply_insertion(template, insertion, context, scope),
		Directive::Smart(smart) => apply_smart_insertion(template, smart, context, scope),
	}
}

/// Apply a plain insertion, walking its fallback chain.
pub fn apply_insertion<C>(
	template: &str,
	insertion: &Insertion,
	context: &C,
	scope: &DiagnosticScope<'_>,
) -> TpatchResult<Resolution>
where
	C: EvaluationContext + ?Sized,
{
	let mut attempts = Vec::new();
	let text = apply_chain(template, insertion, 0, context, scope, &mut attempts)?;

	Ok(finish(template, text, attempts, scope.directive, scope))
}

/// Apply a smart insertion: the first candidate present in the template
/// wins. Falls back to the plain insertion in `fallback`, if any.
pub fn apply_smart_insertion<C>(
	template: &str,
	smart: &SmartInsertion,
	context: &C,
	scope: &DiagnosticScope<'_>,
) -> TpatchResult<Resolution>
where
	C: EvaluationContext + ?Sized,
{
	let mut attempts = Vec::new();
	let evaluation = evaluate_detailed(smart.conditions.as_ref(), context, scope);

	let mut text = None;
	if evaluation.satisfied {
		let mut candidates = Vec::with_capacity(smart.candidates().len());
		for candidate in smart.candidates() {
			let anchor = candidate.anchor()?;
			if let Some(patched) = insert_at(template, anchor, &smart.content) {
				tracing::debug!(
					template = scope.template,
					directive = scope.directive,
					semantic = smart.label(),
					%anchor,
					"semantic insertion point found"
				);
				attempts.push(Attempt::Applied {
					depth: 0,
					anchor: anchor.to_string(),
				});
				text = Some(patched);
				break;
			}
			candidates.push(anchor.to_string());
		}

		if text.is_none() {
			attempts.push(Attempt::NoCandidateMatched {
				semantic: smart.label().to_string(),
				candidates,
			});
		}
	} else {
		attempts.push(Attempt::ConditionsFailed {
			depth: 0,
			failure: evaluation.failure,
		});
	}

	if text.is_none() {
		if let Some(fallback) = &smart.fallback {
			text = apply_chain(template, fallback, 1, context, scope, &mut attempts)?;
		}
	}

	Ok(finish(template, text, attempts, smart.label(), scope))
}

fn apply_chain<C>(
	template: &str,
	first: &Insertion,
	start_depth: usize,
	context: &C,
	scope: &DiagnosticScope<'_>,
	attempts: &mut Vec<Attempt>,
) -> TpatchResult<Option<String>>
where
	C: EvaluationContext + ?Sized,
{
	for (offset, insertion) in first.chain().enumerate() {
		let depth = start_depth + offset;
		let anchor = insertion.anchor()?;
		let evaluation = evaluate_detailed(insertion.conditions.as_ref(), context, scope);

		if !evaluation.satisfied {
			attempts.push(Attempt::ConditionsFailed {
				depth,
				failure: evaluation.failure,
			});
			continue;
		}

		match insert_at(template, anchor, &insertion.content) {
			Some(patched) => {
				tracing::debug!(
					template = scope.template,
					directive = scope.directive,
					depth,
					%anchor,
					"insertion applied"
				);
				attempts.push(Attempt::Applied {
					depth,
					anchor: anchor.to_string(),
				});
				return Ok(Some(patched));
			}
			None => {
				attempts.push(Attempt::PatternMissing {
					depth,
					anchor: anchor.to_string(),
				});
			}
		}
	}

	Ok(None)
}

fn finish(
	template: &str,
	text: Option<String>,
	attempts: Vec<Attempt>,
	label: &str,
	scope: &DiagnosticScope<'_>,
) -> Resolution {
	match text {
		Some(text) => {
			Resolution {
				text,
				applied: true,
				attempts,
			}
		}
		None => {
			tracing::warn!(
				template = scope.template,
				directive = scope.directive,
				insertion_point = label,
				attempts = attempts.len(),
				"no alternative applied, insertion point skipped"
			);
			Resolution {
				text: template.to_string(),
				applied: false,
				attempts,
			}
		}
	}
}

/// Insert `content` at `anchor` in `text`. Patterns resolve to their first
/// occurrence. Returns `None` when the pattern is absent.
pub fn insert_at(text: &str, anchor: Anchor<'_>, content: &str) -> Option<String> {
	let offset = match anchor {
		Anchor::After(pattern) => text.find(pattern)? + pattern.len(),
		Anchor::Before(pattern) => text.find(pattern)?,
		Anchor::Start => 0,
		Anchor::End => text.len(),
	};

	let mut buf = String::with_capacity(text.len() + content.len());
	buf.push_str(&text[..offset]);
	buf.push_str(content);
	buf.push_str(&text[offset..]);
	Some(buf)
}
