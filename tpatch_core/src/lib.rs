//! `tpatch_core` is the engine behind [tpatch](https://github.com/ifiokjr/tpatch), a tool for customizing code generator templates declaratively. Instead of forking and hand-editing a generator's templates, you describe *when* a template should change and *where* content goes, and tpatch patches the original template text.
//!
//! ## Processing Pipeline
//!
//! ```text
//! tpatch.toml + customizations/*.yaml
//!   → Config (generator version, features, properties, captured environment)
//!   → Customization documents (parsed and validated once, at load time)
//!   → Evaluator (allOf / anyOf / not / leaf conditions, version constraints)
//!   → Resolver (exact or semantic insertion points, fallback chains)
//!   → Patched templates and partials written to the output directory
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `tpatch.toml`.
//! - [`project`]: Customization discovery, parallel application and output.
//! - [`version`]: The `generatorVersion` constraint comparator.
//!
//! ## Key Types
//!
//! - [`ConditionSet`]: A recursive condition tree with explicit precedence.
//! - [`EvaluationContext`]: The read-only lookups conditions are evaluated
//!   against.
//! - [`Insertion`] / [`SmartInsertion`]: Exact and semantic insertion
//!   directives with fallbacks.
//! - [`Resolution`]: The patched text plus every step the resolver took.
//! - [`CustomizationDocument`]: One rule file targeting one template.
//!
//! ## Quick Start
//!
//! ```rust
//! use tpatch_core::DiagnosticScope;
//! use tpatch_core::GeneratorEnvironment;
//! use tpatch_core::Insertion;
//! use tpatch_core::apply;
//!
//! let environment = GeneratorEnvironment::new().with_version("7.14.0");
//! let template = "public class {{classname}} {\n}";
//! let context = environment.for_template(template);
//! let insertion = Insertion::before("public class", "@lombok.Builder\n");
//!
//! let resolution = apply(
//! 	template,
//! 	&insertion,
//! 	&context,
//! 	&DiagnosticScope::new("pojo.mustache", "builder"),
//! )
//! .unwrap();
//! assert!(resolution.applied);
//! assert!(resolution.text.starts_with("@lombok.Builder\npublic class"));
//! ```

pub use condition::*;
pub use config::*;
pub use context::*;
pub use customization::*;
pub use error::*;
pub use evaluator::*;
pub use insertion::*;
pub use project::*;
pub use resolver::*;

mod condition;
pub mod config;
mod context;
mod customization;
#[allow(unused_assignments)]
mod error;
mod evaluator;
mod insertion;
pub mod project;
mod resolver;
pub mod version;
