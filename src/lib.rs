//! recipe-audit - test auditing for packaging recipes
//!
//! Inventories the recipes of an aggregate directory (one sub-directory per recipe,
//! files under `<recipe>/recipe/`) and answers two questions for each:
//!
//! 1. Which test scripts does it carry (`run_test.sh`, `run_test.py`, `run_test.bat`)?
//! 2. What does its templated `meta.yaml` declare under `test:` (imports, commands,
//!    requires)?
//!
//! The tests themselves are never executed.
//!
//! # Pipeline
//!
//! ```text
//! meta.yaml ──> sanitize ──> render (optional) ──> parse + classify
//!               (rules.toml)   (tera)               (serde_yaml)
//! ```
//!
//! - [`sanitize`] rewrites template syntax with a versioned, data-driven rule table
//! - [`templating`] resolves the remaining placeholders with a fixed identifier map
//! - [`extract`] parses the result and classifies the test declaration
//! - [`audit`] ties the stages together per recipe and runs batches concurrently
//!
//! # Supporting Modules
//!
//! - [`probe`] - presence of `meta.yaml` and test scripts
//! - [`report`] - aggregate counts and dated Markdown reports
//! - [`config`] - `recipe-audit.toml` loading
//! - [`core`] - error types and user-facing error formatting
//! - [`cli`] - the `recipe-audit` command line
//! - [`utils`] - file system helpers and progress bars
//!
//! # Example
//!
//! ```
//! use recipe_audit_cli::audit::RecipeAuditor;
//! use recipe_audit_cli::sanitize::Sanitizer;
//! use recipe_audit_cli::templating::TemplateRenderer;
//!
//! let auditor = RecipeAuditor::new(Sanitizer::builtin().unwrap(), TemplateRenderer::default());
//! let recipe = auditor.audit_document(
//!     "numpy-feedstock",
//!     "{% set version = \"1.26\" %}\npackage:\n  version: {{ version }}\ntest:\n  imports:\n    - numpy\n".to_string(),
//! );
//! let classification = recipe.classification().unwrap();
//! assert!(classification.has_import_test);
//! assert!(!classification.has_command_test);
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod extract;
pub mod probe;
pub mod report;
pub mod sanitize;
pub mod templating;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
