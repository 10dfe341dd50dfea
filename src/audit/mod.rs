//! Per-recipe audit pipeline and batch runner.
//!
//! For one document the pipeline is `sanitize -> render -> extract`
//! ([`RecipeAuditor::audit_document`]). For one recipe directory the presence probe
//! and document loading come first ([`RecipeAuditor::audit_recipe`]). A batch runs
//! recipes concurrently with a bounded number in flight ([`RecipeAuditor::audit_all`]).
//!
//! Failures stay local to their recipe: a missing, unreadable or unparseable
//! document is recorded in that recipe's [`RecipeReport`] and the batch moves on.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AuditConfig;
use crate::core::AuditError;
use crate::extract::{self, Classification, ParseFailure};
use crate::probe::{self, Presence};
use crate::sanitize::{RuleHit, Sanitizer};
use crate::templating::{RenderError, TemplateRenderer};
use crate::utils::{ProgressBar, safe_write};

/// Result of parsing one sanitized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum DocumentOutcome {
    Classified(Classification),
    ParseFailure(ParseFailure),
}

/// One recipe's document as it moves through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    #[serde(skip)]
    pub name: String,
    /// Document text as loaded
    #[serde(skip)]
    pub raw: String,
    /// Text handed to the parser: the sanitized document after the render pass
    #[serde(skip)]
    pub parsed_text: String,
    pub rule_hits: Vec<RuleHit>,
    pub render_failures: Vec<RenderError>,
    pub outcome: DocumentOutcome,
}

impl Recipe {
    pub fn classification(&self) -> Option<&Classification> {
        match &self.outcome {
            DocumentOutcome::Classified(c) => Some(c),
            DocumentOutcome::ParseFailure(_) => None,
        }
    }

    pub fn parse_failure(&self) -> Option<&ParseFailure> {
        match &self.outcome {
            DocumentOutcome::ParseFailure(f) => Some(f),
            DocumentOutcome::Classified(_) => None,
        }
    }

    /// The parse failure as a crate error, for display.
    pub fn parse_error(&self) -> Option<AuditError> {
        self.parse_failure().map(|f| AuditError::ParseFailure {
            recipe: self.name.clone(),
            message: f.message.clone(),
            line: f.line,
            column: f.column,
        })
    }
}

/// State of a recipe's `meta.yaml`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "document", rename_all = "kebab-case")]
pub enum DocumentStatus {
    /// No metadata document: "no data", not a failure
    Missing,
    /// The document exists but could not be read
    Unreadable { message: String },
    /// The document went through the pipeline
    Loaded(Box<Recipe>),
}

/// Everything the audit learned about one recipe.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeReport {
    pub name: String,
    pub presence: Presence,
    #[serde(flatten)]
    pub document: DocumentStatus,
}

impl RecipeReport {
    pub fn recipe(&self) -> Option<&Recipe> {
        match &self.document {
            DocumentStatus::Loaded(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.recipe().and_then(Recipe::classification)
    }

    pub fn parse_failure(&self) -> Option<&ParseFailure> {
        self.recipe().and_then(Recipe::parse_failure)
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self.document, DocumentStatus::Unreadable { .. })
    }

    /// Some part of the document kept its pre-render text.
    pub fn render_fell_back(&self) -> bool {
        self.recipe().is_some_and(|r| !r.render_failures.is_empty())
    }
}

/// Read a metadata document. Bytes that are not valid UTF-8 are replaced instead of
/// rejected, so the document still goes through the pipeline.
pub async fn load_document(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("{}: not valid UTF-8, invalid bytes replaced", path.display());
            Ok(String::from_utf8_lossy(&e.into_bytes()).into_owned())
        }
    }
}

/// Runs the per-recipe pipeline. Cheap to share across concurrent workers: every
/// field is read-only during a run.
#[derive(Debug, Clone)]
pub struct RecipeAuditor {
    sanitizer: Sanitizer,
    renderer: TemplateRenderer,
    scratch_dir: Option<PathBuf>,
}

impl RecipeAuditor {
    pub fn new(sanitizer: Sanitizer, renderer: TemplateRenderer) -> Self {
        Self {
            sanitizer,
            renderer,
            scratch_dir: None,
        }
    }

    /// Keep every recipe's final text at `<dir>/<recipe>-meta.yaml`.
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        Ok(Self::new(config.sanitizer()?, config.renderer()).with_scratch_dir(config.scratch_dir.clone()))
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Sanitize, render and classify one document. Never fails: an unparseable
    /// document yields [`DocumentOutcome::ParseFailure`].
    pub fn audit_document(&self, name: &str, raw: String) -> Recipe {
        let report = self.sanitizer.sanitize_with_report(&raw);
        let rendered = self.renderer.render(&report.text);

        for failure in &rendered.failures {
            debug!("{}: render fallback: {}", name, failure.format_with_context());
        }

        let outcome = match extract::extract(&rendered.text) {
            Ok((_, classification)) => DocumentOutcome::Classified(classification),
            Err(failure) => {
                warn!(
                    "{}: document still unparseable after sanitization: {} [{}]",
                    name,
                    failure,
                    failure.offending_line(&rendered.text).unwrap_or("").trim()
                );
                DocumentOutcome::ParseFailure(failure)
            }
        };

        Recipe {
            name: name.to_string(),
            raw,
            parsed_text: rendered.text,
            rule_hits: report.hits,
            render_failures: rendered.failures,
            outcome,
        }
    }

    /// Probe, load and audit one recipe directory under `root`.
    pub async fn audit_recipe(&self, root: &Path, name: &str) -> RecipeReport {
        let presence = probe::probe(root, name);

        let document = if !presence.meta_yaml {
            debug!("{}: no metadata document", name);
            DocumentStatus::Missing
        } else {
            let path = probe::metadata_path(root, name);
            match load_document(&path).await {
                Ok(raw) => {
                    let recipe = self.audit_document(name, raw);
                    self.write_scratch(&recipe);
                    DocumentStatus::Loaded(Box::new(recipe))
                }
                Err(e) => {
                    warn!("{}: cannot read {}: {}", name, path.display(), e);
                    DocumentStatus::Unreadable {
                        message: e.to_string(),
                    }
                }
            }
        };

        RecipeReport {
            name: name.to_string(),
            presence,
            document,
        }
    }

    /// Audit every recipe in `names`, at most `max_parallel` at a time.
    ///
    /// Reports come back sorted by recipe name whatever order they finished in.
    pub async fn audit_all(
        &self,
        root: &Path,
        names: &[String],
        max_parallel: usize,
        progress: Option<&ProgressBar>,
    ) -> Vec<RecipeReport> {
        info!("Auditing {} recipe(s) with up to {} in flight", names.len(), max_parallel);

        let mut reports: Vec<RecipeReport> = stream::iter(names)
            .map(|name| async move {
                let report = self.audit_recipe(root, name).await;
                if let Some(progress) = progress {
                    progress.set_message(name.clone());
                    progress.inc(1);
                }
                report
            })
            .buffer_unordered(max_parallel.max(1))
            .collect()
            .await;

        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }

    /// Scratch copies are diagnostics; failing to write one never fails the recipe.
    fn write_scratch(&self, recipe: &Recipe) {
        let Some(dir) = &self.scratch_dir else {
            return;
        };
        let path = dir.join(format!("{}-meta.yaml", recipe.name));
        if let Err(e) = safe_write(&path, &recipe.parsed_text) {
            warn!("{}: cannot write scratch copy {}: {:#}", recipe.name, path.display(), e);
        }
    }
}
