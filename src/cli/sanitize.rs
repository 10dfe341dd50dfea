//! `recipe-audit sanitize <recipe>`: show the document the parser sees.
//!
//! The text goes to stdout so it can be piped; rule hits, render fallbacks and the
//! parse outcome go to stderr.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::RunContext;
use crate::audit::{self, DocumentOutcome, RecipeAuditor};
use crate::core::AuditError;
use crate::probe;
use crate::templating::{RenderMode, TemplateRenderer};

#[derive(Args)]
pub struct SanitizeCommand {
    /// Recipe directory name, e.g. numpy-feedstock
    pub recipe: String,

    /// Skip the render pass and print the sanitized text only
    #[arg(long)]
    pub no_render: bool,
}

impl SanitizeCommand {
    pub async fn execute(self, context: &RunContext) -> Result<()> {
        let root = &context.config.aggregate_dir;
        if !probe::aggregate_available(root) {
            return Err(AuditError::AggregateNotFound {
                path: root.display().to_string(),
            }
            .into());
        }

        let path = probe::metadata_path(root, &self.recipe);
        if !path.is_file() {
            return Err(AuditError::MissingDocument {
                recipe: self.recipe.clone(),
                path: path.display().to_string(),
            }
            .into());
        }
        let raw = audit::load_document(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut auditor = RecipeAuditor::from_config(&context.config)?;
        if self.no_render {
            auditor = RecipeAuditor::new(
                auditor.sanitizer().clone(),
                TemplateRenderer::new(RenderMode::Off, auditor.renderer().identifiers().clone()),
            );
        }
        let recipe = auditor.audit_document(&self.recipe, raw);

        print!("{}", recipe.parsed_text);

        eprintln!();
        if recipe.rule_hits.is_empty() {
            eprintln!("{}", "No sanitization rules matched".dimmed());
        } else {
            eprintln!("{}", "Rules applied:".bold());
            for hit in &recipe.rule_hits {
                eprintln!("  {:<26} {:<24} x{}", hit.rule, hit.pass.to_string(), hit.count);
            }
        }
        for failure in &recipe.render_failures {
            let error = failure.clone().into_audit_error(&recipe.name);
            eprintln!("{} {}", "Render fallback:".yellow(), error);
        }
        match &recipe.outcome {
            DocumentOutcome::Classified(c) => eprintln!(
                "{} imports={} commands={} requires={}",
                "✓ Parsed:".green(),
                c.imports_count(),
                c.commands_count(),
                c.requires_count()
            ),
            DocumentOutcome::ParseFailure(failure) => {
                eprintln!("{} {}", "✗ Parse failure:".red(), failure);
            }
        }
        Ok(())
    }
}
