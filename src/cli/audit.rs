//! `recipe-audit audit`: run the full pipeline over the aggregate.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{OutputFormat, RunContext, recipe_filter};
use crate::audit::{DocumentStatus, RecipeAuditor, RecipeReport};
use crate::config::AuditConfig;
use crate::report::{AuditSummary, percentage};
use crate::utils::list_recipes;

#[derive(Args)]
pub struct AuditCommand {
    /// Only audit recipes whose directory name matches this glob
    #[arg(long, value_name = "GLOB")]
    pub filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Maximum recipes processed at once (default: max(4, 2 x CPU cores))
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_parallel: Option<u32>,

    /// Keep each recipe's sanitized document in this directory
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct AuditOutput<'a> {
    aggregate: &'a Path,
    summary: &'a AuditSummary,
    recipes: &'a [RecipeReport],
}

impl AuditCommand {
    pub async fn execute(self, context: &RunContext) -> Result<()> {
        let mut config = context.config.clone();
        if let Some(n) = self.max_parallel {
            config.max_parallel = Some(n as usize);
        }
        if self.scratch_dir.is_some() {
            config.scratch_dir = self.scratch_dir.clone();
        }

        let reports = run_batch(&config, self.filter.as_deref(), context).await?;
        let summary = AuditSummary::from_reports(&reports);

        match self.format {
            OutputFormat::Json => {
                let output = AuditOutput {
                    aggregate: &config.aggregate_dir,
                    summary: &summary,
                    recipes: &reports,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                for report in &reports {
                    print_report_line(report);
                }
                print_summary(&summary);
            }
        }
        Ok(())
    }
}

/// List, filter and audit all recipes with the given configuration.
pub(crate) async fn run_batch(
    config: &AuditConfig,
    filter: Option<&str>,
    context: &RunContext,
) -> Result<Vec<RecipeReport>> {
    let root = &config.aggregate_dir;
    let filter = recipe_filter(filter)?;
    let names = list_recipes(root, filter.as_ref())?;
    let auditor = RecipeAuditor::from_config(config)?;

    let progress = context.progress_bar(names.len());
    progress.set_prefix("Auditing");
    let reports = auditor.audit_all(root, &names, config.effective_max_parallel(), Some(&progress)).await;
    progress.finish_and_clear();

    Ok(reports)
}

fn print_report_line(report: &RecipeReport) {
    let scripts = report.presence.scripts();
    let scripts = if scripts.is_empty() {
        "no test scripts".dimmed().to_string()
    } else {
        scripts.join(", ")
    };

    let document = match &report.document {
        DocumentStatus::Missing => "no meta.yaml".yellow().to_string(),
        DocumentStatus::Unreadable {
            message,
        } => format!("{} ({message})", "unreadable".red()),
        DocumentStatus::Loaded(recipe) => match recipe.classification() {
            Some(c) if c.has_import_test || c.has_command_test => format!(
                "{} imports={} commands={} requires={}",
                "tests".green(),
                c.imports_count(),
                c.commands_count(),
                c.requires_count()
            ),
            Some(_) => "no test section".yellow().to_string(),
            None => "parse failure".red().to_string(),
        },
    };

    println!("{}  [{}]  {}", report.name.bold(), scripts, document);
}

fn print_summary(summary: &AuditSummary) {
    println!();
    println!("{}", "Summary".bold());
    println!("  Recipes:               {}", summary.total);
    println!("  Without meta.yaml:     {}", summary.missing_metadata);
    for coverage in crate::probe::ScriptCoverage::ALL {
        println!(
            "  With {:<17} {} ({:.2}%)",
            format!("{}:", coverage.label()),
            summary.coverage_count(coverage),
            summary.coverage_percentage(coverage)
        );
    }
    println!(
        "  Import tests:          {} ({:.2}%)",
        summary.import_tests,
        percentage(summary.import_tests, summary.total)
    );
    println!(
        "  Command tests:         {} ({:.2}%)",
        summary.command_tests,
        percentage(summary.command_tests, summary.total)
    );
    println!("  No test section:       {}", summary.no_test_section);
    if !summary.parse_failures.is_empty() {
        println!(
            "  {} {}",
            "Unparseable:".red(),
            summary.parse_failures.join(", ")
        );
    }
    if !summary.unreadable.is_empty() {
        println!("  {} {}", "Unreadable:".red(), summary.unreadable.join(", "));
    }
}
