//! `recipe-audit report`: audit and write dated Markdown reports.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::RunContext;
use super::audit::run_batch;
use crate::report::{AuditSummary, MarkdownReport};

#[derive(Args)]
pub struct ReportCommand {
    /// Directory for the report files (default: report_dir from config, "Report")
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Only include recipes whose directory name matches this glob
    #[arg(long, value_name = "GLOB")]
    pub filter: Option<String>,

    /// Maximum recipes processed at once
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_parallel: Option<u32>,
}

impl ReportCommand {
    pub async fn execute(self, context: &RunContext) -> Result<()> {
        let mut config = context.config.clone();
        if let Some(n) = self.max_parallel {
            config.max_parallel = Some(n as usize);
        }
        let output = self.output.clone().unwrap_or_else(|| config.report_dir.clone());

        let reports = run_batch(&config, self.filter.as_deref(), context).await?;
        let summary = AuditSummary::from_reports(&reports);

        let written = MarkdownReport::today().write_all(&output, &reports, &summary)?;
        println!("{} {} recipe(s) audited", "✓".green(), summary.total);
        for path in written {
            println!("  {}", path.display());
        }
        Ok(())
    }
}
