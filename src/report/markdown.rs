//! Dated Markdown report files.
//!
//! One run writes six files into the report directory, all suffixed with the run
//! date as `<Month>_<day>_<year>.md`:
//!
//! | Prefix          | Content                                          |
//! |-----------------|--------------------------------------------------|
//! | `Report`        | Summary counts and percentages                   |
//! | `No_file`       | Recipes without test scripts                     |
//! | `One_file`      | Recipes with one test script, and which          |
//! | `Two_file`      | Recipes with two test scripts, and which         |
//! | `Three_file`    | Recipes with all three test scripts              |
//! | `Test_sections` | Import/command classification and parse failures |

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::AuditSummary;
use crate::audit::RecipeReport;
use crate::probe::ScriptCoverage;
use crate::utils::{ensure_dir, safe_write};

const RULE: &str = "\n---\n\n";

/// Markdown renderer for one audit run.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownReport {
    date: NaiveDate,
}

impl MarkdownReport {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
        }
    }

    /// Report dated with the local current date.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    /// `<prefix>_<Month>_<day>_<year>.md`, e.g. `Report_March_7_2024.md`.
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}_{}_{}_{}.md", prefix, self.date.format("%B"), self.date.day(), self.date.year())
    }

    fn header(&self) -> String {
        format!("# {} {} {}{}", self.date.format("%B"), self.date.day(), self.date.year(), RULE)
    }

    /// Summary counts and percentages.
    pub fn render_summary(&self, summary: &AuditSummary) -> String {
        let mut out = self.header();
        out.push_str("## Report");
        out.push_str(RULE);
        let _ = writeln!(out, "Recipes audited: {}  ", summary.total);
        let _ = write!(out, "Recipes without meta.yaml: {}{}", summary.missing_metadata, RULE);

        for coverage in ScriptCoverage::ALL {
            let _ = write!(out, "## Recipes With {}{}", title_case(coverage.label()), RULE);
            let _ = writeln!(
                out,
                "Number of recipes with {}: {}  ",
                coverage.label(),
                summary.coverage_count(coverage)
            );
            let _ = write!(
                out,
                "Percentage of recipes with {}: {:.2}%{}",
                coverage.label(),
                summary.coverage_percentage(coverage),
                RULE
            );
        }

        out.push_str("## Test Sections");
        out.push_str(RULE);
        let _ = writeln!(out, "Recipes declaring import tests: {}  ", summary.import_tests);
        let _ = writeln!(out, "Recipes declaring command tests: {}  ", summary.command_tests);
        let _ = writeln!(out, "Parsed recipes without a test section: {}  ", summary.no_test_section);
        let _ = writeln!(out, "Unparseable documents: {}  ", summary.parse_failures.len());
        let _ = writeln!(out, "Unreadable documents: {}  ", summary.unreadable.len());
        let _ = writeln!(out, "Documents with unresolved templates: {}", summary.render_fallbacks);
        out
    }

    /// List of recipes with the given script coverage, with the scripts they carry.
    pub fn render_coverage_list(&self, reports: &[RecipeReport], coverage: ScriptCoverage) -> String {
        let mut out = self.header();
        out.push_str("## Report");
        out.push_str(RULE);
        for report in reports.iter().filter(|r| r.presence.coverage() == coverage) {
            let _ = writeln!(out, "- `{}`", report.name);
            if coverage != ScriptCoverage::None {
                let _ = writeln!(out, "\t ({})", report.presence.scripts().join(", "));
            }
        }
        out
    }

    /// Import/command classification per recipe, then the documents that failed.
    pub fn render_test_sections(&self, reports: &[RecipeReport]) -> String {
        let mut out = self.header();
        out.push_str("## Test Sections");
        out.push_str(RULE);
        out.push_str("| Recipe | Imports | Commands | Requires |\n");
        out.push_str("|--------|---------|----------|----------|\n");
        for report in reports {
            if let Some(c) = report.classification() {
                let _ = writeln!(
                    out,
                    "| `{}` | {} | {} | {} |",
                    report.name,
                    c.imports_count(),
                    c.commands_count(),
                    c.requires_count()
                );
            }
        }

        let failures: Vec<_> = reports.iter().filter(|r| r.parse_failure().is_some()).collect();
        if !failures.is_empty() {
            out.push_str(RULE);
            out.push_str("## Unparseable Documents");
            out.push_str(RULE);
            for report in failures {
                if let Some(failure) = report.parse_failure() {
                    let _ = writeln!(out, "- `{}`: {}", report.name, failure.to_string().replace('\n', " "));
                }
            }
        }
        out
    }

    /// Write all report files into `dir`, creating it if needed.
    pub fn write_all(&self, dir: &Path, reports: &[RecipeReport], summary: &AuditSummary) -> Result<Vec<PathBuf>> {
        ensure_dir(dir)?;

        let mut files = vec![("Report", self.render_summary(summary))];
        for (prefix, coverage) in [
            ("No_file", ScriptCoverage::None),
            ("One_file", ScriptCoverage::One),
            ("Two_file", ScriptCoverage::Two),
            ("Three_file", ScriptCoverage::Three),
        ] {
            files.push((prefix, self.render_coverage_list(reports, coverage)));
        }
        files.push(("Test_sections", self.render_test_sections(reports)));

        let mut written = Vec::with_capacity(files.len());
        for (prefix, content) in files {
            let path = dir.join(self.file_name(prefix));
            safe_write(&path, &content)?;
            tracing::debug!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
