//! Aggregate counts over a batch of recipe reports, and their Markdown rendering.

pub mod markdown;

pub use markdown::MarkdownReport;

use serde::Serialize;

use crate::audit::RecipeReport;
use crate::probe::ScriptCoverage;

/// Share of `part` in `total` as a percentage; 0 for an empty set.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Counts over a whole audit run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    /// Recipes without a `meta.yaml`
    pub missing_metadata: usize,
    pub no_scripts: usize,
    pub one_script: usize,
    pub two_scripts: usize,
    pub three_scripts: usize,
    pub import_tests: usize,
    pub command_tests: usize,
    /// Parsed documents without a `test` section
    pub no_test_section: usize,
    pub parse_failures: Vec<String>,
    pub unreadable: Vec<String>,
    /// Recipes where part of the document kept its pre-render text
    pub render_fallbacks: usize,
}

impl AuditSummary {
    pub fn from_reports(reports: &[RecipeReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Default::default()
        };

        for report in reports {
            if !report.presence.meta_yaml {
                summary.missing_metadata += 1;
            }
            match report.presence.coverage() {
                ScriptCoverage::None => summary.no_scripts += 1,
                ScriptCoverage::One => summary.one_script += 1,
                ScriptCoverage::Two => summary.two_scripts += 1,
                ScriptCoverage::Three => summary.three_scripts += 1,
            }
            if let Some(c) = report.classification() {
                summary.import_tests += usize::from(c.has_import_test);
                summary.command_tests += usize::from(c.has_command_test);
                summary.no_test_section += usize::from(!c.has_test_section);
            }
            if report.parse_failure().is_some() {
                summary.parse_failures.push(report.name.clone());
            }
            if report.is_unreadable() {
                summary.unreadable.push(report.name.clone());
            }
            summary.render_fallbacks += usize::from(report.render_fell_back());
        }

        summary
    }

    pub fn coverage_count(&self, coverage: ScriptCoverage) -> usize {
        match coverage {
            ScriptCoverage::None => self.no_scripts,
            ScriptCoverage::One => self.one_script,
            ScriptCoverage::Two => self.two_scripts,
            ScriptCoverage::Three => self.three_scripts,
        }
    }

    pub fn coverage_percentage(&self, coverage: ScriptCoverage) -> f64 {
        percentage(self.coverage_count(coverage), self.total)
    }

    /// Documents that made it through the parser.
    pub fn classified(&self) -> usize {
        self.total - self.missing_metadata - self.parse_failures.len() - self.unreadable.len()
    }
}
