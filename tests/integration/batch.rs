//! Batch audits through the library API: failure isolation, ordering and summary
//! counts over a realistic aggregate.

use anyhow::Result;
use recipe_audit_cli::audit::{DocumentStatus, RecipeAuditor};
use recipe_audit_cli::probe::ScriptCoverage;
use recipe_audit_cli::report::AuditSummary;
use recipe_audit_cli::sanitize::Sanitizer;
use recipe_audit_cli::templating::TemplateRenderer;
use recipe_audit_cli::utils::list_recipes;

use crate::common::{AggregateFixture, MetaFixture, RecipeSpec};

/// Ten well-formed recipes with 0..=3 scripts, one unparseable recipe and one
/// recipe without metadata.
fn mixed_aggregate() -> Result<AggregateFixture> {
    let fixture = AggregateFixture::new()?;
    for i in 0..10 {
        let package = format!("pkg{i:02}");
        let meta = if i % 2 == 0 {
            MetaFixture::templated(&package)
        } else {
            MetaFixture::imports_only(&package)
        };
        let mut spec = RecipeSpec::new(&format!("{package}-feedstock")).meta(meta.content);
        if i % 4 >= 1 {
            spec = spec.sh();
        }
        if i % 4 >= 2 {
            spec = spec.py();
        }
        if i % 4 == 3 {
            spec = spec.bat();
        }
        fixture.add_recipe(&spec)?;
    }
    fixture.add_recipe(&RecipeSpec::new("broken-feedstock").meta(MetaFixture::unparseable().content).sh())?;
    fixture.add_recipe(&RecipeSpec::new("empty-feedstock"))?;
    Ok(fixture)
}

fn auditor() -> RecipeAuditor {
    RecipeAuditor::new(Sanitizer::builtin().unwrap(), TemplateRenderer::default())
}

#[tokio::test]
async fn test_one_unparseable_recipe_does_not_affect_the_rest() -> Result<()> {
    let fixture = mixed_aggregate()?;
    let root = fixture.aggregate_dir();
    let names = list_recipes(root, None)?;
    assert_eq!(names.len(), 12);

    let reports = auditor().audit_all(root, &names, 4, None).await;
    assert_eq!(reports.len(), 12);

    let mut classified = 0;
    for report in &reports {
        match report.name.as_str() {
            "broken-feedstock" => {
                let failure = report.parse_failure().expect("broken recipe fails to parse");
                assert!(failure.line.is_some());
            }
            "empty-feedstock" => assert!(matches!(report.document, DocumentStatus::Missing)),
            name => {
                let c = report
                    .classification()
                    .unwrap_or_else(|| panic!("{name} should classify: {:?}", report.parse_failure()));
                let package = name.trim_end_matches("-feedstock");
                assert_eq!(c.declaration.imports, vec![package.to_string()], "{name}");
                classified += 1;
            }
        }
    }
    assert_eq!(classified, 10);
    Ok(())
}

#[tokio::test]
async fn test_reports_sorted_regardless_of_parallelism() -> Result<()> {
    let fixture = mixed_aggregate()?;
    let root = fixture.aggregate_dir();
    let mut names = list_recipes(root, None)?;
    names.reverse();

    let serial = auditor().audit_all(root, &names, 1, None).await;
    let parallel = auditor().audit_all(root, &names, 16, None).await;

    let serial_names: Vec<&str> = serial.iter().map(|r| r.name.as_str()).collect();
    let parallel_names: Vec<&str> = parallel.iter().map(|r| r.name.as_str()).collect();
    let mut expected = serial_names.clone();
    expected.sort_unstable();
    assert_eq!(serial_names, expected);
    assert_eq!(parallel_names, expected);
    assert_eq!(AuditSummary::from_reports(&serial), AuditSummary::from_reports(&parallel));
    Ok(())
}

#[tokio::test]
async fn test_summary_counts() -> Result<()> {
    let fixture = mixed_aggregate()?;
    let root = fixture.aggregate_dir();
    let names = list_recipes(root, None)?;
    let reports = auditor().audit_all(root, &names, 4, None).await;
    let summary = AuditSummary::from_reports(&reports);

    assert_eq!(summary.total, 12);
    assert_eq!(summary.missing_metadata, 1);
    assert_eq!(summary.coverage_count(ScriptCoverage::None), 4);
    assert_eq!(summary.coverage_count(ScriptCoverage::One), 4);
    assert_eq!(summary.coverage_count(ScriptCoverage::Two), 2);
    assert_eq!(summary.coverage_count(ScriptCoverage::Three), 2);
    assert_eq!(summary.import_tests, 10);
    // Only the templated documents declare commands
    assert_eq!(summary.command_tests, 5);
    assert_eq!(summary.no_test_section, 0);
    assert_eq!(summary.parse_failures, vec!["broken-feedstock".to_string()]);
    assert!(summary.unreadable.is_empty());
    assert_eq!(summary.classified(), 10);
    Ok(())
}

#[test]
fn test_filter_limits_batch() -> Result<()> {
    let fixture = mixed_aggregate()?;
    let pattern = glob::Pattern::new("pkg0[0-2]-*")?;
    let names = list_recipes(fixture.aggregate_dir(), Some(&pattern))?;
    assert_eq!(names, vec!["pkg00-feedstock", "pkg01-feedstock", "pkg02-feedstock"]);
    Ok(())
}

#[test]
fn test_missing_aggregate_is_fatal() {
    let temp = tempfile::TempDir::new().unwrap();
    let err = list_recipes(&temp.path().join("nope"), None).unwrap_err();
    assert!(err.to_string().contains("Aggregate directory not found"), "{err}");
}
