//! End-to-end tests of the `recipe-audit` binary.

use anyhow::Result;
use predicates::prelude::*;

use crate::common::{MetaFixture, RecipeSpec, TestProject};

fn project() -> Result<TestProject> {
    let project = TestProject::new()?;
    project.add_recipe(RecipeSpec::new("numpy-feedstock").meta(MetaFixture::templated("numpy").content).sh().py())?;
    project.add_recipe(RecipeSpec::new("six-feedstock").meta(MetaFixture::imports_only("six").content))?;
    project.add_recipe(RecipeSpec::new("bare-feedstock").bat())?;
    Ok(project)
}

#[test]
fn test_list_table() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("numpy-feedstock"))
        .stdout(predicate::str::contains("bare-feedstock"))
        .stdout(predicate::str::contains("3 recipe(s)"));
    Ok(())
}

#[test]
fn test_list_json() -> Result<()> {
    let project = project()?;
    let output = project.run(&["list", "--format", "json"])?;
    output.assert_success();

    let entries = output.json()?;
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 3);
    // Sorted by directory name
    assert_eq!(entries[0]["name"], "bare-feedstock");
    assert_eq!(entries[0]["meta_yaml"], false);
    assert_eq!(entries[0]["run_test_bat"], true);
    assert_eq!(entries[1]["name"], "numpy-feedstock");
    assert_eq!(entries[1]["scripts"], 2);
    Ok(())
}

#[test]
fn test_list_filter() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .args(["list", "--filter", "n*"])
        .assert()
        .success()
        .stdout(predicate::str::contains("numpy-feedstock"))
        .stdout(predicate::str::contains("six-feedstock").not())
        .stdout(predicate::str::contains("1 recipe(s)"));
    Ok(())
}

#[test]
fn test_audit_json() -> Result<()> {
    let project = project()?;
    let output = project.run(&["audit", "--format", "json", "--max-parallel", "2"])?;
    output.assert_success();

    let json = output.json()?;
    assert_eq!(json["summary"]["total"], 3);
    assert_eq!(json["summary"]["missing_metadata"], 1);
    assert_eq!(json["summary"]["import_tests"], 2);
    assert_eq!(json["summary"]["command_tests"], 1);

    let recipes = json["recipes"].as_array().expect("array");
    assert_eq!(recipes[0]["name"], "bare-feedstock");
    assert_eq!(recipes[0]["document"], "missing");

    let numpy = &recipes[1];
    assert_eq!(numpy["name"], "numpy-feedstock");
    assert_eq!(numpy["document"], "loaded");
    assert_eq!(numpy["outcome"]["status"], "classified");
    assert_eq!(numpy["outcome"]["has_command_test"], true);
    assert_eq!(numpy["outcome"]["declaration"]["imports"][0], "numpy");
    assert!(!numpy["rule_hits"].as_array().expect("array").is_empty());
    Ok(())
}

#[test]
fn test_audit_text_summary() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("no meta.yaml"))
        .stdout(predicate::str::contains("imports=1 commands=2 requires=1"))
        .stdout(predicate::str::contains("Summary"));
    Ok(())
}

#[test]
fn test_audit_writes_scratch_copies() -> Result<()> {
    let project = project()?;
    project.command()?.args(["audit", "--scratch-dir", "Temp"]).assert().success();

    let scratch = project.project_dir().join("Temp");
    let numpy = std::fs::read_to_string(scratch.join("numpy-feedstock-meta.yaml"))?;
    assert!(numpy.contains("    - compiler\n"));
    assert!(scratch.join("six-feedstock-meta.yaml").exists());
    assert!(!scratch.join("bare-feedstock-meta.yaml").exists());
    Ok(())
}

#[test]
fn test_report_writes_dated_files() -> Result<()> {
    let project = project()?;
    let output = project.run(&["report", "-o", "out"])?;
    output.assert_success();
    assert!(output.stdout.contains("3 recipe(s) audited"));

    let mut files: Vec<String> = std::fs::read_dir(project.project_dir().join("out"))?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    files.sort();
    assert_eq!(files.len(), 6, "{files:?}");
    for prefix in ["No_file_", "One_file_", "Report_", "Test_sections_", "Three_file_", "Two_file_"] {
        assert!(
            files.iter().any(|f| f.starts_with(prefix) && f.ends_with(".md")),
            "missing {prefix}* in {files:?}"
        );
    }

    let report = files.iter().find(|f| f.starts_with("Report_")).expect("summary report");
    let content = std::fs::read_to_string(project.project_dir().join("out").join(report))?;
    assert!(content.contains("Percentage of recipes with no test files: 33.33%"), "{content}");
    Ok(())
}

#[test]
fn test_sanitize_prints_document() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .args(["sanitize", "numpy-feedstock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#{% set name = \"numpy\" %}"))
        .stdout(predicate::str::contains("    - compiler\n"))
        .stdout(predicate::str::contains("  #version: {{ version }}"))
        .stderr(predicate::str::contains("Parsed:"))
        .stderr(predicate::str::contains("control-block"));
    Ok(())
}

#[test]
fn test_sanitize_no_render_keeps_placeholders() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .args(["sanitize", "numpy-feedstock", "--no-render"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    - {{ compiler }}\n"))
        .stdout(predicate::str::contains("    - {{ pin }}\n"));
    Ok(())
}

#[test]
fn test_sanitize_reports_render_fallback() -> Result<()> {
    let project = project()?;
    project.add_recipe(
        RecipeSpec::new("attrs-feedstock")
            .meta("{% set name = \"attrs\" %}\npackage:\n  name: attrs\ntest:\n  imports:\n    - {{ name }}  # [linux]\n"),
    )?;
    project
        .command()?
        .args(["sanitize", "attrs-feedstock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    - {{ name }}  # [linux]\n"))
        .stderr(predicate::str::contains(
            "Render fallback: Failed to render sanitized document for 'attrs-feedstock': Unknown template identifier 'name' (line 6)",
        ))
        .stderr(predicate::str::contains("imports=1"));
    Ok(())
}

#[test]
fn test_sanitize_missing_document() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .args(["sanitize", "bare-feedstock"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No metadata document for recipe 'bare-feedstock'"));
    Ok(())
}

#[test]
fn test_missing_aggregate_fails() -> Result<()> {
    let project = TestProject::new()?;
    project
        .command()?
        .args(["audit", "--aggregate", "does-not-exist"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Aggregate directory not found"))
        .stderr(predicate::str::contains("--aggregate"));
    Ok(())
}

#[test]
fn test_config_file_render_mode() -> Result<()> {
    let project = project()?;
    project.write_config("[render]\nmode = \"off\"\n")?;
    project
        .command()?
        .args(["sanitize", "numpy-feedstock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    - {{ compiler }}\n"));
    Ok(())
}

#[test]
fn test_config_user_rule_applies() -> Result<()> {
    let project = project()?;
    project.write_config(
        r#"
[[rules]]
name = "drop-about"
pass = "cosmetic"
literal = "home:"
action = "delete-line"
"#,
    )?;
    project
        .command()?
        .args(["sanitize", "numpy-feedstock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home:").not())
        .stderr(predicate::str::contains("drop-about"));
    Ok(())
}

#[test]
fn test_invalid_rule_in_config_fails() -> Result<()> {
    let project = project()?;
    project.write_config(
        r#"
[[rules]]
name = "broken"
pass = "cosmetic"
pattern = "(unclosed"
action = "comment-line"
"#,
    )?;
    project
        .command()?
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid sanitization rule 'broken'"));
    Ok(())
}

#[test]
fn test_explicit_config_must_exist() -> Result<()> {
    let project = project()?;
    project
        .command()?
        .args(["--config", "missing.toml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}
