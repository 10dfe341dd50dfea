//! Common test utilities for recipe-audit integration tests
//!
//! Wraps [`AggregateFixture`] with a runner for the `recipe-audit` binary so
//! command tests read as "lay out recipes, run a command, inspect output".

// Not every helper is used by every test file
#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::path::{Path, PathBuf};

pub use recipe_audit_cli::test_utils::{AggregateFixture, MetaFixture, RecipeSpec};

/// Temporary project: `<tmp>/aggregate/` plus a working directory at `<tmp>/`.
pub struct TestProject {
    fixture: AggregateFixture,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        recipe_audit_cli::test_utils::init_test_logging(None);
        Ok(Self {
            fixture: AggregateFixture::new()?,
        })
    }

    /// Working directory for commands (parent of `aggregate/`)
    pub fn project_dir(&self) -> &Path {
        self.fixture.path()
    }

    pub fn aggregate_dir(&self) -> &Path {
        self.fixture.aggregate_dir()
    }

    pub fn fixture(&self) -> &AggregateFixture {
        &self.fixture
    }

    pub fn add_recipe(&self, spec: RecipeSpec) -> Result<PathBuf> {
        self.fixture.add_recipe(&spec)
    }

    /// Write `recipe-audit.toml` into the working directory.
    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        self.fixture.write_file("recipe-audit.toml", content)
    }

    /// `recipe-audit` command running in the project directory, progress bars and
    /// colors disabled.
    pub fn command(&self) -> Result<Command> {
        let mut cmd =
            Command::cargo_bin("recipe-audit").context("recipe-audit binary not built")?;
        cmd.current_dir(self.project_dir())
            .env("RECIPE_AUDIT_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("RECIPE_AUDIT_CONFIG")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }

    /// Run `recipe-audit` with `args` and capture the output.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.command()?.args(args).output().context("Failed to run recipe-audit")?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Captured process output
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Fail with both streams in the message unless the command succeeded.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "command failed (code {:?})\nstdout:\n{}\nstderr:\n{}",
            self.code, self.stdout, self.stderr
        );
        self
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.stdout)
            .with_context(|| format!("stdout is not JSON:\n{}", self.stdout))
    }
}
