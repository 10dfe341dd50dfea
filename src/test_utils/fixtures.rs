//! Test fixtures for recipe trees and metadata documents
//!
//! [`MetaFixture`] holds sample `meta.yaml` documents; [`AggregateFixture`] lays out
//! an aggregate directory of recipes in a temporary directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::constants::{METADATA_FILE, RECIPE_SUBDIR, RUN_TEST_BAT, RUN_TEST_PY, RUN_TEST_SH};

/// Sample `meta.yaml` documents
#[derive(Clone, Debug)]
pub struct MetaFixture {
    pub name: String,
    pub content: String,
}

impl MetaFixture {
    /// Plain YAML with an import test, no templating
    pub fn imports_only(package: &str) -> Self {
        Self {
            name: "imports_only".to_string(),
            content: format!(
                "package:\n  name: {package}\n  version: 1.0.0\n\ntest:\n  imports:\n    - {package}\n"
            ),
        }
    }

    /// Templated document in the usual feedstock shape, with import and command tests
    pub fn templated(package: &str) -> Self {
        Self {
            name: "templated".to_string(),
            content: format!(
                r#"{{% set name = "{package}" %}}
{{% set version = "2.1.0" %}}

package:
  name: {{{{ name|lower }}}}
  version: {{{{ version }}}}

source:
  url: https://pypi.io/packages/source/{{{{ name[0] }}}}/{{{{ name }}}}/{{{{ name }}}}-{{{{ version }}}}.tar.gz
  sha256: 0000000000000000000000000000000000000000000000000000000000000000

build:
  number: 0
  script: {{{{ PYTHON }}}} -m pip install . -vv

requirements:
  build:
    - {{{{ compiler('c') }}}}
    - {{{{ stdlib("c") }}}}
  host:
    - python
    - pip
  run:
    - python
    - {{{{ pin_compatible('numpy', max_pin='x.x') }}}}

test:
  imports:
    - {package}
  requires:
    - pytest
  commands:
    - pip check
    - pytest --pyargs {package}  # [not win]

about:
  home: https://example.org/{package}
  license: MIT
"#
            ),
        }
    }

    /// Document without a `test` section
    pub fn no_test_section(package: &str) -> Self {
        Self {
            name: "no_test_section".to_string(),
            content: format!("package:\n  name: {package}\n\nbuild:\n  number: 0\n"),
        }
    }

    /// Document the sanitizer cannot rescue: a multi-line template expression
    pub fn unparseable() -> Self {
        Self {
            name: "unparseable".to_string(),
            content: "package:\n  name: broken\nrequirements:\n  run: [python,\n    {{ dep_list(\n      'a') }}\n"
                .to_string(),
        }
    }
}

/// Files a fixture recipe should contain.
#[derive(Clone, Debug, Default)]
pub struct RecipeSpec {
    pub name: String,
    pub meta: Option<String>,
    pub run_test_sh: bool,
    pub run_test_py: bool,
    pub run_test_bat: bool,
}

impl RecipeSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn meta(mut self, content: impl Into<String>) -> Self {
        self.meta = Some(content.into());
        self
    }

    pub fn sh(mut self) -> Self {
        self.run_test_sh = true;
        self
    }

    pub fn py(mut self) -> Self {
        self.run_test_py = true;
        self
    }

    pub fn bat(mut self) -> Self {
        self.run_test_bat = true;
        self
    }
}

/// Temporary aggregate directory populated with recipes.
///
/// ```rust,no_run
/// use recipe_audit_cli::test_utils::{AggregateFixture, MetaFixture, RecipeSpec};
///
/// # fn example() -> anyhow::Result<()> {
/// let fixture = AggregateFixture::new()?
///     .with_recipe(RecipeSpec::new("numpy-feedstock").meta(MetaFixture::templated("numpy").content).sh())?;
/// assert!(fixture.aggregate_dir().join("numpy-feedstock/recipe/run_test.sh").exists());
/// # Ok(())
/// # }
/// ```
pub struct AggregateFixture {
    temp_dir: TempDir,
    aggregate_dir: PathBuf,
}

impl AggregateFixture {
    /// Create `<tmp>/aggregate`.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let aggregate_dir = temp_dir.path().join("aggregate");
        fs::create_dir_all(&aggregate_dir).context("Failed to create aggregate dir")?;
        Ok(Self {
            temp_dir,
            aggregate_dir,
        })
    }

    /// Root of the temporary directory (parent of `aggregate/`).
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn aggregate_dir(&self) -> &Path {
        &self.aggregate_dir
    }

    /// Add a recipe; builder style.
    pub fn with_recipe(self, spec: RecipeSpec) -> Result<Self> {
        self.add_recipe(&spec)?;
        Ok(self)
    }

    /// Add a recipe and return its `recipe/` directory.
    pub fn add_recipe(&self, spec: &RecipeSpec) -> Result<PathBuf> {
        let dir = self.aggregate_dir.join(&spec.name).join(RECIPE_SUBDIR);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        if let Some(meta) = &spec.meta {
            fs::write(dir.join(METADATA_FILE), meta)?;
        }
        for (present, file, body) in [
            (spec.run_test_sh, RUN_TEST_SH, "#!/bin/bash\nset -ex\n"),
            (spec.run_test_py, RUN_TEST_PY, "import sys\n"),
            (spec.run_test_bat, RUN_TEST_BAT, "@echo on\n"),
        ] {
            if present {
                fs::write(dir.join(file), body)?;
            }
        }
        Ok(dir)
    }

    /// Write a file relative to the temporary root (e.g. a config file).
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }
}
