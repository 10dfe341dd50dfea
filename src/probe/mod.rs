//! Presence probing for recipe files.
//!
//! A recipe lives at `<aggregate>/<recipe>/recipe/` and may carry a `meta.yaml`
//! plus up to three test scripts. Probing is a pure filesystem predicate with no
//! state; a missing directory simply reports nothing present.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::constants::{METADATA_FILE, RECIPE_SUBDIR, RUN_TEST_BAT, RUN_TEST_PY, RUN_TEST_SH};

/// Which recipe files exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Presence {
    pub meta_yaml: bool,
    pub run_test_sh: bool,
    pub run_test_py: bool,
    pub run_test_bat: bool,
}

/// Number of test scripts a recipe carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptCoverage {
    None,
    One,
    Two,
    Three,
}

impl ScriptCoverage {
    pub const ALL: [ScriptCoverage; 4] =
        [ScriptCoverage::None, ScriptCoverage::One, ScriptCoverage::Two, ScriptCoverage::Three];

    pub fn from_count(count: usize) -> Self {
        match count {
            0 => ScriptCoverage::None,
            1 => ScriptCoverage::One,
            2 => ScriptCoverage::Two,
            _ => ScriptCoverage::Three,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScriptCoverage::None => "no test files",
            ScriptCoverage::One => "one test file",
            ScriptCoverage::Two => "two test files",
            ScriptCoverage::Three => "three test files",
        }
    }
}

impl Presence {
    /// Number of test scripts present (0..=3).
    pub fn script_count(&self) -> usize {
        [self.run_test_sh, self.run_test_py, self.run_test_bat].into_iter().filter(|p| *p).count()
    }

    pub fn coverage(&self) -> ScriptCoverage {
        ScriptCoverage::from_count(self.script_count())
    }

    /// Names of the present scripts, always in the order sh, py, bat.
    pub fn scripts(&self) -> Vec<&'static str> {
        [
            (self.run_test_sh, RUN_TEST_SH),
            (self.run_test_py, RUN_TEST_PY),
            (self.run_test_bat, RUN_TEST_BAT),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect()
    }
}

/// Directory holding a recipe's files.
pub fn recipe_dir(aggregate_root: &Path, recipe: &str) -> PathBuf {
    aggregate_root.join(recipe).join(RECIPE_SUBDIR)
}

/// Path of a recipe's metadata document.
pub fn metadata_path(aggregate_root: &Path, recipe: &str) -> PathBuf {
    recipe_dir(aggregate_root, recipe).join(METADATA_FILE)
}

/// Probe which files a recipe has.
pub fn probe(aggregate_root: &Path, recipe: &str) -> Presence {
    let dir = recipe_dir(aggregate_root, recipe);
    Presence {
        meta_yaml: dir.join(METADATA_FILE).is_file(),
        run_test_sh: dir.join(RUN_TEST_SH).is_file(),
        run_test_py: dir.join(RUN_TEST_PY).is_file(),
        run_test_bat: dir.join(RUN_TEST_BAT).is_file(),
    }
}

/// Whether the aggregate directory exists.
pub fn aggregate_available(aggregate_root: &Path) -> bool {
    aggregate_root.is_dir()
}
