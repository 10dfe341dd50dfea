//! Global constants used throughout the recipe-audit codebase.
//!
//! File names and directory layout of a recipe, default locations and
//! parallelism limits live here so the magic strings are discoverable.

/// Sub-directory of a feedstock that holds the recipe files.
pub const RECIPE_SUBDIR: &str = "recipe";

/// Templated metadata document of a recipe.
pub const METADATA_FILE: &str = "meta.yaml";

/// Shell test script.
pub const RUN_TEST_SH: &str = "run_test.sh";

/// Python test script.
pub const RUN_TEST_PY: &str = "run_test.py";

/// Windows batch test script.
pub const RUN_TEST_BAT: &str = "run_test.bat";

/// Default aggregate directory (relative to the working directory).
pub const DEFAULT_AGGREGATE_DIR: &str = "aggregate";

/// Default directory for Markdown reports.
pub const DEFAULT_REPORT_DIR: &str = "Report";

/// Name of the project configuration file searched in the working directory.
pub const CONFIG_FILE_NAME: &str = "recipe-audit.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "RECIPE_AUDIT_CONFIG";

/// Environment variable that disables progress bars when set.
pub const NO_PROGRESS_ENV_VAR: &str = "RECIPE_AUDIT_NO_PROGRESS";

/// Minimum number of recipes processed concurrently regardless of CPU count.
pub const MIN_PARALLELISM: usize = 4;

/// Multiplier applied to CPU core count for default parallelism.
///
/// Recipe processing is mostly file reads plus short CPU bursts.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Upper bound on fixpoint iterations for repeating sanitization rules.
pub const MAX_RULE_REPEAT: usize = 16;

/// Default parallelism: `max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)`.
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(1);
    std::cmp::max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)
}
