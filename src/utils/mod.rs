//! Utilities shared by the pipeline and the CLI
//!
//! - [`fs`] - directory creation, atomic writes, recipe enumeration
//! - [`progress`] - progress bars for batch runs

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, list_recipes, safe_write};
pub use progress::ProgressBar;
