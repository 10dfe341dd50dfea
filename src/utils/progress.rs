//! Progress indicators for batch audits.
//!
//! Progress bars draw to stderr and disappear in non-interactive use: they are hidden
//! when `--no-progress` is passed, when `RECIPE_AUDIT_NO_PROGRESS` is set, or when
//! stderr is not a terminal.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;

use crate::constants::NO_PROGRESS_ENV_VAR;

/// Checks if progress bars should be disabled by the environment.
fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV_VAR).is_some() || !std::io::stderr().is_terminal()
}

/// A progress bar with consistent styling.
///
/// Cheap to clone; clones update the same bar, so batch workers can each hold one.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a progress bar tracking `len` units, hidden when progress is disabled.
    pub fn new(len: u64) -> Self {
        Self::with_visibility(len, !is_progress_disabled())
    }

    /// Creates a bar that is never drawn.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Creates a bar that is drawn only when `visible` is true.
    pub fn with_visibility(len: u64, visible: bool) -> Self {
        if !visible {
            let bar = Self::hidden();
            bar.inner.set_length(len);
            return bar;
        }
        let bar = IndicatifBar::new(len);
        bar.set_style(default_style());
        Self {
            inner: bar,
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
