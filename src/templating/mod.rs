//! Optional render pass over sanitized documents.
//!
//! After sanitization most interpolations are bare identifiers such as `{{ compiler }}`
//! or `{{ pin }}`. Rendering them with a fixed identifier map turns them into plain
//! scalars (`compiler`, `pin`) so the YAML parser sees ordinary strings. The map is
//! not used for real value computation; it only has to print *something*.
//!
//! Rendering is best-effort. See [`RenderMode`] for the granularity of the fallback.

pub mod error;
pub mod renderer;

pub use error::RenderError;
pub use renderer::{RenderOutcome, TemplateRenderer};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the render pass treats a sanitized document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Skip rendering entirely
    Off,
    /// Render the whole document at once; any failure keeps the sanitized text
    Document,
    /// Render each templated line on its own; a failing line keeps its sanitized text
    #[default]
    Lines,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RenderMode::Off => "off",
            RenderMode::Document => "document",
            RenderMode::Lines => "lines",
        })
    }
}

/// Built-in identifier map: identifier -> printed value.
pub fn default_identifiers() -> BTreeMap<String, String> {
    [
        ("compiler", "compiler"),
        ("cdt", "cdt"),
        ("stdlib", "stdlib"),
        ("pin", "pin"),
        ("pin_subpackage", "pin"),
        ("pin_compatible", "pin"),
        ("os", "os"),
        ("environ", "environment"),
        ("select", "select"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
