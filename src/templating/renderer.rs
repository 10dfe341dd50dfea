//! Template rendering engine with Tera.
//!
//! [`TemplateRenderer`] wraps Tera with the identifier map and the two render
//! granularities of [`RenderMode`].

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::RenderError;
use super::{RenderMode, default_identifiers};

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Result of a render pass. Never an error: failures are listed and the affected text
/// is left as sanitized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderOutcome {
    pub text: String,
    /// Lines whose template syntax was resolved
    pub rendered_lines: usize,
    pub failures: Vec<RenderError>,
}

impl RenderOutcome {
    /// Whether any part of the document kept its pre-render text.
    pub fn fell_back(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Template renderer over a fixed identifier map.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    mode: RenderMode,
    identifiers: BTreeMap<String, String>,
    context: TeraContext,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(RenderMode::default(), default_identifiers())
    }
}

impl TemplateRenderer {
    /// Create a renderer. Every identifier is inserted into the Tera context as a string.
    pub fn new(mode: RenderMode, identifiers: BTreeMap<String, String>) -> Self {
        let mut context = TeraContext::new();
        for (name, value) in &identifiers {
            context.insert(name.as_str(), value);
        }
        Self {
            mode,
            identifiers,
            context,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn identifiers(&self) -> &BTreeMap<String, String> {
        &self.identifiers
    }

    /// Render sanitized text according to the configured mode.
    pub fn render(&self, text: &str) -> RenderOutcome {
        match self.mode {
            RenderMode::Off => RenderOutcome {
                text: text.to_string(),
                ..Default::default()
            },
            RenderMode::Document => match self.render_document(text) {
                Ok(rendered) => {
                    let rendered_lines = text.lines().filter(|l| is_renderable(l)).count();
                    RenderOutcome {
                        text: rendered,
                        rendered_lines,
                        failures: Vec::new(),
                    }
                }
                Err(e) => {
                    tracing::debug!("Document render failed, keeping sanitized text: {}", e);
                    RenderOutcome {
                        text: text.to_string(),
                        rendered_lines: 0,
                        failures: vec![e],
                    }
                }
            },
            RenderMode::Lines => self.render_lines(text),
        }
    }

    /// Render the whole document in one Tera pass.
    ///
    /// YAML comment lines are swapped for placeholders first: they are where the
    /// sanitizer parked control blocks and stray interpolations, and Tera must not see
    /// them.
    pub fn render_document(&self, text: &str) -> Result<String, RenderError> {
        let (protected, placeholders) = self.protect_comment_lines(text);
        let mut rendered = self.render_str(&protected)?;
        if text.ends_with('\n') && !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        Ok(self.restore_comment_lines(&rendered, placeholders))
    }

    fn render_lines(&self, text: &str) -> RenderOutcome {
        let mut out = String::with_capacity(text.len());
        let mut rendered_lines = 0;
        let mut failures = Vec::new();

        for (idx, line) in text.split_inclusive('\n').enumerate() {
            let body = line.trim_end_matches(['\n', '\r']);
            let ending = &line[body.len()..];

            if !is_renderable(body) {
                out.push_str(line);
                continue;
            }

            match self.render_str(body) {
                Ok(rendered) => {
                    rendered_lines += 1;
                    out.push_str(&rendered);
                    out.push_str(ending);
                }
                Err(e) => {
                    let e = with_line(e, idx + 1);
                    tracing::debug!("Line {} kept as sanitized: {}", idx + 1, e);
                    failures.push(e);
                    out.push_str(line);
                }
            }
        }

        RenderOutcome {
            text: out,
            rendered_lines,
            failures,
        }
    }

    fn render_str(&self, text: &str) -> Result<String, RenderError> {
        // Fresh instance per render; Tera::default() is just empty maps
        let mut tera = Tera::default();
        tera.render_str(text, &self.context).map_err(|e| self.parse_tera_error(&e))
    }

    /// Replace every YAML comment line with a unique placeholder line.
    pub(crate) fn protect_comment_lines(&self, content: &str) -> (String, HashMap<String, String>) {
        let mut placeholders = HashMap::new();
        let mut result = String::with_capacity(content.len());

        for line in content.split_inclusive('\n') {
            let body = line.trim_end_matches(['\n', '\r']);
            if body.trim_start().starts_with('#') {
                let placeholder_id = format!("__RECIPE_AUDIT_COMMENT_{}__", placeholders.len());
                result.push_str(&placeholder_id);
                result.push_str(&line[body.len()..]);
                placeholders.insert(placeholder_id, body.to_string());
            } else {
                result.push_str(line);
            }
        }

        tracing::trace!("Protected {} comment line(s)", placeholders.len());
        (result, placeholders)
    }

    pub(crate) fn restore_comment_lines(
        &self,
        content: &str,
        placeholders: HashMap<String, String>,
    ) -> String {
        let mut result = content.to_string();
        for (placeholder_id, original) in placeholders {
            result = result.replace(&placeholder_id, &original);
        }
        result
    }

    /// Parse a Tera error into a structured [`RenderError`]
    fn parse_tera_error(&self, error: &tera::Error) -> RenderError {
        let message = Self::format_tera_error(error);
        let line = Self::extract_line_from_tera_error(error);

        if let Some(identifier) = Self::extract_variable_name(&message) {
            let suggestions = self.find_similar_identifiers(&identifier);
            return RenderError::UnknownIdentifier {
                identifier,
                suggestions,
                line,
            };
        }

        RenderError::Syntax {
            message,
            line,
        }
    }

    /// Extract variable name from "Variable `foo` not found" message
    fn extract_variable_name(error_msg: &str) -> Option<String> {
        let re = Regex::new(r"Variable `([^`]+)` not found").ok()?;
        let caps = re.captures(error_msg)?;
        caps.get(1).map(|m| m.as_str().to_string())
    }

    /// Find similar identifier names using Levenshtein distance
    fn find_similar_identifiers(&self, target: &str) -> Vec<String> {
        let mut scored: Vec<_> =
            self.identifiers.keys().map(|name| (name.clone(), levenshtein(target, name))).collect();

        scored.sort_by_key(|(_, dist)| *dist);

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(name, _)| name)
            .collect()
    }

    /// Tera includes line:column information in parse error messages ("1:7", "15:23").
    fn extract_line_from_tera_error(error: &tera::Error) -> Option<usize> {
        let error_msg = format!("{:?}", error);
        let re = Regex::new(r"(\d+):(\d+)").ok()?;
        let caps = re.captures(&error_msg)?;
        caps.get(1)?.as_str().parse::<usize>().ok()
    }

    /// Flatten the Tera error chain, dropping the internal one-off template name.
    pub fn format_tera_error(error: &tera::Error) -> String {
        use std::error::Error;

        let mut all_messages = vec![error.to_string()];
        let mut current_error: Option<&dyn Error> = error.source();
        while let Some(err) = current_error {
            all_messages.push(err.to_string());
            current_error = err.source();
        }

        let messages: Vec<String> = all_messages
            .into_iter()
            .map(|msg| {
                msg.replace("while rendering '__tera_one_off'", "")
                    .replace("Failed to render '__tera_one_off'", "")
                    .replace("Failed to parse '__tera_one_off'", "")
                    .replace("'__tera_one_off'", "template")
                    .trim()
                    .to_string()
            })
            .filter(|msg| !msg.is_empty())
            .collect();

        if messages.is_empty() {
            "template could not be rendered".to_string()
        } else {
            messages.join(": ")
        }
    }
}

/// Lines the render pass touches: not a comment, has an interpolation, no block tags.
fn is_renderable(line: &str) -> bool {
    !line.trim_start().starts_with('#')
        && line.contains("{{")
        && !line.contains("{%")
        && !line.contains("{#")
}

fn with_line(error: RenderError, line: usize) -> RenderError {
    match error {
        RenderError::UnknownIdentifier {
            identifier,
            suggestions,
            ..
        } => RenderError::UnknownIdentifier {
            identifier,
            suggestions,
            line: Some(line),
        },
        RenderError::Syntax {
            message,
            ..
        } => RenderError::Syntax {
            message,
            line: Some(line),
        },
    }
}
