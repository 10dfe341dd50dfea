//! Render-pass diagnostics
//!
//! A failed render is never fatal: the renderer falls back to the sanitized text and
//! hands back one of these so callers can log or report what did not resolve.

use serde::Serialize;

use crate::core::AuditError;

/// Why a document (or one line of it) could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RenderError {
    /// An interpolation names an identifier missing from the render map
    UnknownIdentifier {
        identifier: String,
        suggestions: Vec<String>,
        line: Option<usize>,
    },

    /// Tera rejected the text itself
    Syntax {
        message: String,
        line: Option<usize>,
    },
}

impl RenderError {
    /// 1-based line in the sanitized document, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            RenderError::UnknownIdentifier {
                line,
                ..
            }
            | RenderError::Syntax {
                line,
                ..
            } => *line,
        }
    }

    /// Message with line number and "did you mean" hints.
    pub fn format_with_context(&self) -> String {
        let mut msg = self.to_string();
        if let Some(line) = self.line() {
            msg.push_str(&format!(" (line {line})"));
        }
        if let RenderError::UnknownIdentifier {
            suggestions,
            ..
        } = self
        {
            if !suggestions.is_empty() {
                msg.push_str(&format!("; did you mean {}?", suggestions.join(", ")));
            }
        }
        msg
    }

    /// Convert into the crate-wide error for one recipe.
    pub fn into_audit_error(self, recipe: &str) -> AuditError {
        AuditError::RenderFailure {
            recipe: recipe.to_string(),
            message: self.format_with_context(),
        }
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::UnknownIdentifier {
                identifier,
                ..
            } => write!(f, "Unknown template identifier '{identifier}'"),
            RenderError::Syntax {
                message,
                ..
            } => write!(f, "Template syntax error: {message}"),
        }
    }
}

impl std::error::Error for RenderError {}
