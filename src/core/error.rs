//! Error handling for recipe-audit
//!
//! This module provides the error types and user-friendly error reporting for the
//! auditor. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling inside the pipeline
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`AuditError`] - Enumerated failure cases
//! - [`ErrorContext`] - Wrapper that adds suggestions and details for display
//!
//! # Failure Scope
//!
//! Almost every failure is local to a single recipe. [`AuditError::MissingDocument`],
//! [`AuditError::RenderFailure`] and [`AuditError::ParseFailure`] are recorded against
//! the recipe and the batch carries on. Only [`AuditError::AggregateNotFound`] (the
//! recipe set cannot be enumerated) and configuration problems abort a run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use recipe_audit_cli::core::{AuditError, ErrorContext, user_friendly_error};
//!
//! let error = AuditError::AggregateNotFound {
//!     path: "aggregate".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for audit operations.
///
/// # Error Categories
///
/// ## Run-level (fatal)
/// - [`AggregateNotFound`] - The aggregate directory is missing or unreadable
/// - [`ConfigError`] - Configuration file could not be loaded
/// - [`InvalidRule`] - A sanitization rule failed to compile
///
/// ## Recipe-level (recorded, never fatal)
/// - [`MissingDocument`] - No `meta.yaml` for the recipe
/// - [`RenderFailure`] - The optional render pass could not resolve a construct
/// - [`ParseFailure`] - The sanitized document is still not valid YAML
///
/// [`AggregateNotFound`]: AuditError::AggregateNotFound
/// [`ConfigError`]: AuditError::ConfigError
/// [`InvalidRule`]: AuditError::InvalidRule
/// [`MissingDocument`]: AuditError::MissingDocument
/// [`RenderFailure`]: AuditError::RenderFailure
/// [`ParseFailure`]: AuditError::ParseFailure
#[derive(Error, Debug)]
pub enum AuditError {
    /// The aggregate directory holding all recipes could not be found or read.
    #[error("Aggregate directory not found: {path}")]
    AggregateNotFound {
        /// Path that was expected to contain recipe directories
        path: String,
    },

    /// The recipe has no metadata document.
    #[error("No metadata document for recipe '{recipe}' at {path}")]
    MissingDocument {
        /// Recipe (feedstock directory) name
        recipe: String,
        /// Path where the document was expected
        path: String,
    },

    /// Template rendering failed after sanitization.
    ///
    /// Callers fall back to the pre-render text; this error only travels as
    /// a diagnostic.
    #[error("Failed to render sanitized document for '{recipe}': {message}")]
    RenderFailure {
        /// Recipe name
        recipe: String,
        /// Renderer diagnostic
        message: String,
    },

    /// Structured-data parsing failed even after sanitization.
    #[error("Failed to parse sanitized document for '{recipe}': {message}")]
    ParseFailure {
        /// Recipe name
        recipe: String,
        /// Parser diagnostic
        message: String,
        /// 1-based line of the failure, when the parser reports one
        line: Option<usize>,
        /// 1-based column of the failure, when the parser reports one
        column: Option<usize>,
    },

    /// A sanitization rule is malformed.
    #[error("Invalid sanitization rule '{name}': {reason}")]
    InvalidRule {
        /// Rule name as declared in the rule table
        name: String,
        /// Why the rule was rejected
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for AuditError {
    fn clone(&self) -> Self {
        match self {
            Self::AggregateNotFound {
                path,
            } => Self::AggregateNotFound {
                path: path.clone(),
            },
            Self::MissingDocument {
                recipe,
                path,
            } => Self::MissingDocument {
                recipe: recipe.clone(),
                path: path.clone(),
            },
            Self::RenderFailure {
                recipe,
                message,
            } => Self::RenderFailure {
                recipe: recipe.clone(),
                message: message.clone(),
            },
            Self::ParseFailure {
                recipe,
                message,
                line,
                column,
            } => Self::ParseFailure {
                recipe: recipe.clone(),
                message: message.clone(),
                line: *line,
                column: *column,
            },
            Self::InvalidRule {
                name,
                reason,
            } => Self::InvalidRule {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // std::io::Error is not Clone, keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying user-facing suggestion and details.
///
/// ```rust,no_run
/// use recipe_audit_cli::core::{AuditError, ErrorContext};
///
/// let context = ErrorContext::new(AuditError::ConfigError {
///     message: "max_parallel must be at least 1".to_string(),
/// })
/// .with_suggestion("Set max_parallel to a positive number in recipe-audit.toml");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: AuditError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: AuditError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error (displayed in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error (displayed in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`AuditError`], [`std::io::Error`] and [`toml::de::Error`]; everything
/// else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(audit_error) = error.downcast_ref::<AuditError>() {
        return create_error_context(audit_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(AuditError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check read permissions on the aggregate directory and write permissions on the report directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(AuditError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(AuditError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in recipe-audit.toml. Verify quotes, brackets, and table names")
        .with_details("TOML parsing errors are usually caused by missing quotes or mismatched brackets");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AuditError::Other {
        message,
    })
}

fn create_error_context(error: AuditError) -> ErrorContext {
    match &error {
        AuditError::AggregateNotFound { path } => {
            let suggestion = format!(
                "Run from the directory that contains '{path}', or pass --aggregate <DIR>"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("The aggregate directory holds one sub-directory per recipe (feedstock)")
        }
        AuditError::MissingDocument { .. } => ErrorContext::new(error)
            .with_details("Recipes without recipe/meta.yaml are reported with no test declaration"),
        AuditError::ParseFailure { line, column, .. } => {
            let details = match (line, column) {
                (Some(line), Some(column)) => {
                    format!("The YAML parser stopped at line {line}, column {column}")
                }
                _ => "The YAML parser could not locate the failure".to_string(),
            };
            ErrorContext::new(error)
                .with_suggestion("Run 'recipe-audit sanitize <recipe>' to inspect the sanitized document")
                .with_details(details)
        }
        AuditError::InvalidRule { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the [[rules]] entry in recipe-audit.toml: each rule needs exactly one of 'literal' or 'pattern'")
            .with_details("Patterns use the syntax of the regex crate"),
        AuditError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check recipe-audit.toml or the file passed with --config"),
        _ => ErrorContext::new(error),
    }
}
