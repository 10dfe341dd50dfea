//! Core types for recipe-audit
//!
//! Currently this is the error system: [`AuditError`] for precise handling inside the
//! pipeline, [`ErrorContext`] and [`user_friendly_error`] for CLI display.

pub mod error;

pub use error::{AuditError, ErrorContext, user_friendly_error};
