//! Integration test suite for recipe-audit
//!
//! End-to-end tests over temporary aggregate directories. These run quickly and
//! need nothing beyond the built binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **batch**: library-level batch audits, failure isolation and summary counts
//! - **cli**: the `recipe-audit` binary: list, audit, report, sanitize, configuration

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod batch;
mod cli;
