//! Configuration for recipe-audit
//!
//! Settings come from an optional TOML file, then CLI flags override them.
//!
//! # Lookup order
//!
//! 1. `--config <path>` (must exist)
//! 2. `RECIPE_AUDIT_CONFIG` environment variable (must exist)
//! 3. `recipe-audit.toml` in the current directory (optional)
//! 4. Built-in defaults
//!
//! # Example
//!
//! ```toml
//! aggregate_dir = "~/src/aggregate"
//! report_dir = "Report"
//! scratch_dir = "Temp"
//! max_parallel = 8
//!
//! [render]
//! mode = "lines"          # off | document | lines
//!
//! [render.identifiers]
//! PYTHON = "python"       # extra identifier -> printed value
//!
//! [[rules]]               # appended to the built-in sanitization rules
//! name = "mpi-variant"
//! pass = "macro-calls"
//! pattern = '''\{\{\s*mpi_variant\s*\([^)]*\)\s*\}\}'''
//! action = "replace"
//! replacement = "{{ mpi }}"
//! ```
//!
//! Path values are expanded with `shellexpand` (`~` and `$VAR`); relative paths are
//! relative to the working directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_AGGREGATE_DIR, DEFAULT_REPORT_DIR,
    default_max_parallel,
};
use crate::core::AuditError;
use crate::sanitize::{RuleSpec, Sanitizer};
use crate::templating::{RenderMode, TemplateRenderer, default_identifiers};

fn default_aggregate_dir() -> PathBuf {
    PathBuf::from(DEFAULT_AGGREGATE_DIR)
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_DIR)
}

/// Render pass settings (`[render]` table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSettings {
    #[serde(default)]
    pub mode: RenderMode,
    /// Extra identifiers, merged over the built-in map
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub identifiers: BTreeMap<String, String>,
}

/// Complete audit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Directory holding one sub-directory per recipe
    #[serde(default = "default_aggregate_dir")]
    pub aggregate_dir: PathBuf,

    /// Where Markdown reports are written
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// When set, each recipe's sanitized document is kept here as `<recipe>-meta.yaml`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Maximum recipes processed concurrently (default: max(4, 2 x cores))
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    #[serde(default)]
    pub render: RenderSettings,

    /// User sanitization rules, appended to the built-in table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            aggregate_dir: default_aggregate_dir(),
            report_dir: default_report_dir(),
            scratch_dir: None,
            max_parallel: None,
            render: RenderSettings::default(),
            rules: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Load configuration following the lookup order, relative to `cwd`.
    ///
    /// Returns the configuration and the file it came from, if any.
    pub async fn load(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>)> {
        let path = Self::resolve_path(explicit, std::env::var_os(CONFIG_ENV_VAR), cwd)?;
        match path {
            Some(path) => {
                let config = Self::load_from(&path).await?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Pick the configuration file. Explicit and environment paths must exist; the
    /// working-directory file is optional.
    pub fn resolve_path(
        explicit: Option<&Path>,
        env_value: Option<OsString>,
        cwd: &Path,
    ) -> Result<Option<PathBuf>> {
        let required = explicit
            .map(|p| (p.to_path_buf(), "--config"))
            .or_else(|| env_value.filter(|v| !v.is_empty()).map(|v| (PathBuf::from(v), CONFIG_ENV_VAR)));

        if let Some((path, origin)) = required {
            let path = expand_path(&path)?;
            let path = if path.is_relative() {
                cwd.join(path)
            } else {
                path
            };
            if !path.is_file() {
                return Err(AuditError::ConfigError {
                    message: format!("config file from {origin} not found: {}", path.display()),
                }
                .into());
            }
            return Ok(Some(path));
        }

        let local = cwd.join(CONFIG_FILE_NAME);
        Ok(local.is_file().then_some(local))
    }

    /// Load and validate configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        config.expanded()
    }

    /// Check values that TOML types alone cannot.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.max_parallel == Some(0) {
            return Err(AuditError::ConfigError {
                message: "max_parallel must be at least 1".to_string(),
            });
        }
        // Compile user rules now so a bad pattern fails at load, not mid-run
        self.sanitizer()?;
        Ok(())
    }

    /// Copy with `~` and environment variables expanded in every path.
    pub fn expanded(mut self) -> Result<Self> {
        self.aggregate_dir = expand_path(&self.aggregate_dir)?;
        self.report_dir = expand_path(&self.report_dir)?;
        if let Some(scratch) = self.scratch_dir.take() {
            self.scratch_dir = Some(expand_path(&scratch)?);
        }
        Ok(self)
    }

    /// Concurrency limit for batch audits.
    pub fn effective_max_parallel(&self) -> usize {
        self.max_parallel.filter(|n| *n > 0).unwrap_or_else(default_max_parallel)
    }

    /// Sanitizer over the built-in rules plus `[[rules]]`.
    pub fn sanitizer(&self) -> Result<Sanitizer, AuditError> {
        Sanitizer::with_user_rules(&self.rules)
    }

    /// Renderer for the configured mode with the merged identifier map.
    pub fn renderer(&self) -> TemplateRenderer {
        let mut identifiers = default_identifiers();
        identifiers.extend(self.render.identifiers.iter().map(|(k, v)| (k.clone(), v.clone())));
        TemplateRenderer::new(self.render.mode, identifiers)
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| AuditError::ConfigError {
        message: format!("cannot expand path '{raw}': {e}"),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
