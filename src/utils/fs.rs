//! File system helpers: directory creation, atomic writes and recipe enumeration.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

use crate::core::AuditError;

/// Ensures a directory exists, creating it and its parents if necessary.
///
/// # Errors
///
/// Fails when the path exists but is not a directory, or when creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// The content goes to a uniquely named temporary file in the target directory,
/// is synced, then renamed over `path`. Readers never see a partial file and two
/// concurrent writers never share a temporary name.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Convenience wrapper around [`atomic_write`] for text.
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// List the recipe directories directly under the aggregate root.
///
/// Names are sorted, hidden directories (leading `.`) are skipped and, when a
/// `filter` is given, only names matching the glob are kept.
///
/// # Errors
///
/// [`AuditError::AggregateNotFound`] when `root` is not a readable directory. This is
/// the only failure that stops a whole run.
pub fn list_recipes(root: &Path, filter: Option<&glob::Pattern>) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(AuditError::AggregateNotFound {
            path: root.display().to_string(),
        }
        .into());
    }
    // Surface permission problems as the fatal error rather than an empty listing
    fs::read_dir(root).map_err(|_| AuditError::AggregateNotFound {
        path: root.display().to_string(),
    })?;

    let mut names = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable aggregate entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if filter.is_some_and(|pattern| !pattern.matches(&name)) {
            continue;
        }
        names.push(name);
    }

    tracing::debug!("Found {} recipe(s) under {}", names.len(), root.display());
    Ok(names)
}
