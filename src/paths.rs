//! Relative-path normalization and containment checks for the notes root.
//! Link resolution and the edit path both go through here so they agree on
//! what "inside the notes directory" means. Edits additionally pass
//! [`resolve_within`], which checks the real path behind any symlinks.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("no note path given")]
    Empty,
    #[error("{0} points outside the notes directory")]
    OutsideRoot(String),
}

/// Lexically normalize a `/`-separated relative path: backslashes become
/// slashes, `.` segments drop out and `..` pops a segment. Leading slashes are
/// ignored so `/a/b` is read as root-relative. Returns `None` when `..` would
/// climb above the root.
pub fn normalize_relative(raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Join a note key under `root`, rejecting anything that escapes it.
pub fn join_under(root: &Path, rel: &str) -> Result<PathBuf, PathError> {
    if rel.trim().is_empty() {
        return Err(PathError::Empty);
    }
    if Path::new(rel).is_absolute() && !Path::new(rel).starts_with(root) {
        return Err(PathError::OutsideRoot(rel.to_string()));
    }
    let rel_to_root = relative_to_root(root, rel);
    let normalized = normalize_relative(&rel_to_root)
        .ok_or_else(|| PathError::OutsideRoot(rel.to_string()))?;
    if normalized.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(root.join(normalized))
}

/// Resolve symlinks in `path` and require the real file to sit inside the
/// real `root`. Lexical checks alone let a link inside the root point out.
pub fn resolve_within(root: &Path, path: &Path) -> Result<PathBuf, PathError> {
    let outside = || PathError::OutsideRoot(path.display().to_string());
    let real_root = fs::canonicalize(root).map_err(|_| outside())?;
    let real = fs::canonicalize(path).map_err(|_| outside())?;
    if real.starts_with(&real_root) { Ok(real) } else { Err(outside()) }
}

/// Strip `root` from an absolute path that lives inside it; other input is
/// returned unchanged.
pub fn relative_to_root(root: &Path, raw: &str) -> String {
    match Path::new(raw).strip_prefix(root) {
        Ok(rest) if Path::new(raw).is_absolute() => {
            rest.to_string_lossy().replace('\\', "/")
        }
        _ => raw.to_string(),
    }
}

/// Key for a scanned file: its path below `root`, `/`-separated.
pub fn note_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let key = rel.to_string_lossy().replace('\\', "/");
    normalize_relative(&key).filter(|k| !k.is_empty())
}
