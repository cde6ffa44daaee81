//! In-place replacement of a note's text.
//!
//! Writes are not coordinated between callers: two concurrent edits of the
//! same note must be serialized by whoever drives this module.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::note::{find_note, scan_notes};
use crate::paths::{self, PathError};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("no note named {0:?} in the notes directory")]
    NotFound(String),
    #[error("{0:?} is outside the notes directory")]
    OutsideRoot(String),
    #[error("could not write {key:?}: {source}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
}

impl EditError {
    /// Short code carried back to the page for the status line.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::NotFound(_) => "missing",
            EditError::OutsideRoot(_) => "outside",
            EditError::Write { .. } => "write",
        }
    }
}

/// Replace the full text of the note at `key` (a path below `root`).
///
/// The target must be a note the scanner lists, and its real path (after
/// following symlinks) must stay inside `root`. The new text is written to a
/// temporary file next to it and then moved over it, so a failure leaves the
/// old content in place. Returns the note's path.
pub fn apply_edit(root: &Path, key: &str, content: &str) -> Result<PathBuf, EditError> {
    let target = paths::join_under(root, key).map_err(|err| match err {
        PathError::Empty => EditError::NotFound(key.to_string()),
        PathError::OutsideRoot(_) => EditError::OutsideRoot(key.to_string()),
    })?;
    let rel = paths::note_key(root, &target).ok_or_else(|| EditError::NotFound(key.to_string()))?;

    let notes = scan_notes(root).map_err(|source| EditError::Write {
        key: key.to_string(),
        source,
    })?;
    let note = find_note(&notes, &rel).ok_or_else(|| EditError::NotFound(key.to_string()))?;

    // Write through a symlinked note rather than replacing the link.
    let dest = paths::resolve_within(root, &note.path)
        .map_err(|_| EditError::OutsideRoot(key.to_string()))?;
    write_atomic(&dest, content).map_err(|source| EditError::Write {
        key: key.to_string(),
        source,
    })?;
    log::info!("saved {} ({} bytes)", note.path.display(), content.len());
    Ok(note.path.clone())
}

fn write_atomic(dest: &Path, content: &str) -> io::Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(dest) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(dest).map_err(|err| err.error)?;
    Ok(())
}
