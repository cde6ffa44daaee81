use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::markup;
use crate::paths;

pub const NOTE_EXT: &str = "org";
const SKIP_DIRS: &[&str] = &[".git", ".venv", "venv", "__pycache__"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub path: PathBuf,
    /// Path below the notes root, `/`-separated. Unique key of the note.
    pub relative_path: String,
    pub title: String,
    pub id: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub content: String,
}

impl Note {
    /// Sortable `YYYYMMDDhhmm` form of the creation hint.
    pub fn created_key(&self) -> Option<i64> {
        self.created.map(|dt| {
            i64::from(dt.year()) * 100_000_000
                + i64::from(dt.month()) * 1_000_000
                + i64::from(dt.day()) * 10_000
                + i64::from(dt.hour()) * 100
                + i64::from(dt.minute())
        })
    }
}

pub fn is_note_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(NOTE_EXT))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

/// Recursively collect every note below `root`, ordered by lowercased
/// relative path. Files that cannot be read are left out; only a missing or
/// unreadable root is an error.
pub fn scan_notes(root: &Path) -> io::Result<Vec<Note>> {
    let meta = fs::metadata(root)?;
    if !meta.is_dir() {
        return Err(io::Error::other(format!(
            "notes root {} is not a directory",
            root.display()
        )));
    }

    let mut notes = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_note_file(entry.path()) {
            continue;
        }
        match read_note(root, entry.path()) {
            Ok(note) => notes.push(note),
            Err(err) => {
                log::debug!("skipping {}: {err}", entry.path().display());
            }
        }
    }

    notes.sort_by_cached_key(|n| n.relative_path.to_lowercase());
    Ok(notes)
}

/// Read one note file and derive its metadata.
pub fn read_note(root: &Path, path: &Path) -> io::Result<Note> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let relative_path = paths::note_key(root, path).ok_or_else(|| {
        io::Error::other(format!("{} is outside {}", path.display(), root.display()))
    })?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    Ok(Note {
        path: path.to_path_buf(),
        relative_path,
        title: extract_title(&content, stem),
        id: extract_id(&content),
        created: extract_created(&content).or_else(|| file_time(path)),
        content,
    })
}

pub fn extract_title(content: &str, fallback: &str) -> String {
    content
        .lines()
        .find_map(markup::title_marker)
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn extract_id(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(markup::id_marker)
        .map(|id| id.trim().to_string())
}

/// Creation hint from a `CREATED:` line, falling back to the first Org
/// timestamp anywhere in the text.
pub fn extract_created(content: &str) -> Option<NaiveDateTime> {
    content
        .lines()
        .filter_map(markup::created_marker)
        .find_map(|value| markup::first_timestamp(value).and_then(to_datetime))
        .or_else(|| markup::first_timestamp(content).and_then(to_datetime))
}

fn to_datetime(
    (year, month, day, hour, minute): (i32, u32, u32, u32, u32),
) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn file_time(path: &Path) -> Option<NaiveDateTime> {
    let meta = fs::metadata(path).ok()?;
    let stamp = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::<Local>::from(stamp).naive_local())
}

/// Look up a scanned note by its relative path.
pub fn find_note<'a>(notes: &'a [Note], key: &str) -> Option<&'a Note> {
    let key = paths::normalize_relative(key)?;
    notes.iter().find(|n| n.relative_path == key)
}
