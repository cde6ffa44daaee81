//! Resolution of `[[...]]` link targets to scanned notes.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use crate::note::{NOTE_EXT, Note};
use crate::paths;

/// What a link target refers to, before lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Path relative to the linking note (or root-relative with a leading `/`).
    Path(String),
    /// Declared `:ID:` value, lowercased.
    Id(String),
    /// Web URL; never a note.
    Web(String),
    /// Any other scheme (`mailto:`, `elisp:` ...).
    Other,
}

/// Classify a raw link target. Search options (`::...`) and anchors
/// (`#...`) are dropped. Returns `None` for an empty target.
pub fn parse_target(raw: &str) -> Option<LinkTarget> {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(LinkTarget::Web(trimmed.to_string()));
    }
    let mut target = trimmed;
    if let Some((head, _)) = target.split_once("::") {
        target = head;
    }
    if let Some((head, _)) = target.split_once('#') {
        target = head;
    }
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    if target.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("id:")) {
        let id = target[3..].trim();
        return (!id.is_empty()).then(|| LinkTarget::Id(id.to_lowercase()));
    }
    if let Some(path) = target.strip_prefix("file:") {
        return Some(LinkTarget::Path(path.to_string()));
    }
    if target.contains("://") {
        return Some(LinkTarget::Other);
    }
    let has_note_ext = target
        .to_ascii_lowercase()
        .ends_with(&format!(".{NOTE_EXT}"));
    if target.contains(':') && !has_note_ext {
        return Some(LinkTarget::Other);
    }
    Some(LinkTarget::Path(target.to_string()))
}

/// Lookup tables over one scan. Identifiers follow first-match-wins in scan
/// order when several notes declare the same one.
pub struct LinkResolver<'a> {
    root: &'a Path,
    by_path: HashMap<&'a str, &'a Note>,
    by_id: HashMap<String, &'a Note>,
}

impl<'a> LinkResolver<'a> {
    pub fn new(root: &'a Path, notes: &'a [Note]) -> Self {
        let mut by_path = HashMap::with_capacity(notes.len());
        let mut by_id: HashMap<String, &'a Note> = HashMap::new();
        for note in notes {
            by_path.insert(note.relative_path.as_str(), note);
            if let Some(id) = &note.id {
                match by_id.entry(id.to_lowercase()) {
                    Entry::Occupied(existing) => {
                        log::debug!(
                            "id {id} declared by both {} and {}; keeping the first",
                            existing.get().relative_path,
                            note.relative_path
                        );
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(note);
                    }
                }
            }
        }
        Self { root, by_path, by_id }
    }

    /// Resolve `raw_target` as written inside `source`. Anything that does
    /// not name exactly one scanned note comes back as `None`.
    pub fn resolve(&self, source: &Note, raw_target: &str) -> Option<&'a Note> {
        match parse_target(raw_target)? {
            LinkTarget::Id(id) => self.by_id.get(&id).copied(),
            LinkTarget::Path(path) => self.resolve_path(&source.relative_path, &path),
            LinkTarget::Web(_) | LinkTarget::Other => None,
        }
    }

    pub fn by_path(&self, key: &str) -> Option<&'a Note> {
        self.by_path.get(key).copied()
    }

    fn resolve_path(&self, source_rel: &str, target: &str) -> Option<&'a Note> {
        let target_path = Path::new(target);
        let joined = if target_path.is_absolute()
            && target_path.starts_with(self.root)
        {
            paths::relative_to_root(self.root, target)
        } else if target.starts_with('/') {
            target.to_string()
        } else {
            match source_rel.rsplit_once('/') {
                Some((dir, _)) => format!("{dir}/{target}"),
                None => target.to_string(),
            }
        };
        let candidate = paths::normalize_relative(&joined)?;
        if candidate.is_empty() {
            return None;
        }
        if let Some(note) = self.by_path(&candidate) {
            return Some(note);
        }
        if !candidate.ends_with(&format!(".{NOTE_EXT}")) {
            return self.by_path(&format!("{candidate}.{NOTE_EXT}"));
        }
        None
    }
}
