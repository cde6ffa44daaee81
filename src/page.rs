//! Builds the three HTML fragments of the notes page and fills them into the
//! page template.

use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;

use crate::backlinks::BacklinkIndex;
use crate::links::LinkResolver;
use crate::note::{Note, find_note};
use crate::render::{TITLE_CAP, escape_html, note_href, render_note, truncate_label};

pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/index.html");

const NAV_SLOT: &str = "{{NAV_ITEMS}}";
const MAIN_SLOT: &str = "{{MAIN_CONTENT}}";
const BACKLINKS_SLOT: &str = "{{BACKLINKS}}";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    Path,
    Title,
    Backlinks,
    Created,
}

impl SortMode {
    /// Direction used when neither `--asc` nor `--desc` was given.
    pub fn default_ascending(self) -> bool {
        self == SortMode::Path
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(SortMode::Path),
            "title" => Ok(SortMode::Title),
            "backlinks" | "links" => Ok(SortMode::Backlinks),
            "created" => Ok(SortMode::Created),
            other => Err(format!(
                "Unknown sort mode: {other} (expected path|title|backlinks|created)"
            )),
        }
    }
}

/// Order `notes` in place. Ties fall back to path order.
pub fn sort_notes(notes: &mut [&Note], mode: SortMode, index: &BacklinkIndex, ascending: bool) {
    notes.sort_by(|a, b| {
        let by_path = || a.relative_path.to_lowercase().cmp(&b.relative_path.to_lowercase());
        let ord = match mode {
            SortMode::Path => Ordering::Equal,
            SortMode::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortMode::Backlinks => index
                .count(&a.relative_path)
                .cmp(&index.count(&b.relative_path)),
            SortMode::Created => a.created_key().cmp(&b.created_key()),
        }
        .then_with(by_path);
        if ascending { ord } else { ord.reverse() }
    });
}

/// Status line shown above the note after an edit round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Saved,
    Rejected(&'static str),
}

impl Status {
    /// Map a status code (`saved` or an edit rejection code) to a status.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "saved" => Some(Status::Saved),
            "missing" => Some(Status::Rejected("missing")),
            "outside" => Some(Status::Rejected("outside")),
            "write" => Some(Status::Rejected("write")),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Status::Saved => "Saved successfully.",
            Status::Rejected("outside") => "That path is outside the notes directory.",
            Status::Rejected("write") => "Could not write this file.",
            Status::Rejected(_) => "Select a valid .org file first.",
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            Status::Saved => "success",
            Status::Rejected(_) => "error",
        }
    }
}

/// What the caller asked to see.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub selected: Option<String>,
    pub edit_mode: bool,
    pub sort: SortMode,
    /// `None` keeps the sort mode's own default direction.
    pub ascending: Option<bool>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFragments {
    pub nav: String,
    pub main: String,
    pub backlinks: String,
}

impl PageFragments {
    /// Fill the template's slots in one pass; slot markers inside the
    /// fragments themselves are left as they are.
    pub fn fill(&self, template: &str) -> String {
        let slots = [
            (NAV_SLOT, self.nav.as_str()),
            (MAIN_SLOT, self.main.as_str()),
            (BACKLINKS_SLOT, self.backlinks.as_str()),
        ];
        let mut out = String::with_capacity(
            template.len() + self.nav.len() + self.main.len() + self.backlinks.len(),
        );
        let mut rest = template;
        while let Some(pos) = rest.find("{{") {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            match slots.iter().find(|(slot, _)| tail.starts_with(slot)) {
                Some((slot, fragment)) => {
                    out.push_str(fragment);
                    rest = &tail[slot.len()..];
                }
                None => {
                    out.push_str("{{");
                    rest = &tail[2..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Build the fragments for one page view over a fresh scan.
pub fn build_fragments(root: &Path, notes: &[Note], request: &PageRequest) -> PageFragments {
    let selected = request
        .selected
        .as_deref()
        .and_then(|key| find_note(notes, key))
        .or_else(|| notes.first());
    let Some(selected) = selected else {
        return PageFragments {
            nav: String::new(),
            main: "<p>No .org files were found in this directory.</p>".to_string(),
            backlinks: "<p class='backlinks-empty'>Open a note to see backlinks.</p>".to_string(),
        };
    };

    let resolver = LinkResolver::new(root, notes);
    let index = BacklinkIndex::build(notes, &resolver);

    PageFragments {
        nav: nav_items(notes, selected, &index, request),
        main: main_content(selected, &resolver, request),
        backlinks: backlink_items(notes, selected, &index, request.edit_mode),
    }
}

fn title_and_path(note: &Note) -> String {
    format!(
        "<span class='file-title' title='{}'>{}</span><span class='file-path' title='{}'>{}</span>",
        escape_html(&note.title),
        escape_html(&truncate_label(&note.title, TITLE_CAP)),
        escape_html(&note.relative_path),
        escape_html(&truncate_label(&note.relative_path, TITLE_CAP)),
    )
}

fn nav_items(notes: &[Note], selected: &Note, index: &BacklinkIndex, request: &PageRequest) -> String {
    let mut ordered: Vec<&Note> = notes.iter().collect();
    let ascending = request.ascending.unwrap_or(request.sort.default_ascending());
    sort_notes(&mut ordered, request.sort, index, ascending);

    ordered
        .iter()
        .map(|note| {
            let active = if note.relative_path == selected.relative_path { "active" } else { "" };
            let searchable = format!("{} {}", note.title, note.relative_path).to_lowercase();
            let created = note.created_key().map(|k| k.to_string()).unwrap_or_default();
            format!(
                "<a class='file-link {active}' data-search='{}' data-backlinks='{}' data-created-ts='{created}' href='{}'>{}</a>",
                escape_html(&searchable),
                index.count(&note.relative_path),
                escape_html(&note_href(&note.relative_path, false)),
                title_and_path(note),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn main_content(selected: &Note, resolver: &LinkResolver<'_>, request: &PageRequest) -> String {
    let rel = &selected.relative_path;
    let toggle = if request.edit_mode {
        format!("<a class='mode-link' href='{}'>Preview</a>", escape_html(&note_href(rel, false)))
    } else {
        format!("<a class='mode-link' href='{}'>Edit</a>", escape_html(&note_href(rel, true)))
    };
    let status = request
        .status
        .as_ref()
        .map(|s| format!("<p class='status status-{}'>{}</p>", s.level(), escape_html(s.message())))
        .unwrap_or_default();

    if request.edit_mode {
        format!(
            "<h2>Editing {}</h2><div class='toolbar'>{toggle}</div>{status}\
             <form class='editor-form' method='post' action='/edit'>\
             <input type='hidden' name='file' value='{}'>\
             <textarea class='editor-box' name='content'>{}</textarea>\
             <button class='submit-btn' type='submit'>Submit</button></form>",
            escape_html(rel),
            escape_html(rel),
            escape_html(&selected.content),
        )
    } else {
        format!(
            "<h2>{}</h2><div class='toolbar'>{toggle}</div>{status}<article class='org-content'>{}</article>",
            escape_html(rel),
            render_note(selected, resolver),
        )
    }
}

fn backlink_items(notes: &[Note], selected: &Note, index: &BacklinkIndex, edit_mode: bool) -> String {
    let sources = index.backlinks_of(notes, &selected.relative_path);
    if sources.is_empty() {
        return "<p class='backlinks-empty'>No notes link to this note yet.</p>".to_string();
    }
    sources
        .iter()
        .map(|source| {
            format!(
                "<a class='backlink-item' href='{}'>{}</a>",
                escape_html(&note_href(&source.relative_path, edit_mode)),
                title_and_path(source),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::scan_notes;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn sample() -> (TempDir, Vec<Note>) {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.org"), "#+TITLE: Alpha\n:ID: abc123\n#+CREATED: [2024-01-02]\nHello").unwrap();
        fs::write(tmp.path().join("b.org"), "#+TITLE: Beta\nsee [[id:abc123]]").unwrap();
        fs::write(tmp.path().join("c.org"), "#+TITLE: <Gamma>\n[[a.org]] [[b.org]]").unwrap();
        let notes = scan_notes(tmp.path()).unwrap();
        (tmp, notes)
    }

    #[test]
    fn fragments_for_selected_note() {
        let (tmp, notes) = sample();
        let request = PageRequest { selected: Some("a.org".into()), ..Default::default() };
        let page = build_fragments(tmp.path(), &notes, &request);

        assert!(page.nav.contains("class='file-link active'"));
        assert!(page.nav.contains("data-backlinks='2'"));
        assert!(page.nav.contains("data-created-ts='202401020000'"));
        assert!(page.nav.contains("&lt;Gamma&gt;"));
        assert!(page.main.starts_with("<h2>a.org</h2>"));
        assert!(page.main.contains("<article class='org-content'><p>Hello</p></article>"));
        assert!(page.main.contains("href='/?file=a.org&amp;edit=1'>Edit</a>"));

        let first_backlink = page.backlinks.lines().next().unwrap();
        assert!(first_backlink.contains("href='/?file=c.org'"));
        assert!(page.backlinks.contains("href='/?file=b.org'"));
    }

    #[test]
    fn unknown_selection_falls_back_to_first_note() {
        let (tmp, notes) = sample();
        let request = PageRequest { selected: Some("../etc/passwd".into()), ..Default::default() };
        let page = build_fragments(tmp.path(), &notes, &request);
        assert!(page.main.starts_with("<h2>a.org</h2>"));
    }

    #[test]
    fn edit_mode_shows_escaped_source_and_status() {
        let (tmp, notes) = sample();
        let request = PageRequest {
            selected: Some("c.org".into()),
            edit_mode: true,
            status: Status::from_code("write"),
            ..Default::default()
        };
        let page = build_fragments(tmp.path(), &notes, &request);
        assert!(page.main.contains("<h2>Editing c.org</h2>"));
        assert!(page.main.contains("#+TITLE: &lt;Gamma&gt;\n[[a.org]] [[b.org]]</textarea>"));
        assert!(page.main.contains("<p class='status status-error'>Could not write this file.</p>"));
        assert!(page.backlinks.contains("No notes link to this note yet."));
    }

    #[test]
    fn empty_repository() {
        let tmp = tempdir().unwrap();
        let page = build_fragments(tmp.path(), &[], &PageRequest::default());
        assert!(page.nav.is_empty());
        assert!(page.main.contains("No .org files were found"));
    }

    #[test]
    fn sort_modes_order_navigation() {
        let (tmp, notes) = sample();
        let order = |request: &PageRequest| -> Vec<String> {
            build_fragments(tmp.path(), &notes, request)
                .nav
                .lines()
                .map(|l| l.split("href='/?file=").nth(1).unwrap().split('\'').next().unwrap().to_string())
                .collect()
        };
        let request = PageRequest { sort: SortMode::Backlinks, ..Default::default() };
        assert_eq!(order(&request), vec!["a.org", "b.org", "c.org"]);

        assert_eq!(order(&PageRequest::default()), vec!["a.org", "b.org", "c.org"]);
        let request = PageRequest { sort: SortMode::Path, ascending: Some(false), ..Default::default() };
        assert_eq!(order(&request), vec!["c.org", "b.org", "a.org"]);

        let request = PageRequest { sort: SortMode::Title, ascending: Some(true), ..Default::default() };
        let page = build_fragments(tmp.path(), &notes, &request);
        assert!(page.nav.lines().next().unwrap().contains("&lt;Gamma&gt;"));
    }

    #[test]
    fn template_slots_are_filled() {
        let fragments = PageFragments {
            nav: "N".into(),
            main: "M".into(),
            backlinks: "B".into(),
        };
        let page = fragments.fill(DEFAULT_TEMPLATE);
        assert!(!page.contains("{{"));
        assert_eq!(fragments.fill("[{{NAV_ITEMS}}|{{MAIN_CONTENT}}|{{BACKLINKS}}]"), "[N|M|B]");
        assert_eq!(fragments.fill("{{ {{x}} {{NAV_ITEMS}}"), "{{ {{x}} N");
    }

    #[test]
    fn slot_markers_in_notes_stay_literal() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("n.org"), "#+TITLE: {{BACKLINKS}}\nbody {{NAV_ITEMS}}").unwrap();
        let notes = scan_notes(tmp.path()).unwrap();
        let page = build_fragments(tmp.path(), &notes, &PageRequest::default());
        let filled = page.fill("[{{NAV_ITEMS}}][{{MAIN_CONTENT}}][{{BACKLINKS}}]");
        assert!(filled.contains("body {{NAV_ITEMS}}"));
        assert!(filled.contains("title='{{BACKLINKS}}'"));
        assert!(filled.ends_with("[<p class='backlinks-empty'>No notes link to this note yet.</p>]"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(Status::from_code("saved").unwrap().level(), "success");
        assert_eq!(Status::from_code("missing").unwrap().message(), "Select a valid .org file first.");
        assert!(Status::from_code("bogus").is_none());
        assert_eq!("Created".parse::<SortMode>(), Ok(SortMode::Created));
        assert!("size".parse::<SortMode>().is_err());
    }
}
