//! Line-oriented tokenizer for Org notes.
//!
//! The scanner, the renderer and the backlink index all read note text
//! through this module, so metadata markers and link syntax are recognized
//! the same way everywhere.

use regex::Regex;
use std::sync::LazyLock;

/// Deepest heading level emitted as HTML.
pub const MAX_HEADING_LEVEL: usize = 6;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*#\+TITLE:\s*(.+?)\s*$").unwrap());
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*:ID:\s*(\S+)\s*$").unwrap());
static CREATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#\+)?CREATED:\s*(.+?)\s*$").unwrap()
});
static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\+[A-Za-z0-9_-]+:").unwrap());
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\[<](\d{4})-(\d{2})-(\d{2})(?:\s+[^\s\]>\d]+)?(?:\s+(\d{2}):(\d{2}))?[\]>]",
    )
    .unwrap()
});
static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<link>\[\[(?P<target>[^\]]+)\](?:\[(?P<label>[^\]]*)\])?\])",
        r"|(?P<math>\$[^\s$](?:[^$\n]*?[^\s$])?\$)",
        r#"|(?P<url>https?://[^\s<>'"()\[\]]+)"#,
    ))
    .unwrap()
});

/// One classified line of note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    /// Keyword, property drawer or marker line; never rendered.
    Metadata,
    Heading { level: usize, text: &'a str },
    Text(&'a str),
}

/// A `[[target]]` or `[[target][label]]` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkToken<'a> {
    /// The whole bracketed token as written.
    pub raw: &'a str,
    pub target: &'a str,
    pub label: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inline<'a> {
    Text(&'a str),
    Link(LinkToken<'a>),
    /// `$...$` span, delimiters included.
    Math(&'a str),
    Url(&'a str),
}

pub fn title_marker(line: &str) -> Option<&str> {
    TITLE_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn id_marker(line: &str) -> Option<&str> {
    ID_RE.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Value of a `#+CREATED:` / `CREATED:` line, if the line is one.
pub fn created_marker(line: &str) -> Option<&str> {
    CREATED_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Date/time fields of the first Org timestamp in `text`:
/// `(year, month, day, hour, minute)`.
pub fn first_timestamp(text: &str) -> Option<(i32, u32, u32, u32, u32)> {
    TIMESTAMP_RE.captures_iter(text).find_map(|caps| {
        let num = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>());
        let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let month = num(2)?.ok()?;
        let day = num(3)?.ok()?;
        let hour = num(4).transpose().ok()?.unwrap_or(0);
        let minute = num(5).transpose().ok()?.unwrap_or(0);
        Some((year, month, day, hour, minute))
    })
}

fn is_metadata_line(line: &str) -> bool {
    KEYWORD_RE.is_match(line)
        || ID_RE.is_match(line)
        || created_marker(line).is_some_and(|v| first_timestamp(v).is_some())
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let stars = trimmed.len() - trimmed.trim_start_matches('*').len();
    if stars == 0 {
        return None;
    }
    let rest = &trimmed[stars..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some((stars.min(MAX_HEADING_LEVEL), rest.trim()))
    } else {
        None
    }
}

fn is_drawer(line: &str, name: &str) -> bool {
    line.trim().eq_ignore_ascii_case(name)
}

/// Classify every line of `content`. A `:PROPERTIES:` drawer only counts as
/// metadata when a closing `:END:` follows it.
pub fn classify_lines(content: &str) -> Vec<Line<'_>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut in_drawer = false;
    // A drawer can only close if some `:END:` follows it at all.
    let last_end = lines.iter().rposition(|l| is_drawer(l, ":END:"));

    for (idx, line) in lines.iter().enumerate() {
        if in_drawer {
            if is_drawer(line, ":END:") {
                in_drawer = false;
            }
            out.push(Line::Metadata);
            continue;
        }
        if is_drawer(line, ":PROPERTIES:") {
            in_drawer = last_end.is_some_and(|end| end > idx);
            out.push(Line::Metadata);
            continue;
        }
        if line.trim().is_empty() {
            out.push(Line::Blank);
        } else if is_metadata_line(line) {
            out.push(Line::Metadata);
        } else if let Some((level, text)) = heading(line) {
            out.push(Line::Heading { level, text });
        } else {
            out.push(Line::Text(line));
        }
    }
    out
}

/// Split one line into plain text, links, math spans and bare URLs.
pub fn inline_tokens(line: &str) -> Vec<Inline<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for caps in INLINE_RE.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            out.push(Inline::Text(&line[cursor..whole.start()]));
        }
        if caps.name("link").is_some() {
            let target = caps.name("target").map_or("", |m| m.as_str());
            let label = caps.name("label").map(|m| m.as_str());
            out.push(Inline::Link(LinkToken { raw: whole.as_str(), target, label }));
        } else if caps.name("math").is_some() {
            out.push(Inline::Math(whole.as_str()));
        } else {
            out.push(Inline::Url(whole.as_str()));
        }
        cursor = whole.end();
    }
    if cursor < line.len() {
        out.push(Inline::Text(&line[cursor..]));
    }
    out
}

/// Every link token in `content`, in order of appearance.
pub fn link_tokens(content: &str) -> impl Iterator<Item = LinkToken<'_>> {
    content.lines().flat_map(|line| {
        inline_tokens(line).into_iter().filter_map(|tok| match tok {
            Inline::Link(link) => Some(link),
            _ => None,
        })
    })
}
