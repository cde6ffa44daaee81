//! Terminal output for the note listing: colors, column widths and the
//! plain-text table layout.

use chrono::NaiveDateTime;
use yansi::Paint;

/// Color palette for consistent theming
pub struct ColorPalette {
    pub muted: (u8, u8, u8),     // paths, empty cells
    pub header: (u8, u8, u8),    // table header
    pub timestamp: (u8, u8, u8), // created column
    pub highlight: (u8, u8, u8), // search matches
    pub count: (u8, u8, u8),     // backlink counts
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        muted: (108, 112, 134),     // Gray
        header: (148, 226, 213),    // Teal
        timestamp: (137, 180, 250), // Blue
        highlight: (243, 139, 168), // Pink
        count: (249, 226, 175),     // Yellow
    };
}

/// Formatting context passed through the listing
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
}

impl FormatContext {
    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN }
    }

    /// Colors unless `--plain` was passed or `NO_COLOR` is set.
    pub fn from_env(plain: bool) -> Self {
        Self::new(!plain && std::env::var("NO_COLOR").is_err())
    }

    fn paint(&self, text: &str, (r, g, b): (u8, u8, u8), bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }
        let painted = Paint::rgb(text, r, g, b);
        if bold { painted.bold().to_string() } else { painted.to_string() }
    }

    pub fn format_header(&self, text: &str) -> String {
        self.paint(text, self.palette.header, true)
    }

    pub fn format_path(&self, path: &str) -> String {
        self.paint(path, self.palette.muted, false)
    }

    pub fn format_count(&self, count: usize) -> String {
        if count == 0 {
            return self.paint("0", self.palette.muted, false);
        }
        self.paint(&count.to_string(), self.palette.count, true)
    }

    pub fn format_created(&self, created: Option<NaiveDateTime>) -> String {
        match created {
            Some(dt) => self.paint(&dt.format("%Y-%m-%d %H:%M").to_string(), self.palette.timestamp, false),
            None => self.paint("-", self.palette.muted, false),
        }
    }

    /// Color every case-insensitive occurrence of `query` in `text`.
    pub fn highlight_match(&self, text: &str, query: Option<&str>) -> String {
        let Some(q) = query else { return text.to_string() };
        let lower = text.to_lowercase();
        // Lowercasing can change byte offsets outside ASCII; skip those.
        if q.is_empty() || !self.use_color || lower.len() != text.len() {
            return text.to_string();
        }

        let q_lower = q.to_lowercase();
        let mut out = String::new();
        let mut cursor = 0;
        for (pos, _) in lower.match_indices(&q_lower) {
            if !text.is_char_boundary(pos + q_lower.len()) {
                continue;
            }
            out.push_str(&text[cursor..pos]);
            let matched = &text[pos..pos + q_lower.len()];
            out.push_str(&self.paint(matched, self.palette.highlight, false));
            cursor = pos + q_lower.len();
        }
        out.push_str(&text[cursor..]);
        out
    }
}

/// Width of the attached terminal, if any.
pub fn terminal_columns() -> Option<usize> {
    terminal_size::terminal_size().map(|(terminal_size::Width(w), _)| w as usize)
}

/// Render a simple text table. Column widths come from the widest cell
/// using display lengths that ignore ANSI color codes.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_len(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_len(cell));
        }
    }

    let header_row = format_row(headers, &widths);
    let mut out = header_row.clone();
    out.push('\n');
    out.push_str(&"=".repeat(display_len(&header_row)));
    for row in rows {
        out.push('\n');
        out.push_str(format_row(row, &widths).trim_end());
    }
    out
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    row.iter()
        .zip(widths.iter())
        .map(|(cell, width)| {
            let padding = width.saturating_sub(display_len(cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Visible length of a string, ignoring ANSI escape sequences.
pub fn display_len(s: &str) -> usize {
    let mut len = 0;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
            continue;
        }
        len += 1;
    }
    len
}
