use crate::links::{LinkResolver, LinkTarget, parse_target};
use crate::markup::{self, Inline, Line, LinkToken};
use crate::note::Note;

/// Longest label shown for a note before it is cut with an ellipsis.
pub const TITLE_CAP: usize = 32;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Cut `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Route that shows a note (or its editor).
pub fn note_href(relative_path: &str, edit_mode: bool) -> String {
    let mut href = format!("/?file={}", urlencoding::encode(relative_path));
    if edit_mode {
        href.push_str("&edit=1");
    }
    href
}

/// Render a note's body to an HTML fragment. Headings and paragraphs are the
/// only block structure; metadata lines are dropped.
pub fn render_note(note: &Note, resolver: &LinkResolver<'_>) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();

    fn flush(paragraph: &mut Vec<String>, blocks: &mut Vec<String>) {
        if !paragraph.is_empty() {
            blocks.push(format!("<p>{}</p>", paragraph.join("\n")));
            paragraph.clear();
        }
    }

    for line in markup::classify_lines(&note.content) {
        match line {
            Line::Metadata => {}
            Line::Blank => flush(&mut paragraph, &mut blocks),
            Line::Heading { level, text } => {
                flush(&mut paragraph, &mut blocks);
                let inner = render_inline(text, note, resolver);
                blocks.push(format!("<h{level}>{inner}</h{level}>"));
            }
            Line::Text(text) => {
                paragraph.push(render_inline(text, note, resolver));
            }
        }
    }
    flush(&mut paragraph, &mut blocks);
    blocks.join("\n")
}

/// Render one line of inline content. Only link markup is synthesized;
/// text and math spans are escaped, keeping the `$` delimiters for the client.
pub fn render_inline(line: &str, source: &Note, resolver: &LinkResolver<'_>) -> String {
    let mut out = String::with_capacity(line.len());
    for token in markup::inline_tokens(line) {
        match token {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Math(math) => out.push_str(&escape_html(math)),
            Inline::Url(url) => out.push_str(&external_link(url, url)),
            Inline::Link(link) => out.push_str(&render_link(link, source, resolver)),
        }
    }
    out
}

fn render_link(link: LinkToken<'_>, source: &Note, resolver: &LinkResolver<'_>) -> String {
    let label = link.label.map(str::trim).filter(|l| !l.is_empty());
    if let Some(target) = resolver.resolve(source, link.target) {
        let text = label.unwrap_or(target.title.as_str());
        return format!(
            "<a class='org-link' href='{}' title='{}'>{}</a>",
            escape_html(&note_href(&target.relative_path, false)),
            escape_html(text),
            escape_html(&truncate_label(text, TITLE_CAP)),
        );
    }
    match parse_target(link.target) {
        Some(LinkTarget::Web(url)) => external_link(&url, label.unwrap_or(url.as_str())),
        _ => escape_html(link.raw),
    }
}

fn external_link(url: &str, text: &str) -> String {
    format!(
        "<a class='org-link' href='{}' target='_blank' rel='noopener noreferrer'>{}</a>",
        escape_html(url),
        escape_html(text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::scan_notes;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn repo(files: &[(&str, &str)]) -> (TempDir, Vec<Note>) {
        let tmp = tempdir().unwrap();
        for (rel, body) in files {
            fs::write(tmp.path().join(rel), body).unwrap();
        }
        let notes = scan_notes(tmp.path()).unwrap();
        (tmp, notes)
    }

    fn render(tmp: &TempDir, notes: &[Note], rel: &str) -> String {
        let resolver = LinkResolver::new(tmp.path(), notes);
        let note = notes.iter().find(|n| n.relative_path == rel).unwrap();
        render_note(note, &resolver)
    }

    fn unescape(s: &str) -> String {
        s.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#x27;", "'")
            .replace("&amp;", "&")
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<b class="x">'&'</b>"#),
            "&lt;b class=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn truncate_label_rules() {
        assert_eq!(truncate_label("short", 32), "short");
        let long = "abcdefghijklmnopqrstuvwxyz0123456789";
        let cut = truncate_label(long, 32);
        assert_eq!(cut.chars().count(), 32);
        assert_eq!(cut, format!("{}...", &long[..29]));
        assert_eq!(truncate_label("abcdef", 2), "..");
    }

    #[test]
    fn href_is_url_encoded() {
        assert_eq!(note_href("a b/c.org", false), "/?file=a%20b%2Fc.org");
        assert_eq!(note_href("c.org", true), "/?file=c.org&edit=1");
    }

    #[test]
    fn headings_and_paragraphs() {
        let (tmp, notes) = repo(&[(
            "n.org",
            "#+TITLE: Hidden\n:PROPERTIES:\n:ID: zzz\n:END:\n** Section Title\nline one\nline two\n\nsecond\n***\n",
        )]);
        let html = render(&tmp, &notes, "n.org");
        assert_eq!(
            html,
            "<h2>Section Title</h2>\n<p>line one\nline two</p>\n<p>second</p>\n<h3></h3>"
        );
        assert!(!html.contains("Hidden"));
        assert!(!html.contains("zzz"));
    }

    #[test]
    fn empty_note_renders_empty_fragment() {
        let (tmp, notes) = repo(&[("e.org", ""), ("m.org", "#+TITLE: Only meta\n\n")]);
        assert_eq!(render(&tmp, &notes, "e.org"), "");
        assert_eq!(render(&tmp, &notes, "m.org"), "");
    }

    #[test]
    fn text_and_math_are_escaped() {
        let (tmp, notes) = repo(&[
            ("m.org", "a <script>alert(1)</script> & $x < y$"),
            ("x.org", "x $<img src=x onerror=alert(1)>$ y $e^{i\\pi}$"),
        ]);
        assert_eq!(
            render(&tmp, &notes, "m.org"),
            "<p>a &lt;script&gt;alert(1)&lt;/script&gt; &amp; $x &lt; y$</p>"
        );
        let html = render(&tmp, &notes, "x.org");
        assert!(!html.contains("<img"));
        assert_eq!(
            html,
            "<p>x $&lt;img src=x onerror=alert(1)&gt;$ y $e^{i\\pi}$</p>"
        );
    }

    #[test]
    fn plain_text_round_trips() {
        let body = "Tom & Jerry's \"quotes\" <tags> stay intact";
        let (tmp, notes) = repo(&[("p.org", body)]);
        let html = render(&tmp, &notes, "p.org");
        let inner = html.strip_prefix("<p>").and_then(|h| h.strip_suffix("</p>")).unwrap();
        assert_eq!(unescape(inner), body);
    }

    #[test]
    fn unresolved_link_is_plain_text() {
        let (tmp, notes) = repo(&[("a.org", "see [[missing.org]] and [[mailto:x@y.z][mail]]")]);
        let html = render(&tmp, &notes, "a.org");
        assert_eq!(html, "<p>see [[missing.org]] and [[mailto:x@y.z][mail]]</p>");
        assert!(!html.contains("<a"));
    }

    #[test]
    fn identifier_link_points_at_note() {
        let (tmp, notes) = repo(&[
            ("a.org", "#+TITLE: Note A\n:ID: abc123\nbody"),
            ("b.org", "go to [[id:abc123]] or [[a.org][custom label]]"),
        ]);
        let html = render(&tmp, &notes, "b.org");
        assert!(html.contains(
            "<a class='org-link' href='/?file=a.org' title='Note A'>Note A</a>"
        ));
        assert!(html.contains("title='custom label'>custom label</a>"));
    }

    #[test]
    fn long_titles_are_truncated_with_full_hover_text() {
        let title = "A very long note title that keeps going and going";
        let (tmp, notes) = repo(&[
            ("long.org", format!("#+TITLE: {title}").as_str()),
            ("src.org", "[[long.org]]"),
        ]);
        let html = render(&tmp, &notes, "src.org");
        let shown = format!("{}...", title.chars().take(TITLE_CAP - 3).collect::<String>());
        assert!(html.contains(&format!("title='{title}'>{shown}</a>")));
    }

    #[test]
    fn links_in_headings_and_web_links() {
        let (tmp, notes) = repo(&[
            ("a.org", "* About [[b.org]]\nvisit https://example.com/x?a=1&b=2"),
            ("b.org", "#+TITLE: Bee"),
        ]);
        let html = render(&tmp, &notes, "a.org");
        assert!(html.starts_with("<h1>About <a class='org-link' href='/?file=b.org'"));
        assert!(html.contains(
            "href='https://example.com/x?a=1&amp;b=2' target='_blank' rel='noopener noreferrer'>"
        ));
    }
}
