//! Defines the structured-text [`Block`] type returned by the content API and
//! converts lists of blocks into plain text ([`as_text`]) and HTML
//! ([`as_html`]).
//!
//! A block carries its raw text plus a list of [`Span`]s which decorate ranges
//! of that text (bold, italics, links, labels). Span offsets count characters,
//! not bytes.

use pulldown_cmark::escape::{escape_href, escape_html};
use serde::Deserialize;

/// A single structured-text block, e.g., a paragraph or a heading.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Block {
    /// The block type (`paragraph`, `heading2`, `list-item`, `image`, ...).
    #[serde(rename = "type")]
    pub kind: String,

    /// The raw text of the block. Empty for images and embeds.
    #[serde(default)]
    pub text: String,

    /// Decorations over character ranges of `text`.
    #[serde(default)]
    pub spans: Vec<Span>,

    /// The image source for `image` blocks.
    #[serde(default)]
    pub url: Option<String>,

    /// The image alt text for `image` blocks.
    #[serde(default)]
    pub alt: Option<String>,

    /// The oEmbed payload for `embed` blocks.
    #[serde(default)]
    pub oembed: Option<Embed>,
}

/// A decoration over the character range `start..end` of a block's text.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,

    /// The span type (`strong`, `em`, `hyperlink`, `label`).
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: Option<SpanData>,
}

/// Extra data attached to `hyperlink` and `label` spans.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Embed {
    #[serde(default)]
    pub html: Option<String>,
}

/// Joins the text of every block with a single space.
pub fn as_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Renders blocks as HTML. Consecutive list items are grouped into a single
/// `<ul>` or `<ol>`. Blocks of unknown type are dropped.
pub fn as_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut list: Option<&'static str> = None;

    for block in blocks {
        let wanted = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };
        if list != wanted {
            if let Some(tag) = list {
                out.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = wanted {
                out.push_str(&format!("<{}>", tag));
            }
            list = wanted;
        }
        push_block(&mut out, block);
    }

    if let Some(tag) = list {
        out.push_str(&format!("</{}>", tag));
    }
    out
}

fn push_block(out: &mut String, block: &Block) {
    let tag = match block.kind.as_str() {
        "paragraph" => "p",
        "preformatted" => "pre",
        "list-item" | "o-list-item" => "li",
        "heading1" => "h1",
        "heading2" => "h2",
        "heading3" => "h3",
        "heading4" => "h4",
        "heading5" => "h5",
        "heading6" => "h6",
        "image" => {
            out.push_str(r#"<p class="block-img"><img src=""#);
            let _ = escape_href(&mut *out, block.url.as_deref().unwrap_or_default());
            out.push_str(r#"" alt=""#);
            let _ = escape_html(&mut *out, block.alt.as_deref().unwrap_or_default());
            out.push_str(r#"" /></p>"#);
            return;
        }
        "embed" => {
            // oEmbed markup comes from the CMS and is trusted as-is.
            if let Some(html) = block.oembed.as_ref().and_then(|e| e.html.as_ref()) {
                out.push_str(r#"<div class="block-embed">"#);
                out.push_str(html);
                out.push_str("</div>");
            }
            return;
        }
        other => {
            tracing::debug!(kind = other, "skipping rich text block of unknown type");
            return;
        }
    };

    out.push_str(&format!("<{}>", tag));
    push_spans(out, &block.text, &block.spans);
    out.push_str(&format!("</{}>", tag));
}

/// Writes `text` with its spans applied. Spans that overlap without nesting
/// are closed and reopened around the inner boundary so the output stays
/// well-formed.
fn push_spans(out: &mut String, text: &str, spans: &[Span]) {
    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start <= chars.len())
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut open: Vec<&Span> = Vec::new();
    let mut pending = String::new();
    let mut next = 0;

    for i in 0..=chars.len() {
        if open.iter().any(|s| s.end <= i) {
            flush_text(out, &mut pending);
            let mut reopen = Vec::new();
            while let Some(span) = open.pop() {
                close_span(out, span);
                if span.end > i {
                    reopen.push(span);
                }
                if open.iter().all(|s| s.end > i) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                open_span(out, span);
                open.push(span);
            }
        }

        while next < spans.len() && spans[next].start == i {
            flush_text(out, &mut pending);
            open_span(out, spans[next]);
            open.push(spans[next]);
            next += 1;
        }

        if let Some(c) = chars.get(i) {
            pending.push(*c);
        }
    }

    flush_text(out, &mut pending);
    while let Some(span) = open.pop() {
        close_span(out, span);
    }
}

fn flush_text(out: &mut String, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut escaped = String::with_capacity(pending.len());
    let _ = escape_html(&mut escaped, pending.as_str());
    out.push_str(&escaped.replace('\n', "<br />"));
    pending.clear();
}

fn open_span(out: &mut String, span: &Span) {
    let data = span.data.as_ref();
    match span.kind.as_str() {
        "strong" => out.push_str("<strong>"),
        "em" => out.push_str("<em>"),
        "hyperlink" => {
            out.push_str(r#"<a href=""#);
            let url = data.and_then(|d| d.url.as_deref()).unwrap_or_default();
            let _ = escape_href(&mut *out, url);
            out.push('"');
            if let Some(target) = data.and_then(|d| d.target.as_deref()) {
                out.push_str(r#" target=""#);
                let _ = escape_html(&mut *out, target);
                out.push_str(r#"" rel="noopener""#);
            }
            out.push('>');
        }
        "label" => {
            out.push_str(r#"<span class=""#);
            let label = data.and_then(|d| d.label.as_deref()).unwrap_or_default();
            let _ = escape_html(&mut *out, label);
            out.push_str(r#"">"#);
        }
        _ => out.push_str("<span>"),
    }
}

fn close_span(out: &mut String, span: &Span) {
    match span.kind.as_str() {
        "strong" => out.push_str("</strong>"),
        "em" => out.push_str("</em>"),
        "hyperlink" => out.push_str("</a>"),
        _ => out.push_str("</span>"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn paragraph(text: &str) -> Block {
        Block {
            kind: String::from("paragraph"),
            text: String::from(text),
            ..Block::default()
        }
    }

    fn span(kind: &str, start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            kind: String::from(kind),
            data: None,
        }
    }

    #[test]
    fn test_as_text_joins_blocks_with_space() {
        let blocks = vec![paragraph("Hello there"), paragraph("world")];
        assert_eq!("Hello there world", as_text(&blocks));
    }

    #[test]
    fn test_as_text_empty() {
        assert_eq!("", as_text(&[]));
    }

    #[test]
    fn test_as_html_escapes_text() {
        let blocks = vec![paragraph("a < b & c")];
        assert_eq!("<p>a &lt; b &amp; c</p>", as_html(&blocks));
    }

    #[test]
    fn test_as_html_spans() {
        let mut block = paragraph("bold and em");
        block.spans = vec![span("strong", 0, 4), span("em", 9, 11)];
        assert_eq!(
            "<p><strong>bold</strong> and <em>em</em></p>",
            as_html(&[block])
        );
    }

    #[test]
    fn test_as_html_overlapping_spans_stay_well_formed() {
        let mut block = paragraph("abcd");
        block.spans = vec![span("strong", 0, 3), span("em", 1, 4)];
        assert_eq!(
            "<p><strong>a<em>bc</em></strong><em>d</em></p>",
            as_html(&[block])
        );
    }

    #[test]
    fn test_as_html_hyperlink() {
        let mut block = paragraph("see here");
        block.spans = vec![Span {
            start: 4,
            end: 8,
            kind: String::from("hyperlink"),
            data: Some(SpanData {
                url: Some(String::from("https://example.org/")),
                ..SpanData::default()
            }),
        }];
        assert_eq!(
            r#"<p>see <a href="https://example.org/">here</a></p>"#,
            as_html(&[block])
        );
    }

    #[test]
    fn test_as_html_groups_list_items() {
        let item = |kind: &str, text: &str| Block {
            kind: String::from(kind),
            text: String::from(text),
            ..Block::default()
        };
        let blocks = vec![
            item("list-item", "one"),
            item("list-item", "two"),
            item("o-list-item", "first"),
            paragraph("after"),
        ];
        assert_eq!(
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>",
            as_html(&blocks)
        );
    }

    #[test]
    fn test_as_html_image() {
        let block = Block {
            kind: String::from("image"),
            url: Some(String::from("https://images.example.org/a.png")),
            alt: Some(String::from("a \"quoted\" alt")),
            ..Block::default()
        };
        assert_eq!(
            concat!(
                r#"<p class="block-img"><img src="https://images.example.org/a.png" "#,
                r#"alt="a &quot;quoted&quot; alt" /></p>"#,
            ),
            as_html(&[block])
        );
    }

    #[test]
    fn test_as_html_line_breaks() {
        assert_eq!("<p>one<br />two</p>", as_html(&[paragraph("one\ntwo")]));
    }

    #[test]
    fn test_deserialize_block() -> serde_json::Result<()> {
        let block: Block = serde_json::from_str(
            r#"{"type":"heading2","text":"Hi","spans":[{"start":0,"end":2,"type":"em"}]}"#,
        )?;
        assert_eq!("heading2", block.kind);
        assert_eq!(vec![span("em", 0, 2)], block.spans);
        assert_eq!("<h2><em>Hi</em></h2>", as_html(&[block]));
        Ok(())
    }
}
