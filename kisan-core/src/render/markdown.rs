//! Restricted markdown transformer
//!
//! Only three constructs are recognized, matching what the farmer query
//! service emits:
//!
//! - `### title` at the start of a line becomes a heading
//! - `**text**` becomes bold (leftmost-first, non-overlapping)
//! - consecutive lines starting with `- ` become one list
//!
//! Everything else, including unmatched delimiters, passes through as text.
//! The output is a typed [`Document`]; turning it into markup always goes
//! through [`Document::to_html`], which escapes every text run.

use once_cell::sync::Lazy;
use regex::Regex;

use super::sanitize::{escape_text, SafeHtml};

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"));

const HEADING_PREFIX: &str = "### ";
const LIST_PREFIX: &str = "- ";

/// Inline fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
}

impl Inline {
    pub fn text(&self) -> &str {
        match self {
            Inline::Text(t) | Inline::Bold(t) => t,
        }
    }
}

/// Block fragment; one per source line except lists, which group lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A plain line (possibly empty)
    Line(Vec<Inline>),
    /// A `### ` heading
    Heading(Vec<Inline>),
    /// A run of `- ` lines, one entry per item
    List(Vec<Vec<Inline>>),
}

/// Transformed message content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Transform restricted markdown into fragments. Pure and total.
pub fn transform(input: &str) -> Document {
    let mut blocks = Vec::new();
    let mut items: Vec<Vec<Inline>> = Vec::new();

    for line in input.split('\n') {
        if let Some(item) = line.strip_prefix(LIST_PREFIX) {
            items.push(parse_inline(item));
            continue;
        }
        if !items.is_empty() {
            blocks.push(Block::List(std::mem::take(&mut items)));
        }
        match line.strip_prefix(HEADING_PREFIX) {
            Some(heading) => blocks.push(Block::Heading(parse_inline(heading))),
            None => blocks.push(Block::Line(parse_inline(line))),
        }
    }
    if !items.is_empty() {
        blocks.push(Block::List(items));
    }

    Document { blocks }
}

fn parse_inline(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    let mut last = 0;

    for caps in BOLD_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            inlines.push(Inline::Text(text[last..whole.start()].to_string()));
        }
        inlines.push(Inline::Bold(inner.as_str().to_string()));
        last = whole.end();
    }
    if last < text.len() {
        inlines.push(Inline::Text(text[last..].to_string()));
    }
    inlines
}

impl Document {
    /// A document that shows `text` verbatim, line by line
    pub fn plain(text: &str) -> Self {
        let blocks = text
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    Block::Line(Vec::new())
                } else {
                    Block::Line(vec![Inline::Text(line.to_string())])
                }
            })
            .collect();
        Self { blocks }
    }

    /// Render as sanitized HTML. Only `<p>`, `<br/>`, `<h3>`, `<ul>`, `<li>`
    /// and `<strong>` are ever emitted; all text is escaped.
    pub fn to_html(&self) -> SafeHtml {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Line(inlines) if inlines.is_empty() => out.push_str("<br/>"),
                Block::Line(inlines) => {
                    out.push_str("<p>");
                    push_inline_html(&mut out, inlines);
                    out.push_str("</p>");
                }
                Block::Heading(inlines) => {
                    out.push_str("<h3>");
                    push_inline_html(&mut out, inlines);
                    out.push_str("</h3>");
                }
                Block::List(items) => {
                    out.push_str("<ul>");
                    for item in items {
                        out.push_str("<li>");
                        push_inline_html(&mut out, item);
                        out.push_str("</li>");
                    }
                    out.push_str("</ul>");
                }
            }
        }
        SafeHtml::from_trusted(out)
    }

    /// Markup-free text; list items are prefixed with a bullet
    pub fn to_plain_text(&self) -> String {
        self.render_lines(|inlines| inlines.iter().map(Inline::text).collect(), "• ", "")
    }

    /// Back to the markdown subset; `transform(doc.to_markdown()) == doc`
    pub fn to_markdown(&self) -> String {
        self.render_lines(inline_markdown, LIST_PREFIX, HEADING_PREFIX)
    }

    fn render_lines(
        &self,
        inline: impl Fn(&[Inline]) -> String,
        item_prefix: &str,
        heading_prefix: &str,
    ) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Line(inlines) => lines.push(inline(inlines)),
                Block::Heading(inlines) => {
                    lines.push(format!("{}{}", heading_prefix, inline(inlines)))
                }
                Block::List(items) => {
                    for item in items {
                        lines.push(format!("{}{}", item_prefix, inline(item)));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

fn inline_markdown(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(t) => t.clone(),
            Inline::Bold(t) => format!("**{}**", t),
        })
        .collect()
}

fn push_inline_html(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(t) => out.push_str(&escape_text(t)),
            Inline::Bold(t) => {
                out.push_str("<strong>");
                out.push_str(&escape_text(t));
                out.push_str("</strong>");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn bold(s: &str) -> Inline {
        Inline::Bold(s.to_string())
    }

    #[test]
    fn test_bold_then_list() {
        let doc = transform("**Hi** \n- a\n- b");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Line(vec![bold("Hi"), text(" ")]),
                Block::List(vec![vec![text("a")], vec![text("b")]]),
            ]
        );
    }

    #[test]
    fn test_heading_with_bold() {
        let doc = transform("### **धान** की खेती");
        assert_eq!(
            doc.blocks,
            vec![Block::Heading(vec![bold("धान"), text(" की खेती")])]
        );
    }

    #[test]
    fn test_list_grouping_stops_at_plain_line() {
        let doc = transform("- a\n- b\nnext\n- c");
        assert_eq!(
            doc.blocks,
            vec![
                Block::List(vec![vec![text("a")], vec![text("b")]]),
                Block::Line(vec![text("next")]),
                Block::List(vec![vec![text("c")]]),
            ]
        );
    }

    #[test]
    fn test_bold_pairs_leftmost_first() {
        let doc = transform("**a** b **c** **d");
        assert_eq!(
            doc.blocks,
            vec![Block::Line(vec![
                bold("a"),
                text(" b "),
                bold("c"),
                text(" **d"),
            ])]
        );
    }

    #[test]
    fn test_unmatched_and_near_miss_pass_through() {
        for input in ["**open", "##no heading", "-not a list", "###x"] {
            assert_eq!(transform(input).to_markdown(), input);
            assert_eq!(transform(input).to_plain_text(), input);
        }
    }

    #[test]
    fn test_idempotent_on_plain_text() {
        for input in ["", "plain", "दो पंक्ति\nवाला पाठ", "a < b & c\n\n"] {
            let once = transform(input);
            let twice = transform(&once.to_markdown());
            assert_eq!(once, twice);
            assert_eq!(once.to_plain_text(), input);
        }
    }

    #[test]
    fn test_markdown_round_trip_of_subset() {
        let input = "### शीर्षक\n**जैविक** खाद\n- एक\n- **दो**";
        assert_eq!(transform(input).to_markdown(), input);
    }

    #[test]
    fn test_html_escapes_text_runs() {
        let html = transform("**<b>x</b>**\n<script>alert(1)</script>").to_html();
        assert_eq!(
            html.as_str(),
            "<p><strong>&lt;b&gt;x&lt;/b&gt;</strong></p>\
             <p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_html_structure() {
        let html = transform("### T\n\n- a\n- b").to_html();
        assert_eq!(
            html.as_str(),
            "<h3>T</h3><br/><ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_plain_text_drops_markers() {
        let doc = transform("### T\n**b** c\n- i");
        assert_eq!(doc.to_plain_text(), "T\nb c\n• i");
    }
}
