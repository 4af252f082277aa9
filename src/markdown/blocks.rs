//! Block directives layered on top of CommonMark.
//!
//! ```text
//! :::aside                         <aside class="aside">
//! Side note with **markdown**.  →    <div class="aside-content">…</div>
//! :::                              </aside>
//!
//! :::pdf{src="/files/cv.pdf"}   →  <div class="pdf-embed"><iframe …></div>
//! ```
//!
//! The source is split into a block tree line by line before the CommonMark
//! parser sees it. Asides nest and close on a bare `:::` line; an aside still
//! open at end of input closes there. A `:::` with no open aside is ordinary
//! text. Each block kind has one render function, looked up through
//! [`BlockKind::renderer`], so adding a directive means adding a variant and
//! a function.

use super::html::{Flavor, convert};
use super::slug::Outline;
use maud::{PreEscaped, html};
use regex::Regex;
use std::sync::LazyLock;

static PDF_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^:::pdf\{src="([^"]+)"\}\s*$"#).expect("pdf directive pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Plain CommonMark text between directives.
    Markdown(String),
    Aside(Vec<Block>),
    PdfEmbed { src: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Markdown,
    Aside,
    PdfEmbed,
}

type RenderFn = fn(&Block, &mut Outline, &mut String);

impl BlockKind {
    pub fn renderer(self) -> RenderFn {
        match self {
            BlockKind::Markdown => render_markdown,
            BlockKind::Aside => render_aside,
            BlockKind::PdfEmbed => render_pdf_embed,
        }
    }
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Markdown(_) => BlockKind::Markdown,
            Block::Aside(_) => BlockKind::Aside,
            Block::PdfEmbed { .. } => BlockKind::PdfEmbed,
        }
    }
}

fn is_aside_open(trimmed: &str) -> bool {
    trimmed == ":::aside" || trimmed == "::: aside"
}

fn flush(text: &mut String, into: &mut Vec<Block>) {
    if !text.is_empty() {
        into.push(Block::Markdown(std::mem::take(text)));
    }
}

/// Split `source` into a block tree.
pub fn parse_blocks(source: &str) -> Vec<Block> {
    // Bottom of the stack is the document; each open aside pushes a level.
    let mut stack: Vec<Vec<Block>> = vec![Vec::new()];
    let mut text = String::new();

    for line in source.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim();
        let depth = stack.len();
        let current = &mut stack[depth - 1];

        if is_aside_open(trimmed) {
            flush(&mut text, current);
            stack.push(Vec::new());
        } else if trimmed == ":::" && depth > 1 {
            flush(&mut text, current);
            close_aside(&mut stack);
        } else if let Some(caps) = PDF_DIRECTIVE.captures(content) {
            flush(&mut text, current);
            current.push(Block::PdfEmbed {
                src: caps[1].to_string(),
            });
        } else {
            text.push_str(line);
        }
    }

    let depth = stack.len();
    flush(&mut text, &mut stack[depth - 1]);
    while stack.len() > 1 {
        close_aside(&mut stack);
    }
    stack.pop().unwrap_or_default()
}

fn close_aside(stack: &mut Vec<Vec<Block>>) {
    if let Some(children) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.push(Block::Aside(children));
        }
    }
}

/// Render one block, appending its HTML to `out`.
pub fn render_block(block: &Block, outline: &mut Outline, out: &mut String) {
    (block.kind().renderer())(block, outline, out)
}

fn render_markdown(block: &Block, outline: &mut Outline, out: &mut String) {
    if let Block::Markdown(text) = block {
        out.push_str(&convert(text, Flavor::Content, outline));
    }
}

fn render_aside(block: &Block, outline: &mut Outline, out: &mut String) {
    let Block::Aside(children) = block else {
        return;
    };
    let mut inner = String::new();
    for child in children {
        render_block(child, outline, &mut inner);
    }
    let markup = html! {
        aside.aside {
            div.aside-content { (PreEscaped(inner)) }
        }
    };
    out.push_str(&markup.into_string());
    out.push('\n');
}

fn render_pdf_embed(block: &Block, _outline: &mut Outline, out: &mut String) {
    let Block::PdfEmbed { src } = block else {
        return;
    };
    let markup = html! {
        div.pdf-embed {
            iframe src=(src) width="100%" height="600" type="application/pdf" title="PDF Document" {
                p {
                    "Your browser does not support PDF embeds. "
                    a href=(src) { "Download the PDF" }
                    "."
                }
            }
        }
    };
    out.push_str(&markup.into_string());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(s: &str) -> Block {
        Block::Markdown(s.to_string())
    }

    #[test]
    fn plain_text_is_one_block() {
        assert_eq!(parse_blocks("a\nb\n"), vec![md("a\nb\n")]);
    }

    #[test]
    fn aside_wraps_its_lines() {
        let blocks = parse_blocks("before\n:::aside\ninside\n:::\nafter\n");
        assert_eq!(
            blocks,
            vec![md("before\n"), Block::Aside(vec![md("inside\n")]), md("after\n")]
        );
    }

    #[test]
    fn spaced_opener_and_indentation() {
        let blocks = parse_blocks("  ::: aside  \nx\n   :::\n");
        assert_eq!(blocks, vec![Block::Aside(vec![md("x\n")])]);
    }

    #[test]
    fn asides_nest() {
        let blocks = parse_blocks(":::aside\nouter\n:::aside\ninner\n:::\ntail\n:::\n");
        assert_eq!(
            blocks,
            vec![Block::Aside(vec![
                md("outer\n"),
                Block::Aside(vec![md("inner\n")]),
                md("tail\n"),
            ])]
        );
    }

    #[test]
    fn unclosed_aside_closes_at_end() {
        let blocks = parse_blocks(":::aside\nnever closed\n");
        assert_eq!(blocks, vec![Block::Aside(vec![md("never closed\n")])]);
    }

    #[test]
    fn stray_closer_is_text() {
        assert_eq!(parse_blocks(":::\ntext\n"), vec![md(":::\ntext\n")]);
    }

    #[test]
    fn pdf_directive_is_recognised() {
        let blocks = parse_blocks("see:\n:::pdf{src=\"/files/a.pdf\"}\nend\n");
        assert_eq!(
            blocks,
            vec![
                md("see:\n"),
                Block::PdfEmbed {
                    src: "/files/a.pdf".into()
                },
                md("end\n"),
            ]
        );
    }

    #[test]
    fn malformed_pdf_directive_is_text() {
        let src = ":::pdf{src=/files/a.pdf}\n";
        assert_eq!(parse_blocks(src), vec![md(src)]);
    }

    #[test]
    fn aside_renders_wrapper_and_markdown() {
        let mut outline = Outline::default();
        let mut out = String::new();
        render_block(&Block::Aside(vec![md("**bold**\n")]), &mut outline, &mut out);
        assert!(out.starts_with("<aside class=\"aside\"><div class=\"aside-content\">"));
        assert!(out.contains("<strong>bold</strong>"));
        assert!(out.trim_end().ends_with("</div></aside>"));
    }

    #[test]
    fn pdf_embed_escapes_src() {
        let mut outline = Outline::default();
        let mut out = String::new();
        let block = Block::PdfEmbed {
            src: "/a.pdf?x=1&y=2".into(),
        };
        render_block(&block, &mut outline, &mut out);
        assert!(out.contains(r#"<iframe src="/a.pdf?x=1&amp;y=2" width="100%" height="600""#));
        assert!(out.contains("Download the PDF"));
    }
}
