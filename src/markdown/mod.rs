//! Markdown rendering for posts and comments.
//!
//! A post body goes through four steps:
//!
//! ```text
//! body ─┬─ fenced code  → highlighted fragments + placeholders   (highlight)
//!       ├─ directives   → block tree: markdown / aside / pdf     (blocks)
//!       ├─ each block   → HTML, heading ids from one Outline     (html, slug)
//!       └─ placeholders → fragments restored                     (highlight)
//! ```
//!
//! Frontmatter is split off earlier by the content loader with
//! [`parse_frontmatter`]. Comments skip the directive and highlighting steps
//! and are rendered with raw HTML disabled via [`render_comment`].

mod blocks;
mod frontmatter;
mod highlight;
mod html;
mod slug;

pub use blocks::{Block, BlockKind, parse_blocks};
pub use frontmatter::{Frontmatter, parse_date, parse_frontmatter};
pub use highlight::Highlighter;
pub use slug::{HeadingIds, Outline, slugify};

use crate::types::TocEntry;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml_ng::Error),
}

/// HTML body plus the table of contents whose ids it contains.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Post renderer. Holds the syntax definitions, which are costly to load, so
/// build one per run and share it.
#[derive(Default)]
pub struct Renderer {
    highlighter: Highlighter,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, body: &str) -> Rendered {
        let (source, fragments) = highlight::extract_code_blocks(body, &self.highlighter);
        let mut outline = Outline::default();
        let mut html = String::with_capacity(source.len() * 2);
        for block in parse_blocks(&source) {
            blocks::render_block(&block, &mut outline, &mut html);
        }
        highlight::restore_code_blocks(&mut html, &fragments);
        Rendered {
            html,
            toc: outline.into_entries(),
        }
    }
}

/// Render user-supplied comment Markdown. Raw HTML is escaped, never emitted.
pub fn render_comment(content: &str) -> String {
    html::convert(content, html::Flavor::Comment, &mut Outline::default())
}

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Plain text of an HTML fragment, for search indexing.
pub fn strip_html(html: &str) -> String {
    let without_tags = TAG.replace_all(html, " ");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_string()
}
