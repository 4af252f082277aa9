//! Heading anchors.
//!
//! [`slugify`] is the only place anchor ids are derived. The renderer asks an
//! [`Outline`] for the id of every heading it emits, and the same call records
//! the table-of-contents entry, so a TOC link can never point at an id the
//! HTML does not contain.

use crate::types::TocEntry;
use std::collections::{HashMap, HashSet};

/// Turn heading text into an anchor id.
///
/// Lowercase, spaces become hyphens, anything outside `[a-z0-9-]` is dropped,
/// runs of hyphens collapse, and leading/trailing hyphens are trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.to_lowercase().chars() {
        match ch {
            ' ' | '-' => {
                if !slug.ends_with('-') {
                    slug.push('-');
                }
            }
            'a'..='z' | '0'..='9' => slug.push(ch),
            _ => {}
        }
    }
    slug.trim_matches('-').to_string()
}

/// Allocates unique anchor ids within one document.
///
/// Repeated headings get `-1`, `-2`, … suffixes; headings whose text slugifies
/// to nothing fall back to `section`.
#[derive(Debug, Default)]
pub struct HeadingIds {
    taken: HashSet<String>,
    suffixes: HashMap<String, usize>,
}

impl HeadingIds {
    pub fn allocate(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "section".to_string();
        }
        let mut n = self.suffixes.get(&base).copied().unwrap_or(0);
        let mut id = base.clone();
        while self.taken.contains(&id) {
            n += 1;
            id = format!("{base}-{n}");
        }
        self.suffixes.insert(base, n);
        self.taken.insert(id.clone());
        id
    }
}

/// Heading ids plus the table of contents collected while rendering.
#[derive(Debug, Default)]
pub struct Outline {
    ids: HeadingIds,
    entries: Vec<TocEntry>,
}

impl Outline {
    /// Allocate an id for a heading and record it in the TOC.
    pub fn record(&mut self, level: u8, text: &str) -> String {
        let text = text.trim();
        let id = self.ids.allocate(text);
        self.entries.push(TocEntry {
            level,
            id: id.clone(),
            text: text.to_string(),
        });
        id
    }

    pub fn into_entries(self) -> Vec<TocEntry> {
        self.entries
    }
}
