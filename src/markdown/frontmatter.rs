//! Frontmatter splitting and date parsing.
//!
//! A document may begin with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Ownership in practice
//! description: Borrowing without tears
//! date: 2024-03-02
//! updated: 2024-05-10
//! draft: false
//! order: 3
//! ---
//! Body text starts here.
//! ```
//!
//! Documents without the block are all body. Unknown keys are ignored so
//! posts can carry extra metadata for other tools.

use super::MarkdownError;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static FRONTMATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^---\n(.+?)\n---\n(.*)$").expect("frontmatter pattern compiles")
});

/// Metadata block at the top of a content file.
///
/// Every field is optional in the source; string fields tolerate explicit
/// YAML nulls (`title:` with nothing after it).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub draft: bool,
    pub order: i64,
}

impl Frontmatter {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn published(&self) -> Option<NaiveDate> {
        parse_date(self.date.as_deref())
    }

    pub fn last_updated(&self) -> Option<NaiveDate> {
        parse_date(self.updated.as_deref())
    }
}

/// Split `content` into its frontmatter and body.
///
/// No frontmatter block is not an error: the metadata is empty and the whole
/// input is returned as the body. A block that is present but not valid YAML
/// is an error.
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, &str), MarkdownError> {
    let Some(caps) = FRONTMATTER.captures(content) else {
        return Ok((Frontmatter::default(), content));
    };
    let (Some(meta), Some(body)) = (caps.get(1), caps.get(2)) else {
        return Ok((Frontmatter::default(), content));
    };
    let frontmatter = match serde_yaml_ng::from_str::<Option<Frontmatter>>(meta.as_str())? {
        Some(fm) => fm,
        None => Frontmatter::default(),
    };
    Ok((frontmatter, body.as_str()))
}

/// Parse a `YYYY-MM-DD` date. Empty or malformed input yields `None`.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_metadata_from_body() {
        let doc = "---\ntitle: Hello\ndate: 2024-01-15\norder: 2\n---\n# Body\n\ntext\n";
        let (fm, body) = parse_frontmatter(doc).unwrap();
        assert_eq!(fm.title(), Some("Hello"));
        assert_eq!(fm.order, 2);
        assert_eq!(fm.published(), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(body, "# Body\n\ntext\n");
    }

    #[test]
    fn missing_block_is_all_body() {
        let doc = "# Just markdown\n";
        let (fm, body) = parse_frontmatter(doc).unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, doc);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let doc = "---\ntitle: [unclosed\n---\nbody\n";
        assert!(parse_frontmatter(doc).is_err());
    }

    #[test]
    fn null_fields_are_tolerated() {
        let doc = "---\ntitle:\ndescription:\ndraft: true\n---\nbody\n";
        let (fm, _) = parse_frontmatter(doc).unwrap();
        assert_eq!(fm.title(), None);
        assert_eq!(fm.description(), "");
        assert!(fm.draft);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let doc = "---\ntitle: T\ntags: [a, b]\n---\nbody\n";
        let (fm, _) = parse_frontmatter(doc).unwrap();
        assert_eq!(fm.title(), Some("T"));
    }

    #[test]
    fn bad_dates_are_absent() {
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("15/01/2024")), None);
        assert_eq!(parse_date(Some("2024-02-30")), None);
        assert_eq!(parse_date(None), None);
        assert_eq!(
            parse_date(Some(" 2024-02-29 ")),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }
}
