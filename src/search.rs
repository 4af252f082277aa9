//! Full-text search index population.
//!
//! The build turns every published post into an [`IndexRecord`] and hands the
//! whole set to a [`SearchIndex`], which replaces whatever it held before.
//! The SQLite implementation lives in [`crate::store`]; the build only sees
//! the trait.

use crate::markdown::strip_html;
use crate::types::SiteContent;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("search index update failed: {0}")]
pub struct SearchError(#[from] pub Box<dyn std::error::Error + Send + Sync>);

/// One searchable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub slug: String,
    pub collection_slug: String,
    pub title: String,
    pub description: String,
    /// Post body with all markup removed.
    pub content: String,
    /// `blog` for series posts, `docs` for topic posts.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    /// `YYYY-MM-DD`, or empty for undated posts.
    pub date: String,
}

/// Destination for index records. Implementations replace their contents
/// atomically: readers see either the old set or the new one.
pub trait SearchIndex: Sync {
    fn replace_all(&self, records: &[IndexRecord]) -> Result<(), SearchError>;
}

pub fn index_records(content: &SiteContent) -> Vec<IndexRecord> {
    content
        .posts()
        .map(|(collection, post)| IndexRecord {
            slug: post.slug.clone(),
            collection_slug: collection.slug.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            content: strip_html(&post.content),
            kind: collection.kind.search_type().to_string(),
            url: post.url.clone(),
            date: post.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::CollectionKind;
    use crate::types::fixtures::{collection, post};
    use std::sync::Mutex;

    /// Keeps the last batch it was given.
    #[derive(Default)]
    pub struct RecordingIndex {
        pub records: Mutex<Vec<IndexRecord>>,
        pub calls: Mutex<usize>,
    }

    impl SearchIndex for RecordingIndex {
        fn replace_all(&self, records: &[IndexRecord]) -> Result<(), SearchError> {
            *self.records.lock().unwrap() = records.to_vec();
            *self.calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn records_for_each_post() {
        let mut series_post = post("blog", "hello", Some("2024-01-10"));
        series_post.content = "<p>Some <strong>bold</strong> text</p>".into();
        let content = SiteContent::new(vec![
            collection("blog", CollectionKind::Series, vec![series_post]),
            collection("guides", CollectionKind::Topic, vec![post("guides", "install", None)]),
        ]);

        let records = index_records(&content);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, "blog");
        assert_eq!(records[0].date, "2024-01-10");
        assert_eq!(records[0].url, "/blog/hello");
        assert!(!records[0].content.contains('<'));
        assert!(records[0].content.contains("bold"));

        assert_eq!(records[1].kind, "docs");
        assert_eq!(records[1].date, "");
        assert_eq!(records[1].collection_slug, "guides");
    }

    #[test]
    fn recording_index_replaces() {
        let index = RecordingIndex::default();
        let content = SiteContent::new(vec![collection(
            "blog",
            CollectionKind::Series,
            vec![post("blog", "a", None)],
        )]);
        index.replace_all(&index_records(&content)).unwrap();
        index.replace_all(&[]).unwrap();
        assert!(index.records.lock().unwrap().is_empty());
        assert_eq!(*index.calls.lock().unwrap(), 2);
    }
}
