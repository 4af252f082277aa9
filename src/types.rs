//! Content model shared by the loader, generator, card, and search stages.
//!
//! Collections live in a flat arena ([`SiteContent`]) and refer to each other
//! by slug: a collection's `children` are slugs, its parent is derived from its
//! own slug, and a post's previous/next neighbours are positions in the owning
//! collection's post list. Nothing holds a pointer into anything else, so the
//! whole model is plain owned data that can be cloned or handed to worker
//! threads freely.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Slug of the collection whose listing is paginated at `/blog/`.
pub const MAIN_BLOG_SLUG: &str = "blog";

/// How a collection orders and presents its posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Chronological blog series, newest first.
    Series,
    /// Documentation topic, ordered by the `order` frontmatter field.
    Topic,
}

impl CollectionKind {
    /// Value stored in the search index `type` column.
    pub fn search_type(self) -> &'static str {
        match self {
            CollectionKind::Series => "blog",
            CollectionKind::Topic => "docs",
        }
    }

    /// Short label drawn on social cards.
    pub fn badge(self) -> &'static str {
        match self {
            CollectionKind::Series => "POST",
            CollectionKind::Topic => "DOCS",
        }
    }
}

/// One entry of a post's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    /// Anchor id; always matches an `id` attribute in the rendered HTML.
    pub id: String,
    pub text: String,
}

/// A rendered Markdown document belonging to one collection.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub title: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub updated: Option<NaiveDate>,
    pub draft: bool,
    pub order: i64,
    /// File stem of the source file.
    pub slug: String,
    pub collection_slug: String,
    /// Site-relative URL: `/<collection>/<post>`.
    pub url: String,
    /// Rendered HTML body.
    pub content: String,
    pub toc: Vec<TocEntry>,
    /// Absolute URL of the generated social card, once one exists.
    pub social_image: Option<String>,
}

impl Post {
    /// `updated` when present, otherwise `date`.
    pub fn last_modified(&self) -> Option<NaiveDate> {
        self.updated.or(self.date)
    }
}

/// A directory of posts with its `_metadata.yml` applied.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    /// Path relative to the content root, `/`-separated (`blog/rust`).
    pub slug: String,
    pub name: String,
    pub description: String,
    pub kind: CollectionKind,
    pub icon: Option<String>,
    pub banner: Option<String>,
    /// Sorted: newest first for series, by `order` then title for topics.
    pub posts: Vec<Post>,
    pub latest_post: Option<NaiveDate>,
    /// Slugs of direct sub-collections, most recently updated first.
    pub children: Vec<String>,
    pub post_count: usize,
}

impl Collection {
    pub fn is_main_blog(&self) -> bool {
        self.slug == MAIN_BLOG_SLUG
    }

    /// Slug of the enclosing collection, derived from the directory path.
    pub fn parent_slug(&self) -> Option<&str> {
        self.slug
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .filter(|parent| !parent.is_empty())
    }

    /// The posts either side of `index` in this collection's order.
    pub fn neighbors(&self, index: usize) -> (Option<&Post>, Option<&Post>) {
        let prev = index.checked_sub(1).and_then(|i| self.posts.get(i));
        let next = self.posts.get(index + 1);
        (prev, next)
    }

    /// Newest post date in the collection, ignoring undated posts.
    pub fn newest_date(&self) -> Option<NaiveDate> {
        self.posts.iter().filter_map(|p| p.date).max()
    }
}

/// Order two optional dates newest first; absent dates sort last.
pub fn newest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Every loaded collection, indexed by slug.
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    collections: Vec<Collection>,
    by_slug: HashMap<String, usize>,
}

impl SiteContent {
    /// Build the arena. `collections` must already be in display order.
    pub fn new(collections: Vec<Collection>) -> Self {
        let by_slug = collections
            .iter()
            .enumerate()
            .map(|(i, c)| (c.slug.clone(), i))
            .collect();
        Self {
            collections,
            by_slug,
        }
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, slug: &str) -> Option<&Collection> {
        self.by_slug.get(slug).map(|&i| &self.collections[i])
    }

    pub fn children<'a>(&'a self, collection: &'a Collection) -> impl Iterator<Item = &'a Collection> {
        collection
            .children
            .iter()
            .filter_map(|slug| self.collection(slug))
    }

    pub fn posts(&self) -> impl Iterator<Item = (&Collection, &Post)> {
        self.collections
            .iter()
            .flat_map(|c| c.posts.iter().map(move |p| (c, p)))
    }

    pub fn posts_mut(&mut self) -> impl Iterator<Item = &mut Post> {
        self.collections.iter_mut().flat_map(|c| c.posts.iter_mut())
    }

    pub fn post_count(&self) -> usize {
        self.collections.iter().map(|c| c.posts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
