//! Content loading.
//!
//! Walks the content root and turns every directory that holds a
//! `_metadata.yml` marker into a [`Collection`]. Being a collection does not
//! stop the walk, so collections nest:
//!
//! ```text
//! content/
//! ├── profile.md                 # standalone profile page, not a post
//! ├── blog/
//! │   ├── _metadata.yml          # collection "blog" (series by default)
//! │   ├── hello-world.md         # post /blog/hello-world
//! │   ├── _template.md           # ignored: leading underscore
//! │   └── rust/
//! │       ├── _metadata.yml      # collection "blog/rust", child of "blog"
//! │       └── part-1.md
//! └── guides/
//!     ├── _metadata.yml          # collection "guides" (topic by default)
//!     └── install.md
//! ```
//!
//! ## Marker file
//!
//! ```yaml
//! name: Rust Series          # default: last path segment
//! description: Learning Rust
//! type: blog                 # blog|series → series, docs|topic → topic
//! icon: /images/rust.svg
//! banner: rust-banner.png    # served from /images/
//! ```
//!
//! Slugs starting with `blog` default to series, everything else to topic.
//!
//! ## Failure policy
//!
//! A post or collection that cannot be read or parsed is logged and skipped.
//! Only an unreadable content root fails the load.

use crate::markdown::{MarkdownError, Renderer, parse_frontmatter};
use crate::types::{Collection, CollectionKind, Post, SiteContent, TocEntry, newest_first};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

pub const METADATA_FILE: &str = "_metadata.yml";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{path}: {source}")]
    Markdown {
        path: PathBuf,
        source: MarkdownError,
    },
    #[error("invalid _metadata.yml in {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CollectionMeta {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    icon: Option<String>,
    banner: Option<String>,
}

/// A Markdown page outside any collection (`profile.md`).
#[derive(Debug, Clone)]
pub struct StandalonePage {
    pub title: String,
    pub description: String,
    pub content: String,
    pub toc: Vec<TocEntry>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn slug_for(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn default_kind(slug: &str) -> CollectionKind {
    if slug.starts_with("blog") {
        CollectionKind::Series
    } else {
        CollectionKind::Topic
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Load every collection under `root`, sorted and linked.
pub fn load_content(root: &Path, renderer: &Renderer) -> Result<SiteContent, ContentError> {
    let mut collections = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!("skipping unreadable content entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_dir() || !entry.path().join(METADATA_FILE).is_file() {
            continue;
        }
        let Some(slug) = slug_for(root, entry.path()) else {
            continue;
        };
        match load_collection(entry.path(), &slug, renderer) {
            Ok(collection) if collection.posts.is_empty() => {
                debug!("collection {slug} has no published posts, dropping it");
            }
            Ok(collection) => collections.push(collection),
            Err(e) => warn!("failed to load collection {slug}: {e}"),
        }
    }

    link_children(&mut collections);
    collections.sort_by(|a, b| newest_first(a.latest_post, b.latest_post).then_with(|| a.slug.cmp(&b.slug)));
    Ok(SiteContent::new(collections))
}

fn read_metadata(dir: &Path) -> Result<CollectionMeta, ContentError> {
    let path = dir.join(METADATA_FILE);
    let raw = fs::read_to_string(&path)?;
    let meta = serde_yaml_ng::from_str::<Option<CollectionMeta>>(&raw)
        .map_err(|source| ContentError::Metadata { path, source })?;
    Ok(meta.unwrap_or_default())
}

fn load_collection(dir: &Path, slug: &str, renderer: &Renderer) -> Result<Collection, ContentError> {
    let meta = read_metadata(dir)?;

    let mut kind = default_kind(slug);
    match meta.kind.as_deref().map(str::trim) {
        Some("blog") | Some("series") => kind = CollectionKind::Series,
        Some("docs") | Some("topic") => kind = CollectionKind::Topic,
        Some("") | None => {}
        Some(other) => warn!("collection {slug}: unknown type {other:?}, keeping default"),
    }

    let name = non_empty(meta.name).unwrap_or_else(|| slug.rsplit('/').next().unwrap_or(slug).to_string());

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_post_file(p))
        .collect();
    files.sort();

    let mut posts = Vec::with_capacity(files.len());
    for path in files {
        match load_post(&path, slug, renderer) {
            Ok(Some(post)) => posts.push(post),
            Ok(None) => debug!("skipping draft {}", path.display()),
            Err(e) => warn!("failed to load {}: {e}", path.display()),
        }
    }
    sort_posts(&mut posts, kind);

    let mut collection = Collection {
        slug: slug.to_string(),
        name,
        description: meta.description.unwrap_or_default(),
        kind,
        icon: non_empty(meta.icon),
        banner: non_empty(meta.banner),
        post_count: posts.len(),
        posts,
        latest_post: None,
        children: Vec::new(),
    };
    collection.latest_post = collection.newest_date();
    Ok(collection)
}

fn is_post_file(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.ends_with(".md") && !name.starts_with('_')
}

/// Series: newest first, undated last. Topics: `order`, then title.
/// Slug breaks any remaining tie so output is deterministic.
pub fn sort_posts(posts: &mut [Post], kind: CollectionKind) {
    match kind {
        CollectionKind::Series => posts.sort_by(|a, b| newest_first(a.date, b.date).then_with(|| a.slug.cmp(&b.slug))),
        CollectionKind::Topic => posts.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.slug.cmp(&b.slug))
        }),
    }
}

/// Read one post. Drafts come back as `Ok(None)` without being rendered.
pub fn load_post(path: &Path, collection_slug: &str, renderer: &Renderer) -> Result<Option<Post>, ContentError> {
    let raw = fs::read_to_string(path)?;
    let (fm, body) = parse_frontmatter(&raw).map_err(|source| ContentError::Markdown {
        path: path.to_path_buf(),
        source,
    })?;
    if fm.draft {
        return Ok(None);
    }

    let slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let rendered = renderer.render(body);

    Ok(Some(Post {
        title: fm.title().unwrap_or(&slug).to_string(),
        description: fm.description().to_string(),
        date: fm.published(),
        updated: fm.last_updated(),
        draft: false,
        order: fm.order,
        url: format!("/{collection_slug}/{slug}"),
        collection_slug: collection_slug.to_string(),
        slug,
        content: rendered.html,
        toc: rendered.toc,
        social_image: None,
    }))
}

/// Render a standalone page. A missing file is `Ok(None)`.
pub fn load_standalone(path: &Path, default_title: &str, renderer: &Renderer) -> Result<Option<StandalonePage>, ContentError> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let (fm, body) = parse_frontmatter(&raw).map_err(|source| ContentError::Markdown {
        path: path.to_path_buf(),
        source,
    })?;
    let rendered = renderer.render(body);
    Ok(Some(StandalonePage {
        title: fm.title().unwrap_or(default_title).to_string(),
        description: fm.description().to_string(),
        content: rendered.html,
        toc: rendered.toc,
    }))
}

/// Attach each collection to the one named by its slug minus the last
/// segment, then order every child list by recency.
fn link_children(collections: &mut [Collection]) {
    let index: HashMap<&str, usize> = collections
        .iter()
        .enumerate()
        .map(|(i, c)| (c.slug.as_str(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); collections.len()];
    for (i, c) in collections.iter().enumerate() {
        if let Some(&parent) = c.parent_slug().and_then(|p| index.get(p)) {
            children[parent].push(i);
        }
    }

    let linked: Vec<Vec<String>> = children
        .into_iter()
        .map(|mut kids| {
            kids.sort_by(|&a, &b| {
                newest_first(collections[a].latest_post, collections[b].latest_post)
                    .then_with(|| collections[a].slug.cmp(&collections[b].slug))
            });
            kids.into_iter().map(|k| collections[k].slug.clone()).collect()
        })
        .collect();

    for (collection, kids) in collections.iter_mut().zip(linked) {
        collection.children = kids;
        collection.post_count = collection.posts.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn load(root: &Path) -> SiteContent {
        load_content(root, &Renderer::new()).unwrap()
    }

    #[test]
    fn finds_all_collections_in_fixtures() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let mut slugs = collection_slugs(&content);
        slugs.sort();
        assert_eq!(slugs, vec!["blog", "blog/rust", "guides", "recipes"]);
    }

    #[test]
    fn empty_collection_is_dropped() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        assert!(content.collection("empty").is_none());
    }

    #[test]
    fn default_types_follow_slug() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        assert_eq!(find_collection(&content, "blog").kind, CollectionKind::Series);
        assert_eq!(find_collection(&content, "blog/rust").kind, CollectionKind::Series);
        assert_eq!(find_collection(&content, "guides").kind, CollectionKind::Topic);
    }

    #[test]
    fn metadata_type_overrides_default() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "notes/_metadata.yml", "name: Notes\ntype: blog\n");
        write_file(tmp.path(), "notes/a.md", "---\ntitle: A\ndate: 2024-01-01\n---\nbody\n");
        write_file(tmp.path(), "blog/_metadata.yml", "type: docs\n");
        write_file(tmp.path(), "blog/b.md", "---\ntitle: B\n---\nbody\n");
        let content = load(tmp.path());
        assert_eq!(find_collection(&content, "notes").kind, CollectionKind::Series);
        assert_eq!(find_collection(&content, "blog").kind, CollectionKind::Topic);
    }

    #[test]
    fn name_defaults_to_last_segment() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        assert_eq!(find_collection(&content, "recipes").name, "recipes");
        assert_eq!(find_collection(&content, "blog/rust").name, "Rust Series");
    }

    #[test]
    fn drafts_and_underscore_files_skipped() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let blog = find_collection(&content, "blog");
        let slugs = post_slugs(blog);
        assert!(!slugs.contains(&"secret-draft"));
        assert!(!slugs.contains(&"_template"));
    }

    #[test]
    fn series_sorted_newest_first_undated_last() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let blog = find_collection(&content, "blog");
        assert_eq!(
            post_slugs(blog),
            vec!["rust-ownership", "hello-world", "undated-notes"]
        );
        assert_eq!(blog.latest_post, NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn topic_sorted_by_order_with_neighbors() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let guides = find_collection(&content, "guides");
        assert_eq!(post_orders(guides), vec![1, 2, 3]);
        assert_eq!(post_slugs(guides), vec!["install", "configure", "deploy"]);

        let (prev, next) = guides.neighbors(1);
        assert_eq!(prev.map(|p| p.slug.as_str()), Some("install"));
        assert_eq!(next.map(|p| p.slug.as_str()), Some("deploy"));
    }

    #[test]
    fn topic_order_ties_break_on_title() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "t/_metadata.yml", "name: T\n");
        write_file(tmp.path(), "t/x.md", "---\ntitle: Zebra\norder: 1\n---\n");
        write_file(tmp.path(), "t/y.md", "---\ntitle: Apple\norder: 1\n---\n");
        let content = load(tmp.path());
        assert_eq!(post_slugs(find_collection(&content, "t")), vec!["y", "x"]);
    }

    #[test]
    fn children_linked_by_slug_prefix() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let blog = find_collection(&content, "blog");
        assert_eq!(blog.children, vec!["blog/rust"]);
        let kids: Vec<&str> = content.children(blog).map(|c| c.slug.as_str()).collect();
        assert_eq!(kids, vec!["blog/rust"]);
        assert!(find_collection(&content, "guides").children.is_empty());
    }

    #[test]
    fn collections_sorted_by_latest_post() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let slugs = collection_slugs(&content);
        assert_eq!(slugs.first().copied(), Some("recipes"));
        assert_eq!(slugs.last().copied(), Some("guides"));
    }

    #[test]
    fn post_fields_populated() {
        let tmp = setup_fixtures();
        let content = load(tmp.path());
        let post = find_post(find_collection(&content, "blog"), "rust-ownership");
        assert_eq!(post.url, "/blog/rust-ownership");
        assert_eq!(post.updated, NaiveDate::from_ymd_opt(2024, 5, 10));
        assert!(post.content.contains("class=\"aside\""));
        assert!(!post.toc.is_empty());
        for entry in &post.toc {
            assert!(post.content.contains(&format!("id=\"{}\"", entry.id)));
        }
    }

    #[test]
    fn title_defaults_to_file_stem() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "blog/_metadata.yml", "");
        write_file(tmp.path(), "blog/no-title.md", "just a body\n");
        let content = load(tmp.path());
        assert_eq!(find_post(find_collection(&content, "blog"), "no-title").title, "no-title");
    }

    #[test]
    fn malformed_post_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "blog/_metadata.yml", "name: Blog\n");
        write_file(tmp.path(), "blog/good.md", "---\ntitle: Good\n---\nok\n");
        write_file(tmp.path(), "blog/bad.md", "---\ntitle: [broken\n---\nok\n");
        let content = load(tmp.path());
        assert_eq!(post_slugs(find_collection(&content, "blog")), vec!["good"]);
    }

    #[test]
    fn malformed_metadata_skips_collection() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "broken/_metadata.yml", "name: [oops\n");
        write_file(tmp.path(), "broken/a.md", "body\n");
        write_file(tmp.path(), "fine/_metadata.yml", "name: Fine\n");
        write_file(tmp.path(), "fine/a.md", "body\n");
        let content = load(tmp.path());
        assert_eq!(collection_slugs(&content), vec!["fine"]);
    }

    #[test]
    fn hidden_directories_ignored() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), ".cache/_metadata.yml", "name: Hidden\n");
        write_file(tmp.path(), ".cache/a.md", "body\n");
        let content = load(tmp.path());
        assert!(content.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(load_content(&tmp.path().join("nope"), &Renderer::new()).is_err());
    }

    #[test]
    fn standalone_profile_page() {
        let tmp = setup_fixtures();
        let renderer = Renderer::new();
        let page = load_standalone(&tmp.path().join("profile.md"), "About", &renderer)
            .unwrap()
            .unwrap();
        assert_eq!(page.title, "About Me");
        assert!(page.content.contains("<p>"));
        assert!(load_standalone(&tmp.path().join("missing.md"), "About", &renderer).unwrap().is_none());
    }
}
