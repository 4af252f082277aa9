//! Shared test utilities.
//!
//! Fixture setup plus lookup helpers over the loaded content model.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let content = load_content(tmp.path(), &Renderer::new()).unwrap();
//!
//! let guides = find_collection(&content, "guides");
//! assert_eq!(post_orders(guides), vec![1, 2, 3]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{BuildConfig, load_site_config};
use crate::types::{Collection, Post, SiteContent};

// =========================================================================
// Fixture setup
// =========================================================================

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    copy_dir_recursive(&fixtures_dir().join("content"), tmp.path()).unwrap();
    tmp
}

/// Copy the whole `fixtures/` tree (content, templates, static, site.yml).
pub fn setup_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    copy_dir_recursive(&fixtures_dir(), tmp.path()).unwrap();
    tmp
}

/// Build config over a [`setup_site`] tree, writing to `root/dist`.
pub fn site_build_config(root: &Path, base_url: &str) -> BuildConfig {
    let mut config = BuildConfig::new(root.join("content"), root.join("dist"));
    config.static_dir = root.join("static");
    config.template_dir = root.join("templates");
    config.site = load_site_config(&root.join("site.yml")).unwrap();
    config.base_url = base_url.to_string();
    config
}

pub fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Write `count` dated posts into `root/<collection>/`, newest last by name.
pub fn write_dated_posts(root: &Path, collection: &str, count: usize) {
    write_file(root, &format!("{collection}/_metadata.yml"), "name: Generated\n");
    for i in 0..count {
        let day = i % 28 + 1;
        let month = i / 28 + 1;
        write_file(
            root,
            &format!("{collection}/post-{i:02}.md"),
            &format!("---\ntitle: Post {i}\ndate: 2023-{month:02}-{day:02}\n---\nBody {i}\n"),
        );
    }
}

// =========================================================================
// Content lookups: panic with a clear message on miss
// =========================================================================

/// Find a collection by slug. Panics if not found.
pub fn find_collection<'a>(content: &'a SiteContent, slug: &str) -> &'a Collection {
    content.collection(slug).unwrap_or_else(|| {
        panic!(
            "collection '{slug}' not found. Available: {:?}",
            collection_slugs(content)
        )
    })
}

/// Find a post by slug within a collection. Panics if not found.
pub fn find_post<'a>(collection: &'a Collection, slug: &str) -> &'a Post {
    collection
        .posts
        .iter()
        .find(|p| p.slug == slug)
        .unwrap_or_else(|| {
            panic!(
                "post '{slug}' not found in '{}'. Available: {:?}",
                collection.slug,
                post_slugs(collection)
            )
        })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// All collection slugs in display order.
pub fn collection_slugs(content: &SiteContent) -> Vec<&str> {
    content.collections().iter().map(|c| c.slug.as_str()).collect()
}

/// All post slugs in collection order.
pub fn post_slugs(collection: &Collection) -> Vec<&str> {
    collection.posts.iter().map(|p| p.slug.as_str()).collect()
}

pub fn post_orders(collection: &Collection) -> Vec<i64> {
    collection.posts.iter().map(|p| p.order).collect()
}

/// Read a generated file relative to `root`. Panics with the path on miss.
pub fn read_output(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel))
        .unwrap_or_else(|e| panic!("could not read {rel}: {e}"))
}
