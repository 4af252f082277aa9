//! CLI output formatting for `build` and `check`.
//!
//! # Information-First Display
//!
//! Collections lead with their positional index and display name; the
//! directory slug is secondary context on an indented `Source:` line, so the
//! output reads as a content inventory first.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Collections
//! 001 Blog (4 posts, series)
//!     Source: blog/
//! 002 Rust (2 posts, series)
//!     Source: blog/rust/
//! 003 Guides (3 posts, topic)
//!     Source: guides/
//!
//! Assets: 6 files, 3 minified, 3 fingerprinted
//! Cards: 9
//! Search: 9 posts indexed
//! Generated 17 pages from 9 posts → dist
//! ```
//!
//! ## Check
//!
//! Same collection listing, then `Content OK: 3 collections, 9 posts`.
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::pipeline::{BuildReport, CollectionSummary};
use crate::types::CollectionKind;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn kind_label(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Series => "series",
        CollectionKind::Topic => "topic",
    }
}

/// ```text
/// 001 Blog (4 posts, series)
///     Source: blog/
/// ```
fn format_collections(collections: &[CollectionSummary]) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];
    if collections.is_empty() {
        lines.push("    (none)".to_string());
    }
    for (i, c) in collections.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}, {})",
            format_index(i + 1),
            c.name,
            plural(c.posts, "post", "posts"),
            kind_label(c.kind)
        ));
        lines.push(format!("    Source: {}/", c.slug));
    }
    lines
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport, output_dir: &Path) -> Vec<String> {
    let mut lines = format_collections(&report.collections);
    lines.push(String::new());

    let assets = &report.assets;
    let mut asset_line = format!(
        "Assets: {}, {} minified, {} fingerprinted",
        plural(assets.copied, "file", "files"),
        assets.minified,
        assets.hashes.len()
    );
    if assets.minify_fallbacks > 0 {
        asset_line.push_str(&format!(", {} kept unminified", assets.minify_fallbacks));
    }
    lines.push(asset_line);

    if report.cards > 0 {
        lines.push(format!("Cards: {}", report.cards));
    }
    if report.indexed {
        lines.push(format!("Search: {} indexed", plural(report.posts, "post", "posts")));
    }
    lines.push(format!(
        "Generated {} from {} \u{2192} {}",
        plural(report.pages, "page", "pages"),
        plural(report.posts, "post", "posts"),
        output_dir.display()
    ));
    lines
}

pub fn print_build_report(report: &BuildReport, output_dir: &Path) {
    for line in format_build_report(report, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_report(report: &BuildReport) -> Vec<String> {
    let mut lines = format_collections(&report.collections);
    lines.push(String::new());
    lines.push(format!(
        "Content OK: {}, {}",
        plural(report.collections.len(), "collection", "collections"),
        plural(report.posts, "post", "posts")
    ));
    lines
}

pub fn print_check_report(report: &BuildReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
