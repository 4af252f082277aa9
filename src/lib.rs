//! # Blogsmith
//!
//! A static site generator for a personal blog and documentation site, with a
//! small dynamic layer (OAuth login, comments, emoji reactions, full-text
//! search) served next to the generated pages.
//!
//! Your filesystem is the data source: a directory holding `_metadata.yml`
//! is a collection, every Markdown file inside it is a post.
//!
//! # Architecture: One Pipeline, One Server
//!
//! ```text
//! content/ ─► load ─► search index ─► assets ─► templates ─► cards ─► pages ─► dist/
//!                          │                                                   │
//!                          ▼                                                   ▼
//!                    SQLite (FTS5) ◄──── /api/* ──── axum server ────► static files
//! ```
//!
//! The pipeline is synchronous and single-threaded apart from the social card
//! fan-out. It never reads back what it wrote, so each stage is a function of
//! its inputs and can be tested on its own. The server only reads `dist/` and
//! the store; in dev mode a watcher thread reruns the pipeline and tells open
//! browser tabs to reload.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `site.yml` model, build configuration, validation, worker count |
//! | [`types`] | Collection / post arena shared by every stage |
//! | [`markdown`] | Frontmatter, block extensions, highlighting, heading ids, comment rendering |
//! | [`content`] | Collection discovery, post loading, sorting, parent/child linking |
//! | [`assets`] | Static mirror, CSS/JS minification, content-hash fingerprinting |
//! | [`generate`] | Tera templates, every HTML page, pagination, SEO metadata, sitemap |
//! | [`cards`] | Open Graph PNG cards, rendered in parallel |
//! | [`search`] | Search index records and the index trait the pipeline writes through |
//! | [`store`] | SQLite: users, sessions, reactions, comments, full-text index |
//! | [`server`] | axum routes, OAuth, static serving, live reload, shutdown |
//! | [`pipeline`] | Stage ordering, staging directory swap, build report |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Templates On Disk
//!
//! Pages are rendered with Tera from a template directory that belongs to the
//! site, not to the binary, so the look of the site changes without a
//! rebuild of the tool. Small fixed fragments inside post bodies (code blocks,
//! asides, embeds) are built with Maud instead, where compile-time checking and
//! auto-escaping matter more than editability.
//!
//! ## One Slug Function
//!
//! Heading ids and table-of-contents anchors come from the same allocator
//! ([`markdown::HeadingIds`]), so a TOC link can never point at an id the
//! rendered HTML does not have.
//!
//! ## Staged Output
//!
//! A build writes into a hidden sibling of the output directory and renames
//! it into place only when every stage succeeded. A failed rebuild in dev
//! mode leaves the last good site being served.
//!
//! ## Search Behind A Trait
//!
//! The pipeline knows only [`search::SearchIndex`]. The SQLite store provides
//! the real implementation; tests and `build` without a database provide
//! none, and nothing else changes.

pub mod assets;
pub mod cards;
pub mod config;
pub mod content;
pub mod generate;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
