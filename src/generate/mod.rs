//! HTML site generation.
//!
//! Renders every page from the loaded content, the asset hash map (inside the
//! [`TemplateSet`]'s `asset()` helper) and the site config. Nothing here reads
//! content from disk; the inputs are already in memory and the only effect is
//! writing files under the output directory.
//!
//! ## Generated Pages
//!
//! ```text
//! dist/
//! ├── index.html                     # home: 5 latest series posts, 5 topics
//! ├── profile/index.html             # from content/profile.md, if present
//! ├── referrals/index.html           # only with referrals.html + referrals
//! ├── docs/index.html                # every topic collection
//! ├── blog/index.html                # main blog, page 1
//! ├── blog/page/2/index.html         # main blog, page 2…
//! ├── <collection>/index.html        # every other collection
//! ├── <collection>/<post>/index.html # every post
//! └── sitemap.xml
//! ```
//!
//! ## Template context
//!
//! Every page gets `site`, `page` (title, canonical URL, Open Graph fields,
//! optional JSON-LD), `collections`, `base_url`, `year`, `dev_mode`, and
//! `critical_css`. Page-specific keys are documented on each renderer.

mod pagination;
mod seo;
mod sitemap;
mod templates;

pub use pagination::{POSTS_PER_PAGE, PageLink, page_links, page_numbers, page_path, total_pages};
pub use seo::{PageMeta, post_social_image, rfc3339, social_image, structured_data};
pub use sitemap::render_sitemap;
pub use templates::TemplateSet;

use crate::config::SiteConfig;
use crate::content::StandalonePage;
use crate::store::ALLOWED_EMOJIS;
use crate::types::{Collection, CollectionKind, Post, SiteContent, newest_first};
use chrono::Datelike;
use log::debug;
use std::fs;
use std::path::Path;
use tera::Context;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("failed to render {template}: {source}")]
    Render {
        template: String,
        source: tera::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing template: {0}")]
    MissingTemplate(String),
}

const HOME_LATEST_POSTS: usize = 5;
const HOME_TOPICS: usize = 5;

/// Read-only inputs for one generation pass.
pub struct SiteGenerator<'a> {
    pub content: &'a SiteContent,
    pub templates: &'a TemplateSet,
    pub site: &'a SiteConfig,
    /// Canonical origin, no trailing slash.
    pub base_url: &'a str,
    pub dev_mode: bool,
    pub critical_css: &'a str,
    pub profile: Option<&'a StandalonePage>,
}

impl SiteGenerator<'_> {
    /// Write every page under `out_dir`, returning how many were written.
    pub fn generate(&self, out_dir: &Path) -> Result<usize, GenerateError> {
        let mut pages = 0;

        pages += self.home(out_dir)?;
        pages += self.profile_page(out_dir)?;
        pages += self.referrals(out_dir)?;
        pages += self.docs_landing(out_dir)?;

        for collection in self.content.collections() {
            if collection.is_main_blog() {
                pages += self.blog_listing(collection, out_dir)?;
            } else {
                pages += self.collection(collection, out_dir)?;
            }
            for index in 0..collection.posts.len() {
                pages += self.post(collection, index, out_dir)?;
            }
        }

        write_output(out_dir, "sitemap.xml", &render_sitemap(self.base_url, self.content))?;
        Ok(pages)
    }

    fn base_context(&self, page: &PageMeta) -> Context {
        let mut ctx = Context::new();
        ctx.insert("site", self.site);
        ctx.insert("base_url", self.base_url);
        ctx.insert("page", page);
        ctx.insert("collections", self.content.collections());
        ctx.insert("year", &chrono::Utc::now().year());
        ctx.insert("dev_mode", &self.dev_mode);
        ctx.insert("critical_css", self.critical_css);
        ctx
    }

    fn default_image(&self) -> String {
        social_image(self.site, self.base_url, None)
    }

    fn topics(&self) -> impl Iterator<Item = &Collection> {
        self.content
            .collections()
            .iter()
            .filter(|c| c.kind == CollectionKind::Topic)
    }

    fn render_to(&self, template: &str, ctx: &Context, out_dir: &Path, rel: &str) -> Result<usize, GenerateError> {
        let html = self.templates.render(template, ctx)?;
        write_output(out_dir, rel, &html)?;
        debug!("wrote {rel}");
        Ok(1)
    }

    /// Extra keys: `latest_posts`, `docs_collections`, `profile`, `referrals`.
    fn home(&self, out_dir: &Path) -> Result<usize, GenerateError> {
        let mut latest: Vec<&Post> = self
            .content
            .collections()
            .iter()
            .filter(|c| c.kind == CollectionKind::Series)
            .flat_map(|c| c.posts.iter())
            .collect();
        latest.sort_by(|a, b| newest_first(a.date, b.date).then_with(|| a.url.cmp(&b.url)));
        latest.truncate(HOME_LATEST_POSTS);
        let docs: Vec<&Collection> = self.topics().take(HOME_TOPICS).collect();

        let page = PageMeta::website(
            self.site.title.clone(),
            self.site.description.clone(),
            self.base_url.to_string(),
            self.default_image(),
        );
        let mut ctx = self.base_context(&page);
        ctx.insert("latest_posts", &latest);
        ctx.insert("docs_collections", &docs);
        ctx.insert("profile", &self.site.profile);
        ctx.insert("referrals", &self.site.referrals);
        self.render_to("home.html", &ctx, out_dir, "index.html")
    }

    /// Extra keys: `content`, `toc`, `profile`. Skipped without `profile.md`.
    fn profile_page(&self, out_dir: &Path) -> Result<usize, GenerateError> {
        let Some(profile) = self.profile else {
            return Ok(0);
        };
        let page = PageMeta {
            og_type: "profile",
            ..PageMeta::website(
                seo::page_title(&profile.title, self.site),
                profile.description.clone(),
                format!("{}/profile", self.base_url),
                self.default_image(),
            )
        };
        let mut ctx = self.base_context(&page);
        ctx.insert("content", &profile.content);
        ctx.insert("toc", &profile.toc);
        ctx.insert("profile", &self.site.profile);
        self.render_to("profile.html", &ctx, out_dir, "profile/index.html")
    }

    /// Extra key: `referrals`. Needs both the template and configured entries.
    fn referrals(&self, out_dir: &Path) -> Result<usize, GenerateError> {
        let Some(template) = self.templates.referrals() else {
            return Ok(0);
        };
        if self.site.referrals.is_empty() {
            return Ok(0);
        }
        let page = PageMeta::website(
            seo::page_title("Referrals", self.site),
            "People I recommend and work with".to_string(),
            format!("{}/referrals", self.base_url),
            self.default_image(),
        );
        let mut ctx = self.base_context(&page);
        ctx.insert("referrals", &self.site.referrals);
        self.render_to(template, &ctx, out_dir, "referrals/index.html")
    }

    /// Extra key: `docs_collections` (every topic).
    fn docs_landing(&self, out_dir: &Path) -> Result<usize, GenerateError> {
        let docs: Vec<&Collection> = self.topics().collect();
        let page = PageMeta::website(
            seo::page_title("Documentation", self.site),
            "Browse all documentation and guides".to_string(),
            format!("{}/docs", self.base_url),
            self.default_image(),
        );
        let mut ctx = self.base_context(&page);
        ctx.insert("docs_collections", &docs);
        self.render_to("docs.html", &ctx, out_dir, "docs/index.html")
    }

    /// Extra keys: `collection`, `child_collections`, `posts` (this page),
    /// `current_page`, `total_pages`, `prev_page`, `next_page`, `page_links`.
    fn blog_listing(&self, collection: &Collection, out_dir: &Path) -> Result<usize, GenerateError> {
        let total = total_pages(collection.posts.len(), POSTS_PER_PAGE);
        let children: Vec<&Collection> = self.content.children(collection).collect();
        let page = PageMeta::website(
            seo::page_title(&collection.name, self.site),
            collection.description.clone(),
            format!("{}/blog", self.base_url),
            social_image(self.site, self.base_url, Some(collection)),
        );

        for number in 1..=total {
            let posts = pagination::page_slice(&collection.posts, number, POSTS_PER_PAGE);
            let mut ctx = self.base_context(&page);
            ctx.insert("collection", collection);
            ctx.insert("child_collections", &children);
            ctx.insert("posts", posts);
            ctx.insert("current_page", &number);
            ctx.insert("total_pages", &total);
            ctx.insert("prev_page", &(number > 1).then(|| number - 1));
            ctx.insert("next_page", &(number < total).then(|| number + 1));
            ctx.insert("page_links", &page_links(number, total));
            self.render_to(self.templates.blog(), &ctx, out_dir, &page_path(number))?;
        }
        Ok(total)
    }

    /// Extra keys: `collection`, `child_collections`.
    fn collection(&self, collection: &Collection, out_dir: &Path) -> Result<usize, GenerateError> {
        let children: Vec<&Collection> = self.content.children(collection).collect();
        let page = PageMeta::website(
            seo::page_title(&collection.name, self.site),
            collection.description.clone(),
            format!("{}/{}", self.base_url, collection.slug),
            social_image(self.site, self.base_url, Some(collection)),
        );
        let mut ctx = self.base_context(&page);
        ctx.insert("collection", collection);
        ctx.insert("child_collections", &children);
        let rel = format!("{}/index.html", collection.slug);
        self.render_to(self.templates.collection(), &ctx, out_dir, &rel)
    }

    /// Extra keys: `collection`, `post`, `prev_post`, `next_post`, `emojis`.
    fn post(&self, collection: &Collection, index: usize, out_dir: &Path) -> Result<usize, GenerateError> {
        let post = &collection.posts[index];
        let (prev, next) = collection.neighbors(index);
        let page = PageMeta {
            title: seo::post_title(post, collection, self.site),
            description: post.description.clone(),
            canonical_url: format!("{}{}", self.base_url, post.url),
            og_type: "article",
            og_image: post_social_image(self.site, self.base_url, collection, post),
            date_published: post.date.map(rfc3339),
            date_modified: post.updated.map(rfc3339),
            structured_data: Some(structured_data(post)?),
        };
        let mut ctx = self.base_context(&page);
        ctx.insert("collection", collection);
        ctx.insert("post", post);
        ctx.insert("prev_post", &prev);
        ctx.insert("next_post", &next);
        ctx.insert("emojis", &ALLOWED_EMOJIS);
        let rel = format!("{}/{}/index.html", collection.slug, post.slug);
        self.render_to("post.html", &ctx, out_dir, &rel)
    }
}

fn write_output(out_dir: &Path, rel: &str, contents: &str) -> Result<(), GenerateError> {
    let path = out_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}
