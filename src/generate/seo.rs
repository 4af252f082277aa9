//! Page metadata: titles, canonical URLs, Open Graph images, JSON-LD.

use crate::config::SiteConfig;
use crate::types::{Collection, Post};
use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

/// Open Graph image for a page.
///
/// First match wins: collection banner (served from `/images/`), collection
/// icon when it is already a URL or absolute path, profile photo, site
/// default, nothing. Pages without a collection start at the profile photo.
pub fn social_image(site: &SiteConfig, base_url: &str, collection: Option<&Collection>) -> String {
    if let Some(c) = collection {
        if let Some(banner) = &c.banner {
            return format!("{base_url}/images/{banner}");
        }
        if let Some(icon) = &c.icon {
            if icon.starts_with('/') || icon.starts_with("http") {
                return icon.clone();
            }
        }
    }
    if !site.profile.photo.is_empty() {
        return site.profile.photo.clone();
    }
    site.default_social_image.clone()
}

/// A post's generated card wins over anything the collection offers.
pub fn post_social_image(site: &SiteConfig, base_url: &str, collection: &Collection, post: &Post) -> String {
    match &post.social_image {
        Some(card) => card.clone(),
        None => social_image(site, base_url, Some(collection)),
    }
}

/// `YYYY-MM-DD` as RFC 3339 at midnight UTC.
pub fn rfc3339(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Everything the `<head>` of a page needs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    /// `website`, `profile`, or `article`.
    pub og_type: &'static str,
    pub og_image: String,
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
    /// JSON-LD, already safe to embed in a `<script>` element.
    pub structured_data: Option<String>,
}

impl PageMeta {
    pub fn website(title: String, description: String, canonical_url: String, og_image: String) -> Self {
        Self {
            title,
            description,
            canonical_url,
            og_type: "website",
            og_image,
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct Article<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    headline: &'a str,
    description: &'a str,
    #[serde(rename = "datePublished", skip_serializing_if = "Option::is_none")]
    date_published: Option<String>,
    #[serde(rename = "dateModified", skip_serializing_if = "Option::is_none")]
    date_modified: Option<String>,
}

/// schema.org `Article` descriptor for a post, pretty-printed.
///
/// `</` is escaped so a title can never close the surrounding script tag.
pub fn structured_data(post: &Post) -> Result<String, serde_json::Error> {
    let article = Article {
        context: "https://schema.org",
        kind: "Article",
        headline: &post.title,
        description: &post.description,
        date_published: post.date.map(rfc3339),
        date_modified: post.updated.map(rfc3339),
    };
    Ok(serde_json::to_string_pretty(&article)?.replace("</", "<\\/"))
}

pub fn page_title(name: &str, site: &SiteConfig) -> String {
    format!("{name} | {}", site.title)
}

pub fn post_title(post: &Post, collection: &Collection, site: &SiteConfig) -> String {
    format!("{} | {} | {}", post.title, collection.name, site.title)
}
