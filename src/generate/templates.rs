//! Template loading and fallback resolution.
//!
//! Every `*.html` under the template directory is loaded into one Tera
//! instance, keyed by its path relative to that directory. Page templates
//! extend `base.html` and include files from `partials/`:
//!
//! ```text
//! templates/
//! ├── base.html
//! ├── partials/header.html
//! ├── home.html         required
//! ├── docs.html         required
//! ├── post.html         required
//! ├── profile.html      required
//! ├── collection.html   required, or topic.html
//! ├── blog.html         optional, falls back to the collection template
//! └── referrals.html    optional, referrals page skipped without it
//! ```

use super::GenerateError;
use crate::assets::AssetHashes;
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera, Value};

const REQUIRED: [&str; 4] = ["home.html", "docs.html", "post.html", "profile.html"];

/// Loaded templates with fallbacks already resolved.
pub struct TemplateSet {
    tera: Tera,
    collection: &'static str,
    blog: &'static str,
    referrals: Option<&'static str>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("collection", &self.collection)
            .field("blog", &self.blog)
            .field("referrals", &self.referrals)
            .finish()
    }
}

/// `asset(path="css/site.css")` → `/css/site.3f2a9c1e.css`, or `/css/site.css`
/// when the file was not fingerprinted.
fn asset_function(hashes: AssetHashes) -> impl tera::Function {
    move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("asset() requires a string `path` argument"))?;
        let normalized = path.replace('\\', "/");
        let normalized = normalized.trim_start_matches('/');
        let resolved = hashes.get(normalized).map(String::as_str).unwrap_or(normalized);
        Ok(Value::String(format!("/{resolved}")))
    }
}

impl TemplateSet {
    pub fn load(dir: &Path, hashes: &AssetHashes) -> Result<Self, GenerateError> {
        if !dir.is_dir() {
            return Err(GenerateError::MissingTemplate(format!(
                "template directory {} does not exist",
                dir.display()
            )));
        }
        let pattern = format!("{}/**/*.html", dir.display());
        let mut tera = Tera::new(&pattern)?;
        tera.register_function("asset", asset_function(hashes.clone()));
        Self::from_tera(tera)
    }

    fn from_tera(tera: Tera) -> Result<Self, GenerateError> {
        let has = |name: &str| tera.get_template_names().any(|n| n == name);

        for name in REQUIRED {
            if !has(name) {
                return Err(GenerateError::MissingTemplate(name.to_string()));
            }
        }
        let collection = if has("collection.html") {
            "collection.html"
        } else if has("topic.html") {
            "topic.html"
        } else {
            return Err(GenerateError::MissingTemplate("collection.html (or topic.html)".into()));
        };
        let blog = if has("blog.html") { "blog.html" } else { collection };
        let referrals = has("referrals.html").then_some("referrals.html");

        Ok(Self {
            tera,
            collection,
            blog,
            referrals,
        })
    }

    pub fn collection(&self) -> &str {
        self.collection
    }

    pub fn blog(&self) -> &str {
        self.blog
    }

    pub fn referrals(&self) -> Option<&str> {
        self.referrals
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, GenerateError> {
        self.tera.render(name, context).map_err(|source| GenerateError::Render {
            template: name.to_string(),
            source,
        })
    }
}
