//! Site and build configuration.
//!
//! Two layers:
//!
//! - [`SiteConfig`] is the user-facing `site.yml`: site identity, profile
//!   links, and referrals. A missing file means defaults; a file that exists
//!   but does not parse is a fatal error.
//! - [`BuildConfig`] is assembled by the CLI from flags plus the site config
//!   and drives one pipeline run.
//!
//! ## `site.yml`
//!
//! ```yaml
//! # All keys are optional - defaults shown where they exist
//! title: Site
//! description: ""
//! base_url: https://example.com       # canonical URLs, sitemap, social images
//! dev_base_url: http://localhost:3000  # used by `dev` instead of base_url
//! default_social_image: https://example.com/images/og.png
//!
//! profile:
//!   name: Jane Doe
//!   photo: /images/me.jpg
//!   bio: Writes about systems.
//!   github: https://github.com/jane
//!   linkedin: https://linkedin.com/in/jane
//!   email: jane@example.com
//!
//! referrals:
//!   - name: Sam
//!     photo: /images/sam.jpg
//!     website: https://sam.dev
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site identity and profile, loaded from `site.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site name used in page titles and card footers.
    pub title: String,
    pub description: String,
    /// Canonical origin without a trailing slash.
    pub base_url: String,
    /// Origin used by the `dev` command instead of `base_url`.
    pub dev_base_url: String,
    /// Fallback Open Graph image when nothing more specific exists.
    pub default_social_image: String,
    pub profile: ProfileConfig,
    pub referrals: Vec<Referral>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Site".to_string(),
            description: String::new(),
            base_url: String::new(),
            dev_base_url: String::new(),
            default_social_image: String::new(),
            profile: ProfileConfig::default(),
            referrals: Vec::new(),
        }
    }
}

/// Author profile: drives the profile page, social fallbacks, and the
/// `/github`, `/linkedin`, `/email` redirects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,
    pub photo: String,
    pub bio: String,
    pub github: String,
    pub linkedin: String,
    pub email: String,
}

/// Someone listed on the referrals page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Referral {
    pub name: String,
    pub photo: String,
    pub github: String,
    pub linkedin: String,
    pub website: String,
    pub twitter: String,
    pub email: String,
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Validation("title must not be empty".into()));
        }
        for (key, value) in [("base_url", &self.base_url), ("dev_base_url", &self.dev_base_url)] {
            if !value.is_empty() && !is_http_url(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://, got {value:?}"
                )));
            }
        }
        if let Some(i) = self.referrals.iter().position(|r| r.name.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "referrals[{i}] is missing a name"
            )));
        }
        Ok(())
    }

    /// Canonical origin for a run: an explicit flag wins, then the configured
    /// origin (`dev_base_url` in dev mode), then localhost on `port`.
    pub fn resolve_base_url(&self, flag: Option<&str>, dev_mode: bool, port: Option<u16>) -> String {
        let configured = if dev_mode && !self.dev_base_url.is_empty() {
            self.dev_base_url.as_str()
        } else {
            self.base_url.as_str()
        };
        let chosen = match flag {
            Some(url) if !url.is_empty() => url.to_string(),
            _ if !configured.is_empty() => configured.to_string(),
            _ => port.map(|p| format!("http://localhost:{p}")).unwrap_or_default(),
        };
        chosen.trim_end_matches('/').to_string()
    }
}

/// Load `site.yml`. A missing file yields [`SiteConfig::default`].
pub fn load_site_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    let config: SiteConfig = match serde_yaml_ng::from_str::<Option<SiteConfig>>(&raw) {
        Ok(parsed) => parsed.unwrap_or_default(),
        Err(source) => {
            return Err(ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    config.validate()?;
    Ok(config)
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub static_dir: PathBuf,
    pub template_dir: PathBuf,
    /// Resolved canonical origin, no trailing slash. May be empty.
    pub base_url: String,
    /// Skips asset fingerprinting and exposes a reload hook to templates.
    pub dev_mode: bool,
    pub site: SiteConfig,
    /// Cap on card-rendering workers. `None` uses every core.
    pub max_threads: Option<usize>,
}

impl BuildConfig {
    pub fn new(content_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            output_dir: output_dir.into(),
            static_dir: PathBuf::from("static"),
            template_dir: PathBuf::from("templates"),
            base_url: String::new(),
            dev_mode: false,
            site: SiteConfig::default(),
            max_threads: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("content directory is required".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("output directory is required".into()));
        }
        if !self.content_dir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "content directory does not exist: {}",
                self.content_dir.display()
            )));
        }
        self.site.validate()
    }

    /// `profile.md` at the content root, rendered as the profile page.
    pub fn profile_path(&self) -> PathBuf {
        self.content_dir.join("profile.md")
    }
}

/// Resolve the worker count for parallel stages.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least one
pub fn effective_threads(max_threads: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    max_threads.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}
