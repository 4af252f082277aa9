//! Build orchestration.
//!
//! Runs every stage in order against a staging directory next to the real
//! output directory, then swaps it into place:
//!
//! ```text
//! validate → load content → search index → assets → templates → cards → pages
//!
//! dist/                 # previous build, served until the swap
//! .dist.staging/        # this build
//! ```
//!
//! If any stage fails the staging directory is discarded and `dist/` is left
//! exactly as it was. Failing to clear either directory is fatal.

use crate::assets::{AssetError, AssetHashes, AssetReport, process_assets, read_critical_css};
use crate::cards::{CardError, ImageCardRenderer, generate_cards};
use crate::config::{BuildConfig, ConfigError};
use crate::content::{ContentError, load_content, load_standalone};
use crate::generate::{GenerateError, SiteGenerator, TemplateSet};
use crate::markdown::Renderer;
use crate::search::{SearchError, SearchIndex, index_records};
use crate::types::{CollectionKind, SiteContent};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("generate error: {0}")]
    Generate(#[from] GenerateError),
    #[error("card error: {0}")]
    Card(#[from] CardError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("output directory has no name: {0}")]
    OutputPath(PathBuf),
    #[error("failed to clear {path}: {source}")]
    Clear {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One line of the collection summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub slug: String,
    pub name: String,
    pub kind: CollectionKind,
    pub posts: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub collections: Vec<CollectionSummary>,
    pub assets: AssetReport,
    pub pages: usize,
    pub cards: usize,
    pub posts: usize,
    /// Whether a search index was refreshed.
    pub indexed: bool,
}

fn summarize(content: &SiteContent) -> Vec<CollectionSummary> {
    content
        .collections()
        .iter()
        .map(|c| CollectionSummary {
            slug: c.slug.clone(),
            name: c.name.clone(),
            kind: c.kind,
            posts: c.posts.len(),
        })
        .collect()
}

/// `dist` → `.dist.staging`, in the same parent so the final rename stays on
/// one filesystem.
pub fn staging_dir(output_dir: &Path) -> Result<PathBuf, BuildError> {
    let name = output_dir
        .file_name()
        .ok_or_else(|| BuildError::OutputPath(output_dir.to_path_buf()))?;
    Ok(output_dir.with_file_name(format!(".{}.staging", name.to_string_lossy())))
}

fn clear_dir(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|source| BuildError::Clear {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Run the full pipeline. `index`, when given, is replaced with the freshly
/// loaded posts before any output is written.
pub fn build(config: &BuildConfig, index: Option<&dyn SearchIndex>) -> Result<BuildReport, BuildError> {
    let started = Instant::now();
    config.validate()?;

    let renderer = Renderer::new();
    let mut content = load_content(&config.content_dir, &renderer)?;
    info!(
        "loaded {} collections, {} posts",
        content.collections().len(),
        content.post_count()
    );

    if let Some(index) = index {
        let records = index_records(&content);
        index.replace_all(&records)?;
        info!("indexed {} posts for search", records.len());
    }

    let staging = staging_dir(&config.output_dir)?;
    clear_dir(&staging)?;
    fs::create_dir_all(&staging)?;

    let report = match render_into(config, &renderer, &mut content, &staging) {
        Ok(report) => report,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!("could not remove {}: {cleanup}", staging.display());
            }
            return Err(e);
        }
    };

    clear_dir(&config.output_dir)?;
    fs::rename(&staging, &config.output_dir)?;

    info!(
        "built {} pages into {} in {:.2?}",
        report.pages,
        config.output_dir.display(),
        started.elapsed()
    );
    Ok(BuildReport {
        indexed: index.is_some(),
        ..report
    })
}

fn render_into(
    config: &BuildConfig,
    renderer: &Renderer,
    content: &mut SiteContent,
    out_dir: &Path,
) -> Result<BuildReport, BuildError> {
    let assets = process_assets(&config.static_dir, out_dir, config.dev_mode)?;
    debug!("assets: {} copied, {} fingerprinted", assets.copied, assets.hashes.len());

    let templates = TemplateSet::load(&config.template_dir, &assets.hashes)?;

    let cards = match ImageCardRenderer::from_static(&config.static_dir, &config.site, &config.base_url)? {
        Some(card_renderer) => generate_cards(&card_renderer, content, out_dir, &config.base_url)?,
        None => 0,
    };

    let profile = load_standalone(&config.profile_path(), "About", renderer)?;
    let critical_css = read_critical_css(&config.static_dir);

    let pages = SiteGenerator {
        content,
        templates: &templates,
        site: &config.site,
        base_url: &config.base_url,
        dev_mode: config.dev_mode,
        critical_css: &critical_css,
        profile: profile.as_ref(),
    }
    .generate(out_dir)?;

    Ok(BuildReport {
        collections: summarize(content),
        assets,
        pages,
        cards,
        posts: content.post_count(),
        indexed: false,
    })
}

/// Load and validate everything a build reads, without writing anything.
pub fn check(config: &BuildConfig) -> Result<BuildReport, BuildError> {
    config.validate()?;
    let renderer = Renderer::new();
    let content = load_content(&config.content_dir, &renderer)?;
    TemplateSet::load(&config.template_dir, &AssetHashes::new())?;
    load_standalone(&config.profile_path(), "About", &renderer)?;
    Ok(BuildReport {
        collections: summarize(&content),
        posts: content.post_count(),
        ..BuildReport::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::RecordingIndex;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn fixture_config(root: &Path) -> BuildConfig {
        site_build_config(root, "https://example.com")
    }

    // =========================================================================
    // Staging
    // =========================================================================

    #[test]
    fn staging_dir_is_hidden_sibling() {
        assert_eq!(
            staging_dir(Path::new("/srv/site/dist")).unwrap(),
            PathBuf::from("/srv/site/.dist.staging")
        );
        assert_eq!(staging_dir(Path::new("out")).unwrap(), PathBuf::from(".out.staging"));
    }

    #[test]
    fn staging_dir_needs_a_name() {
        assert!(matches!(staging_dir(Path::new("/")), Err(BuildError::OutputPath(_))));
    }

    // =========================================================================
    // Full build
    // =========================================================================

    #[test]
    fn build_writes_output_and_report() {
        let tmp = setup_site();
        let config = fixture_config(tmp.path());

        let report = build(&config, None).unwrap();

        assert!(config.output_dir.join("index.html").is_file());
        assert!(config.output_dir.join("sitemap.xml").is_file());
        assert!(!staging_dir(&config.output_dir).unwrap().exists());
        assert_eq!(report.pages, 17);
        assert_eq!(report.cards, 0);
        assert!(!report.indexed);
        assert!(report.assets.hashes.contains_key("css/site.css"));

        let blog = report.collections.iter().find(|c| c.slug == "blog").unwrap();
        assert_eq!(blog.kind, CollectionKind::Series);
        assert_eq!(report.posts, report.collections.iter().map(|c| c.posts).sum::<usize>());
    }

    #[test]
    fn build_refreshes_search_index() {
        let tmp = setup_site();
        let config = fixture_config(tmp.path());
        let index = RecordingIndex::default();

        let report = build(&config, Some(&index)).unwrap();

        assert!(report.indexed);
        let records = index.records.lock().unwrap();
        assert_eq!(records.len(), report.posts);
        assert!(records.iter().all(|r| r.slug != "secret-draft"));
    }

    #[test]
    fn failed_build_keeps_previous_output() {
        let tmp = setup_site();
        let config = fixture_config(tmp.path());
        build(&config, None).unwrap();
        let before = read_output(&config.output_dir, "index.html");

        fs::remove_file(tmp.path().join("templates/post.html")).unwrap();
        let err = build(&config, None).unwrap_err();

        assert!(matches!(err, BuildError::Generate(_)));
        assert_eq!(read_output(&config.output_dir, "index.html"), before);
        assert!(!staging_dir(&config.output_dir).unwrap().exists());
    }

    #[test]
    fn rebuild_removes_stale_pages() {
        let tmp = setup_site();
        let config = fixture_config(tmp.path());
        build(&config, None).unwrap();
        assert!(config.output_dir.join("guides/deploy/index.html").is_file());

        fs::remove_file(tmp.path().join("content/guides/deploy.md")).unwrap();
        build(&config, None).unwrap();

        assert!(!config.output_dir.join("guides/deploy/index.html").exists());
    }

    #[test]
    fn missing_content_dir_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = BuildConfig::new(tmp.path().join("nope"), tmp.path().join("dist"));
        assert!(matches!(build(&config, None), Err(BuildError::Config(_))));
        assert!(!tmp.path().join("dist").exists());
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn check_writes_nothing() {
        let tmp = setup_site();
        let config = fixture_config(tmp.path());

        let report = check(&config).unwrap();

        assert!(report.posts > 0);
        assert_eq!(report.pages, 0);
        assert!(!config.output_dir.exists());
        assert!(!staging_dir(&config.output_dir).unwrap().exists());
    }

    #[test]
    fn check_reports_bad_templates() {
        let tmp = setup_site();
        write_file(tmp.path(), "templates/home.html", "{% if %}");
        let config = fixture_config(tmp.path());
        assert!(matches!(check(&config), Err(BuildError::Generate(_))));
    }
}
