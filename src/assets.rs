//! Static asset mirroring, minification, and fingerprinting.
//!
//! Every file under the static directory is mirrored into the output tree.
//! CSS and JS are minified (lightningcss and oxc) and, outside dev mode,
//! renamed with the first 8 hex characters of the SHA-256 of the minified
//! bytes:
//!
//! ```text
//! static/css/site.css   →  dist/css/site.3f2a9c1e.css
//! static/js/app.js      →  dist/js/app.b71d04aa.js
//! static/images/me.png  →  dist/images/me.png          (copied verbatim)
//! ```
//!
//! The resulting [`AssetHashes`] (`css/site.css` → `css/site.3f2a9c1e.css`) is
//! handed to the template stage read-only. Minification failure is not an
//! error; the original bytes are used and the file is still hashed.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use log::warn;
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to walk static directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Original web path → fingerprinted web path, both `/`-separated and
/// relative to the site root.
pub type AssetHashes = BTreeMap<String, String>;

/// Outcome of one asset pass.
#[derive(Debug, Clone, Default)]
pub struct AssetReport {
    pub hashes: AssetHashes,
    pub copied: usize,
    pub minified: usize,
    /// Minifiable files whose original bytes were kept.
    pub minify_fallbacks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Minifiable {
    Css,
    Js,
}

impl Minifiable {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "css" => Some(Minifiable::Css),
            "js" => Some(Minifiable::Js),
            _ => None,
        }
    }

    fn minify(self, source: &str) -> Option<String> {
        match self {
            Minifiable::Css => minify_css(source),
            Minifiable::Js => minify_js(source),
        }
    }
}

pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code;
    Some(code)
}

pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(printed.code)
}

/// First 8 hex characters of the SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    digest[..8].to_string()
}

/// `css/site.css` + `3f2a9c1e` → `css/site.3f2a9c1e.css`.
fn fingerprinted(rel: &str, hash: &str) -> String {
    let (dir, file) = match rel.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, rel),
    };
    let renamed = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{hash}.{ext}"),
        _ => format!("{file}.{hash}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{renamed}"),
        None => renamed,
    }
}

fn web_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Mirror `static_dir` into `output_dir`. A missing static directory yields
/// an empty report.
pub fn process_assets(static_dir: &Path, output_dir: &Path, dev_mode: bool) -> Result<AssetReport, AssetError> {
    let mut report = AssetReport::default();
    if !static_dir.is_dir() {
        return Ok(report);
    }

    for entry in WalkDir::new(static_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(static_dir).unwrap_or(entry.path());
        let dest = output_dir.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }

        let bytes = fs::read(entry.path())?;
        let Some(kind) = Minifiable::from_path(entry.path()) else {
            write_output(&dest, &bytes)?;
            report.copied += 1;
            continue;
        };

        let output = match std::str::from_utf8(&bytes).ok().and_then(|s| kind.minify(s)) {
            Some(minified) => {
                report.minified += 1;
                minified.into_bytes()
            }
            None => {
                warn!("could not minify {}, using original", entry.path().display());
                report.minify_fallbacks += 1;
                bytes
            }
        };

        let dest = if dev_mode {
            dest
        } else {
            let rel_web = web_path(rel);
            let hashed = fingerprinted(&rel_web, &content_hash(&output));
            let dest = output_dir.join(&hashed);
            report.hashes.insert(rel_web, hashed);
            dest
        };
        write_output(&dest, &output)?;
        report.copied += 1;
    }

    Ok(report)
}

fn write_output(dest: &Path, bytes: &[u8]) -> Result<(), AssetError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, bytes)?;
    Ok(())
}

/// `static/css/critical.css`, inlined into page heads. Empty when absent.
pub fn read_critical_css(static_dir: &Path) -> String {
    fs::read_to_string(critical_css_path(static_dir)).unwrap_or_default()
}

pub fn critical_css_path(static_dir: &Path) -> PathBuf {
    static_dir.join("css").join("critical.css")
}
