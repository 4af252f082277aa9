//! Social cards: one 1200×630 PNG per post, referenced by `og:image`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                                                      │
//! │   ╭────╮   [POST]                                    │
//! │   │ me │   Title wrapped to at most                  │
//! │   ╰────╯   two lines...                              │
//! │            Rust Series                               │
//! │  ──────────────────────────────────────────────────  │
//! │  Site  ·  example.com                                │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Cards are only produced when both `static/fonts/SourceSerif4-Regular.ttf`
//! and `static/fonts/SourceSerif4-Semibold.ttf` exist. Rendering fans out over
//! the global rayon pool; every card is attempted and the first failure is
//! returned once all of them have finished.
//!
//! The drawing itself sits behind [`CardRenderer`] so the fan-out and the URL
//! bookkeeping can be tested without fonts.

use crate::config::SiteConfig;
use crate::types::{Collection, CollectionKind, MAIN_BLOG_SLUG, Post, SiteContent};
use ab_glyph::{FontVec, PxScale};
use image::imageops::FilterType;
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::debug;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid font {0}")]
    Font(PathBuf),
}

pub const CARD_WIDTH: u32 = 1200;
pub const CARD_HEIGHT: u32 = 630;

const REGULAR_FONT: &str = "fonts/SourceSerif4-Regular.ttf";
const SEMIBOLD_FONT: &str = "fonts/SourceSerif4-Semibold.ttf";

/// What goes on one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub badge: &'static str,
    pub title: String,
    /// Collection name, shown for topics and for series other than the main blog.
    pub subtitle: Option<String>,
}

impl Card {
    pub fn for_post(collection: &Collection, post: &Post) -> Self {
        let subtitle = match collection.kind {
            CollectionKind::Topic => Some(collection.name.clone()),
            CollectionKind::Series if collection.slug != MAIN_BLOG_SLUG => Some(collection.name.clone()),
            CollectionKind::Series => None,
        };
        Self {
            badge: collection.kind.badge(),
            title: post.title.clone(),
            subtitle,
        }
    }
}

/// Draws a card and writes it to `output` as PNG.
pub trait CardRenderer: Sync {
    fn render(&self, card: &Card, output: &Path) -> Result<(), CardError>;
}

/// `og/<collection>/<post>.png`, relative to the output root.
pub fn card_path(collection_slug: &str, post_slug: &str) -> String {
    format!("og/{collection_slug}/{post_slug}.png")
}

/// Render a card for every post and point each post's `social_image` at it.
///
/// Returns the number of cards written. Posts keep `social_image: None` if
/// any card fails.
pub fn generate_cards(
    renderer: &impl CardRenderer,
    content: &mut SiteContent,
    out_dir: &Path,
    base_url: &str,
) -> Result<usize, CardError> {
    let jobs: Vec<(String, Card)> = content
        .posts()
        .map(|(collection, post)| (card_path(&collection.slug, &post.slug), Card::for_post(collection, post)))
        .collect();

    // Every job runs to completion; the first error in post order wins.
    let results: Vec<Result<(), CardError>> = jobs
        .par_iter()
        .map(|(rel, card)| {
            let output = out_dir.join(rel);
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            renderer.render(card, &output)?;
            debug!("card {rel}");
            Ok(())
        })
        .collect();
    if let Some(err) = results.into_iter().find_map(Result::err) {
        return Err(err);
    }

    for post in content.posts_mut() {
        post.social_image = Some(format!("{base_url}/{}", card_path(&post.collection_slug, &post.slug)));
    }
    Ok(jobs.len())
}

// =========================================================================
// Raster renderer
// =========================================================================

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([20, 20, 20, 255]);
const BADGE: Rgba<u8> = Rgba([30, 30, 30, 255]);
const MUTED: Rgba<u8> = Rgba([100, 100, 100, 255]);
const RULE: Rgba<u8> = Rgba([230, 230, 230, 255]);

const MARGIN: i32 = 80;
const PHOTO_SIZE: u32 = 120;
const PHOTO_TOP: i32 = 200;
const TITLE_SIZE: f32 = 56.0;
const TITLE_LINE_HEIGHT: i32 = 68;
const TITLE_MAX_LINES: usize = 2;

/// Draws cards with `image` + `imageproc`, text set in Source Serif 4.
pub struct ImageCardRenderer {
    regular: FontVec,
    semibold: FontVec,
    photo: Option<RgbaImage>,
    footer: String,
}

fn load_font(path: &Path) -> Result<FontVec, CardError> {
    let bytes = fs::read(path)?;
    FontVec::try_from_vec(bytes).map_err(|_| CardError::Font(path.to_path_buf()))
}

/// `https://example.com/` → `example.com`.
fn host_of(base_url: &str) -> &str {
    base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

impl ImageCardRenderer {
    /// Load fonts and the profile photo from `static_dir`.
    ///
    /// `Ok(None)` when either font is missing: cards are an optional stage.
    /// A profile photo is only used when it is a site-absolute path
    /// (`/images/me.png`) that resolves inside `static_dir`.
    pub fn from_static(static_dir: &Path, site: &SiteConfig, base_url: &str) -> Result<Option<Self>, CardError> {
        let regular_path = static_dir.join(REGULAR_FONT);
        let semibold_path = static_dir.join(SEMIBOLD_FONT);
        if !regular_path.is_file() || !semibold_path.is_file() {
            debug!("card fonts not found under {}, skipping cards", static_dir.display());
            return Ok(None);
        }

        let photo = match site.profile.photo.strip_prefix('/') {
            Some(rel) if !rel.is_empty() => {
                let photo = image::open(static_dir.join(rel))?;
                Some(photo.resize_to_fill(PHOTO_SIZE, PHOTO_SIZE, FilterType::Lanczos3).to_rgba8())
            }
            _ => None,
        };

        Ok(Some(Self {
            regular: load_font(&regular_path)?,
            semibold: load_font(&semibold_path)?,
            photo,
            footer: format!("{}  ·  {}", site.title, host_of(base_url)),
        }))
    }

    fn draw_photo(&self, canvas: &mut RgbaImage, photo: &RgbaImage) {
        let radius = (PHOTO_SIZE / 2) as i32;
        let center = (MARGIN + radius, PHOTO_TOP + radius);
        draw_filled_circle_mut(canvas, center, radius + 2, RULE);

        for (x, y, pixel) in photo.enumerate_pixels() {
            let dx = x as i32 - radius;
            let dy = y as i32 - radius;
            if dx * dx + dy * dy <= radius * radius {
                canvas.put_pixel((MARGIN + x as i32) as u32, (PHOTO_TOP + y as i32) as u32, *pixel);
            }
        }
    }

    fn draw_badge(&self, canvas: &mut RgbaImage, text: &str, x: i32) {
        let scale = PxScale::from(14.0);
        let (text_w, _) = text_size(scale, &self.semibold, text);
        let pad = 14;
        draw_filled_rect_mut(canvas, Rect::at(x, 180).of_size(text_w + 2 * pad as u32, 28), BADGE);
        draw_text_mut(canvas, WHITE, x + pad, 186, scale, &self.semibold, text);
    }

    fn draw_footer(&self, canvas: &mut RgbaImage) {
        let rule_y = (CARD_HEIGHT - 90) as f32;
        draw_line_segment_mut(
            canvas,
            (MARGIN as f32, rule_y),
            ((CARD_WIDTH as i32 - MARGIN) as f32, rule_y),
            RULE,
        );
        draw_text_mut(
            canvas,
            MUTED,
            MARGIN,
            CARD_HEIGHT as i32 - 65,
            PxScale::from(20.0),
            &self.regular,
            &self.footer,
        );
    }
}

impl CardRenderer for ImageCardRenderer {
    fn render(&self, card: &Card, output: &Path) -> Result<(), CardError> {
        let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, WHITE);

        let x = match &self.photo {
            Some(photo) => {
                self.draw_photo(&mut canvas, photo);
                240
            }
            None => MARGIN,
        };

        self.draw_badge(&mut canvas, card.badge, x);

        let title_scale = PxScale::from(TITLE_SIZE);
        let max_width = (CARD_WIDTH as i32 - x - MARGIN) as u32;
        let lines = wrap_title(&card.title, max_width, |s| text_size(title_scale, &self.semibold, s).0);
        for (i, line) in lines.iter().enumerate() {
            let y = 215 + i as i32 * TITLE_LINE_HEIGHT;
            draw_text_mut(&mut canvas, INK, x, y, title_scale, &self.semibold, line);
        }

        if let Some(subtitle) = &card.subtitle {
            draw_text_mut(&mut canvas, MUTED, x, 340, PxScale::from(26.0), &self.regular, subtitle);
        }

        self.draw_footer(&mut canvas);
        canvas.save_with_format(output, ImageFormat::Png)?;
        Ok(())
    }
}

/// Greedy word wrap to at most two lines. When text is cut, the second line
/// loses its last three characters to `...`.
fn wrap_title(title: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in title.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if current.is_empty() || measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > TITLE_MAX_LINES {
        lines.truncate(TITLE_MAX_LINES);
        if let Some(last) = lines.last_mut() {
            let chars: Vec<char> = last.trim_end().chars().collect();
            if chars.len() > 3 {
                *last = chars[..chars.len() - 3].iter().collect::<String>() + "...";
            }
        }
    }
    lines
}
