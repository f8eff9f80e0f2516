//! PDF → PNG rasterization for the image export path.
//!
//! The actual rendering is delegated to pdfium behind the [`Rasterizer`] trait.
//! [`rasterize_or_placeholder`] never fails: any error becomes a single white page
//! carrying the error message, drawn with a bundled monospace font so it shows up
//! whatever handwriting font is registered.

use std::path::PathBuf;
use std::sync::OnceLock;

use image::{Rgba, RgbaImage};
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::LoadedFont;
use crate::layout::engine::{break_point, char_table};
use crate::layout::settings::{PunctuationSet, PAGE_HEIGHT, PAGE_WIDTH};
use crate::layout::LayoutConfig;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("pdfium library unavailable: {0}")]
    Unavailable(String),

    #[error("cannot open PDF: {0}")]
    Load(String),

    #[error("cannot render page {page}: {message}")]
    Page { page: usize, message: String },

    #[error("PDF has no pages")]
    Empty,
}

/// Turns PDF bytes into one image per page.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8], dpi: u16) -> Result<Vec<RgbaImage>, RasterError>;
}

/// Result of the export path: real pages, or a placeholder explaining what went wrong.
#[derive(Debug, Clone)]
pub enum RasterOutcome {
    Pages(Vec<RgbaImage>),
    Placeholder { image: RgbaImage, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// pdfium
// ────────────────────────────────────────────────────────────────────────────

/// Binds pdfium on every call, from `library_dir` or the system search path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> Result<Pdfium, RasterError> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| RasterError::Unavailable(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8], dpi: u16) -> Result<Vec<RgbaImage>, RasterError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| RasterError::Load(format!("{e:?}")))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let mut images = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let page_number = idx + 1;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| RasterError::Page {
                    page: page_number,
                    message: format!("{e:?}"),
                })?;
            let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
            let image = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or(
                RasterError::Page {
                    page: page_number,
                    message: "bitmap size does not match its dimensions".to_string(),
                },
            )?;
            images.push(image);
        }

        if images.is_empty() {
            return Err(RasterError::Empty);
        }
        Ok(images)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback
// ────────────────────────────────────────────────────────────────────────────

/// Glyph source for placeholder text, independent of the registered handwriting font.
const MESSAGE_FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");
const MESSAGE_FONT_NAME: &str = "DejaVuSansMono";

static MESSAGE_FONT: OnceLock<Option<LoadedFont>> = OnceLock::new();

/// The bundled message font, parsed on first use.
pub fn message_font() -> Option<&'static LoadedFont> {
    MESSAGE_FONT
        .get_or_init(|| {
            match LoadedFont::from_bytes(MESSAGE_FONT_NAME, MESSAGE_FONT_DATA.to_vec()) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(error = %e, "Bundled message font unreadable");
                    None
                }
            }
        })
        .as_ref()
}

/// Rasterizes `pdf`, substituting a placeholder page on any failure.
pub fn rasterize_or_placeholder(
    rasterizer: &dyn Rasterizer,
    pdf: &[u8],
    dpi: u16,
) -> RasterOutcome {
    match rasterizer.rasterize(pdf, dpi) {
        Ok(pages) => {
            info!(pages = pages.len(), dpi, "PDF rasterized");
            RasterOutcome::Pages(pages)
        }
        Err(e) => {
            warn!(error = %e, "Rasterization failed, returning placeholder image");
            let message = format!("Image export failed: {e}");
            RasterOutcome::Placeholder {
                image: placeholder_image(&message, dpi, message_font()),
                message,
            }
        }
    }
}

/// White A4 page at `dpi` (at least 1) with `message` drawn in `font`.
pub fn placeholder_image(message: &str, dpi: u16, font: Option<&LoadedFont>) -> RgbaImage {
    let scale = dpi.max(1) as f32 / 72.0;
    let width = ((PAGE_WIDTH * scale).round() as u32).max(1);
    let height = ((PAGE_HEIGHT * scale).round() as u32).max(1);
    let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    if let Some(font) = font {
        draw_message(&mut image, message, font, scale);
    }
    image
}

/// Wraps the message with the layout engine's break rules and blits it top-down.
fn draw_message(image: &mut RgbaImage, message: &str, font: &LoadedFont, scale: f32) {
    let px = 18.0 * scale;
    let margin = 72.0 * scale;
    let config = LayoutConfig {
        font_size: px,
        start_x: margin,
        start_y: margin + px,
        line_height: px * 1.4,
        line_jitter: 0,
        char_jitter: 0.0,
        max_width: (image.width() as f32 - 2.0 * margin).max(px),
        page_bottom_margin: 0.0,
        punctuation: PunctuationSet::default(),
    };

    let mut baseline = config.start_y;
    for line in message.lines() {
        let (chars, _) = char_table(line);
        let mut start = 0;
        while start < chars.len() {
            let cut = break_point(&chars[start..], &config, font);

            let mut pen_x = config.start_x;
            for &ch in &chars[start..start + cut] {
                let (metrics, coverage) = font.rasterize(ch, px);
                let left = pen_x.round() as i64 + metrics.xmin as i64;
                let top = baseline.round() as i64 - metrics.height as i64 - metrics.ymin as i64;
                blit_coverage(image, &coverage, metrics.width, left, top);
                pen_x += metrics.advance_width;
            }

            baseline += config.line_height;
            start += cut;
        }
    }
}

/// Darkens pixels by glyph coverage (black ink on the white page).
fn blit_coverage(image: &mut RgbaImage, coverage: &[u8], width: usize, left: i64, top: i64) {
    if width == 0 {
        return;
    }
    for (idx, &alpha) in coverage.iter().enumerate() {
        let x = left + (idx % width) as i64;
        let y = top + (idx / width) as i64;
        if alpha == 0 || x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64
        {
            continue;
        }
        let pixel = image.get_pixel_mut(x as u32, y as u32);
        let ink = 255 - alpha;
        for channel in pixel.0.iter_mut().take(3) {
            *channel = (*channel).min(ink);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
