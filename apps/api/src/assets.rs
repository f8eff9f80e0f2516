//! Startup assets: the handwriting font and the page background.
//!
//! Both are loaded once and shared read-only through `AppState`. Neither is required:
//! a missing or broken font falls back to built-in Helvetica, and a missing background
//! is simply not drawn.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use fontdue::{Font, FontSettings, Metrics};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::layout::{FontMetricTable, TextMeasure, HELVETICA};

// ────────────────────────────────────────────────────────────────────────────
// Fonts
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FontError {
    #[error("cannot read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse font: {0}")]
    Parse(String),
}

/// A TrueType font registered for drawing and measurement.
pub struct LoadedFont {
    name: String,
    data: Arc<Vec<u8>>,
    font: Font,
}

impl LoadedFont {
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self, FontError> {
        let font = Font::from_bytes(data.as_slice(), FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            data: Arc::new(data),
            font,
        })
    }

    pub fn from_file(name: &str, path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw font program, embedded into the PDF as-is.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn glyph_index(&self, ch: char) -> u16 {
        self.font.lookup_glyph_index(ch)
    }

    /// Advance width of a glyph in PDF glyph-space units (1/1000 em).
    pub fn glyph_width(&self, glyph: u16) -> f32 {
        self.font.metrics_indexed(glyph, 1000.0).advance_width
    }

    /// `(ascent, descent)` in 1/1000 em. Descent is negative.
    pub fn vertical_metrics(&self) -> (f32, f32) {
        self.font
            .horizontal_line_metrics(1000.0)
            .map(|m| (m.ascent, m.descent))
            .unwrap_or((800.0, -200.0))
    }

    /// Coverage bitmap of one character at `px` pixels per em.
    pub fn rasterize(&self, ch: char, px: f32) -> (Metrics, Vec<u8>) {
        self.font.rasterize(ch, px)
    }
}

impl TextMeasure for LoadedFont {
    fn char_width(&self, ch: char, font_size: f32) -> f32 {
        self.font.metrics(ch, font_size).advance_width
    }
}

impl fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Outcome of font registration. Never an error: failure means fallback.
#[derive(Debug)]
pub enum FontRegistration {
    Custom(LoadedFont),
    Fallback { reason: String },
}

/// Tries to register the TrueType font at `path` under `name`.
pub fn register_font(path: &Path, name: &str) -> FontRegistration {
    if !path.exists() {
        return FontRegistration::Fallback {
            reason: format!("font file {} not found", path.display()),
        };
    }
    match LoadedFont::from_file(name, path) {
        Ok(font) => FontRegistration::Custom(font),
        Err(e) => FontRegistration::Fallback {
            reason: e.to_string(),
        },
    }
}

/// The font every request is laid out and drawn with.
#[derive(Debug, Clone)]
pub enum ActiveFont {
    Embedded(Arc<LoadedFont>),
    Builtin(&'static FontMetricTable),
}

impl ActiveFont {
    pub fn from_registration(registration: FontRegistration) -> Self {
        match registration {
            FontRegistration::Custom(font) => {
                info!(font = font.name(), bytes = font.data().len(), "Custom font registered");
                ActiveFont::Embedded(Arc::new(font))
            }
            FontRegistration::Fallback { reason } => {
                warn!(%reason, fallback = HELVETICA.base_font, "Using built-in font");
                ActiveFont::Builtin(&HELVETICA)
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ActiveFont::Embedded(font) => font.name(),
            ActiveFont::Builtin(table) => table.base_font,
        }
    }
}

impl TextMeasure for ActiveFont {
    fn char_width(&self, ch: char, font_size: f32) -> f32 {
        match self {
            ActiveFont::Embedded(font) => font.char_width(ch, font_size),
            ActiveFont::Builtin(table) => table.char_width(ch, font_size),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Background
// ────────────────────────────────────────────────────────────────────────────

/// Background texture, decoded once and kept as zlib-compressed 8-bit RGB.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgb_deflated: Vec<u8>,
}

impl BackgroundImage {
    pub fn from_file(path: &Path) -> Result<Self, image::ImageError> {
        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let rgb_deflated = miniz_oxide::deflate::compress_to_vec_zlib(rgb.as_raw(), 6);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "background".to_string());
        Ok(Self {
            name,
            width,
            height,
            rgb_deflated,
        })
    }
}

/// Loads the background, or returns `None` when it is missing or unreadable.
pub fn load_background(path: &Path) -> Option<BackgroundImage> {
    if !path.exists() {
        info!(path = %path.display(), "No background image, pages stay blank");
        return None;
    }
    match BackgroundImage::from_file(path) {
        Ok(image) => {
            info!(
                path = %path.display(),
                width = image.width,
                height = image.height,
                "Background image loaded"
            );
            Some(image)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Background image unreadable, skipping");
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Asset bundle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RenderAssets {
    pub font: ActiveFont,
    pub background: Option<Arc<BackgroundImage>>,
}

impl RenderAssets {
    pub fn load(config: &Config) -> Self {
        let registration = register_font(&config.font_path, &config.font_name);
        Self {
            font: ActiveFont::from_registration(registration),
            background: load_background(&config.background_path).map(Arc::new),
        }
    }

    /// Helvetica, no background.
    pub fn builtin() -> Self {
        Self {
            font: ActiveFont::Builtin(&HELVETICA),
            background: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
