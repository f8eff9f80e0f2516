//! Render pipeline: request → validated config → layout → PDF bytes.
//!
//! CPU-bound. Handlers call [`render_pdf`] through `tokio::task::spawn_blocking`.

pub mod archive;
pub mod handlers;
pub mod pdf;
pub mod raster;
pub mod storage;

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::assets::RenderAssets;
use crate::layout::settings::validate_text;
use crate::layout::{layout, PageTemplate, RenderSettings, ValidationError};
use crate::render::pdf::{paint, PdfCanvas};

// ────────────────────────────────────────────────────────────────────────────
// Request / output types
// ────────────────────────────────────────────────────────────────────────────

/// JSON body shared by the preview, generate and image-export endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub text: String,
    /// Header values keyed by field name. Non-string values are drawn as JSON text.
    pub fields: BTreeMap<String, Value>,
    pub settings: RenderSettings,
}

impl RenderRequest {
    pub fn field_values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), text)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Lays out and draws one request into a PDF.
///
/// Jitter is seeded from `settings.seed` when given, otherwise from OS entropy.
pub fn render_pdf(
    request: &RenderRequest,
    assets: &RenderAssets,
) -> Result<RenderedPdf, ValidationError> {
    validate_text(&request.text)?;
    let config = request.settings.to_layout_config()?;

    let mut rng = match request.settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let template = PageTemplate {
        background: assets.background.as_ref().map(|b| b.name.clone()),
        header: request.settings.header_fields(&request.field_values()),
    };

    let document = layout(&request.text, &template, &config, &assets.font, &mut rng);

    let mut canvas = PdfCanvas::new(
        assets.font.clone(),
        config.font_size,
        assets.background.clone(),
        document.page_width,
        document.page_height,
    );
    paint(&document, &mut canvas);
    let page_count = canvas.page_count();
    let bytes = canvas.save();

    info!(
        font = assets.font.name(),
        pages = page_count,
        glyphs = document.glyph_count(),
        bytes = bytes.len(),
        "PDF rendered"
    );

    Ok(RenderedPdf { bytes, page_count })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
