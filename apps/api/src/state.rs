use std::sync::Arc;

use crate::assets::RenderAssets;
use crate::config::Config;
use crate::render::raster::Rasterizer;
use crate::render::storage::OutputStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Font and background, loaded once at startup.
    pub assets: Arc<RenderAssets>,
    /// PDF → PNG backend for the image export path. Default: pdfium.
    pub rasterizer: Arc<dyn Rasterizer>,
    pub store: OutputStore,
}
