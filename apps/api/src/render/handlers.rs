//! Axum route handlers for the render API.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::assets::RenderAssets;
use crate::errors::AppError;
use crate::render::archive::build_zip;
use crate::render::raster::rasterize_or_placeholder;
use crate::render::{render_pdf, RenderRequest, RenderedPdf};
use crate::state::AppState;

/// ASCII fallback plus RFC 5987 encoding of 手写文档.pdf.
const DOWNLOAD_DISPOSITION: &str = "attachment; filename=\"handwriting.pdf\"; \
     filename*=UTF-8''%E6%89%8B%E5%86%99%E6%96%87%E6%A1%A3.pdf";
const ZIP_DISPOSITION: &str = "attachment; filename=\"handwriting_pages.zip\"";

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub preview_url: String,
    pub pages: usize,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub download_url: String,
    pub pages: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /preview
///
/// Renders the request and returns a URL for inline viewing.
pub async fn handle_preview(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, AppError> {
    let Json(request) = payload?;
    let rendered = render_blocking(state.assets.clone(), request, "preview").await?;
    let filename = state.store.save_pdf(&rendered.bytes).await?;
    info!(%filename, pages = rendered.page_count, "Preview ready");

    Ok(Json(PreviewResponse {
        success: true,
        preview_url: format!("/view_pdf/{filename}"),
        pages: rendered.page_count,
    }))
}

/// POST /generate
///
/// Same pipeline as preview; the returned URL serves the file as an attachment.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload?;
    let rendered = render_blocking(state.assets.clone(), request, "generate").await?;
    let filename = state.store.save_pdf(&rendered.bytes).await?;
    info!(%filename, pages = rendered.page_count, "Document generated");

    Ok(Json(GenerateResponse {
        success: true,
        download_url: format!("/download/{filename}"),
        pages: rendered.page_count,
    }))
}

/// POST /export_images
///
/// Renders, rasterizes each page to PNG and returns them zipped. Rasterizer
/// failures still produce a ZIP holding a placeholder page.
pub async fn handle_export_images(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let assets = state.assets.clone();
    let rasterizer = state.rasterizer.clone();
    let dpi = state.config.raster_dpi;

    let zip = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let rendered = render_pdf(&request, &assets)?;
        let outcome = rasterize_or_placeholder(rasterizer.as_ref(), &rendered.bytes, dpi);
        build_zip(&outcome).map_err(|e| AppError::Internal(e.into()))
    })
    .await
    .map_err(|e| {
        AppError::Internal(anyhow::anyhow!("spawn_blocking failed in image export: {e}"))
    })??;

    info!(bytes = zip.len(), "Image archive ready");
    Ok(binary_response(zip, "application/zip", Some(ZIP_DISPOSITION)))
}

/// GET /view_pdf/:filename
pub async fn handle_view_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.store.load_pdf(&filename).await?;
    Ok(binary_response(bytes, "application/pdf", None))
}

/// GET /download/:filename
pub async fn handle_download_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.store.load_pdf(&filename).await?;
    Ok(binary_response(bytes, "application/pdf", Some(DOWNLOAD_DISPOSITION)))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn render_blocking(
    assets: Arc<RenderAssets>,
    request: RenderRequest,
    stage: &'static str,
) -> Result<RenderedPdf, AppError> {
    let rendered = tokio::task::spawn_blocking(move || render_pdf(&request, &assets))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in {stage}: {e}"))
        })??;
    Ok(rendered)
}

fn binary_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    disposition: Option<&'static str>,
) -> Response {
    let mut response = Body::from(bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Some(disposition) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static(disposition));
    }
    response
}
