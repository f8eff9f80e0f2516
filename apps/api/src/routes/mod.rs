pub mod health;
pub mod index;

use axum::{
    routing::{get, post},
    Router,
};

use crate::render::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index_handler))
        .route("/health", get(health::health_handler))
        // Render API
        .route("/preview", post(handlers::handle_preview))
        .route("/generate", post(handlers::handle_generate))
        .route("/export_images", post(handlers::handle_export_images))
        // Stored output
        .route("/view_pdf/:filename", get(handlers::handle_view_pdf))
        .route("/download/:filename", get(handlers::handle_download_pdf))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use image::RgbaImage;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::assets::RenderAssets;
    use crate::config::Config;
    use crate::render::raster::{RasterError, Rasterizer};
    use crate::render::storage::OutputStore;

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn rasterize(&self, _pdf: &[u8], _dpi: u16) -> Result<Vec<RgbaImage>, RasterError> {
            Err(RasterError::Unavailable("no pdfium in tests".to_string()))
        }
    }

    fn test_state(dir: &std::path::Path) -> AppState {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            font_path: PathBuf::from("/nonexistent/handwrite.ttf"),
            font_name: "HandwriteFont".to_string(),
            background_path: PathBuf::from("/nonexistent/base.jpg"),
            output_dir: dir.to_path_buf(),
            raster_dpi: 72,
            pdfium_library_dir: None,
        };
        AppState {
            assets: Arc::new(RenderAssets::builtin()),
            rasterizer: Arc::new(FailingRasterizer),
            store: OutputStore::new(&config.output_dir).unwrap(),
            config,
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(test_state(dir.path()))
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service"], "handwrite");
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(test_state(dir.path()))
            .oneshot(get("/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/preview"));
    }

    #[tokio::test]
    async fn test_preview_then_view() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(post_json(
                "/preview",
                json!({"text": "Hello, handwriting.", "settings": {"seed": 5}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["pages"], 1);
        let url = body["preview_url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/view_pdf/"));

        let response = app.oneshot(get(&url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_generate_then_download_as_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let response = app
            .clone()
            .oneshot(post_json("/generate", json!({"text": "Download me."})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let url = body["download_url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/download/"));

        let response = app.oneshot(get(&url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("%E6%89%8B%E5%86%99%E6%96%87%E6%A1%A3.pdf"));
    }

    #[tokio::test]
    async fn test_invalid_settings_are_400() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(test_state(dir.path()))
            .oneshot(post_json(
                "/preview",
                json!({"text": "x", "settings": {"line_height": 0}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_oversized_jitter_is_400_not_500() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(test_state(dir.path()))
            .oneshot(post_json(
                "/preview",
                json!({"text": "AB", "settings": {"char_jitter": 3.0e38}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_non_numeric_setting_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(test_state(dir.path()))
            .oneshot(post_json(
                "/generate",
                json!({"text": "x", "settings": {"font_size": "big"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));
        for uri in ["/view_pdf/nope.pdf", "/download/..%2Fsecret.pdf"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_export_images_falls_back_to_placeholder_zip() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(test_state(dir.path()))
            .oneshot(post_json("/export_images", json!({"text": "Pages as images."})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        assert!(archive.by_name("error.png").is_ok());
        assert!(archive.by_name("error.txt").is_ok());
    }
}
