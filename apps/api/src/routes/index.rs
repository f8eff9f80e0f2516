use axum::response::Html;

/// GET /
/// Single-page form driving the preview, generate and export endpoints.
pub async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
