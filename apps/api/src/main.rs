mod assets;
mod config;
mod errors;
mod layout;
mod render;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assets::RenderAssets;
use crate::config::Config;
use crate::render::raster::PdfiumRasterizer;
use crate::render::storage::OutputStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting handwrite v{}", env!("CARGO_PKG_VERSION"));

    // Font and background are registered once and shared by every request
    let assets = Arc::new(RenderAssets::load(&config));
    info!(
        font = assets.font.name(),
        background = assets.background.is_some(),
        "Render assets loaded"
    );

    let store = OutputStore::new(&config.output_dir).with_context(|| {
        format!("cannot create output directory {}", config.output_dir.display())
    })?;
    info!(dir = %store.dir().display(), "Output store ready");

    let rasterizer = Arc::new(PdfiumRasterizer::new(config.pdfium_library_dir.clone()));

    let state = AppState {
        config: config.clone(),
        assets,
        rasterizer,
        store,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST:PORT is not a valid socket address")?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
