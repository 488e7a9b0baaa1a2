mod config;
mod errors;
mod routes;
mod screening;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::routes::build_router;
use crate::screening::{StopwordSet, TesseractOcr};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; malformed values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Stopwords are loaded once and shared read-only by every request
    let stopwords = StopwordSet::english();
    info!("Stopword set loaded ({} words)", stopwords.len());

    // Initialize OCR fallback (pdftoppm + tesseract)
    let ocr_settings = config.ocr_settings();
    info!(
        dpi = ocr_settings.dpi,
        language = %ocr_settings.language,
        timeout_secs = ocr_settings.timeout.as_secs(),
        parallel_pages = ocr_settings.max_parallel_pages,
        "OCR fallback configured"
    );
    let ocr = Arc::new(TesseractOcr::new(ocr_settings));

    // Build app state
    let state = AppState {
        config: config.clone(),
        stopwords,
        ocr,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
