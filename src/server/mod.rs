//! # HTTP Server for Proposal Generation
//!
//! Serves the survey form and turns each submission into a filled-in deck.
//!
//! ## Usage
//!
//! ```bash
//! proposal-deck serve --listen 127.0.0.1:5000 --template FTP_Template.pptx
//! ```
//!
//! Then open http://localhost:5000 in a browser, fill in the form, crop the
//! photos and download the generated `.pptx`.

mod handlers;
mod state;
mod static_files;

pub use state::ServerConfig;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::DeckError;
use crate::photo;
use state::AppState;

/// Uploads carry up to three full-resolution photos as data URLs.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Processed images older than this are assumed orphaned.
const STALE_ASSET_SECS: u64 = 60 * 60;

/// Build the router. Split out from [`serve`] so it can be driven directly.
pub fn router(config: ServerConfig) -> Router {
    let app_state = Arc::new(AppState::new(config));

    Router::new()
        // Frontend
        .route("/", get(static_files::index_handler))
        .route("/assets/*path", get(static_files::asset_handler))
        // API
        .route("/api/slots", get(handlers::slots::list))
        .route(
            "/generate",
            post(handlers::generate::generate).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(app_state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use proposal_deck::generate::GeneratorConfig;
/// use proposal_deck::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), proposal_deck::error::DeckError> {
/// let config = ServerConfig {
///     listen_addr: "127.0.0.1:5000".to_string(),
///     generator: GeneratorConfig {
///         template_path: "FTP_Template.pptx".into(),
///         output_dir: "generated_proposals".into(),
///         temp_dir: "temp_images".into(),
///     },
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), DeckError> {
    config.generator.ensure_dirs()?;
    if !config.generator.template_path.is_file() {
        log::warn!(
            "Template {} does not exist yet; requests will fail until it does",
            config.generator.template_path.display()
        );
    }

    tokio::spawn(cleanup_temp_images(config.generator.temp_dir.clone()));

    let listen_addr = config.listen_addr.clone();
    log::info!("Proposal server starting...");
    log::info!("Listening on: {}", listen_addr);
    log::info!("Template: {}", config.generator.template_path.display());
    log::info!("Output directory: {}", config.generator.output_dir.display());
    log::info!("Open http://{}/ in your browser to create a proposal", listen_addr);

    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| {
            DeckError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", listen_addr, e),
            ))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DeckError::Io(std::io::Error::new(e.kind(), format!("Server error: {}", e))))?;

    Ok(())
}

/// Background task removing processed images orphaned by interrupted requests.
async fn cleanup_temp_images(temp_dir: std::path::PathBuf) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let max_age = Duration::from_secs(STALE_ASSET_SECS);

    loop {
        interval.tick().await;
        let dir = temp_dir.clone();
        match tokio::task::spawn_blocking(move || photo::sweep_stale(&dir, max_age)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(removed)) => log::info!("[cleanup] Removed {} stale temp image(s)", removed),
            Ok(Err(e)) => log::warn!("[cleanup] Could not sweep {}: {}", temp_dir.display(), e),
            Err(e) => log::warn!("[cleanup] Task error: {}", e),
        }
    }
}
