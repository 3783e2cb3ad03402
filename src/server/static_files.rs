//! Embedded survey form.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use include_dir::{include_dir, Dir};
use std::sync::Arc;

use crate::proposal;

use super::state::AppState;

static FRONTEND_DIST: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend/dist");

/// Assets are versioned through the `?v=` query, so they never go stale.
const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Render the form page for a server started at `boot_time`.
fn render_index(template: &str, boot_time: u64) -> String {
    let versioned = template
        .replace(".js\"", &format!(".js?v={boot_time}\""))
        .replace(".css\"", &format!(".css?v={boot_time}\""));

    // The cropper needs each slot's aspect ratio before the first upload
    let slots_json = serde_json::to_string(&proposal::slot_table()).unwrap_or_else(|e| {
        log::error!("Could not serialize image slots: {e}");
        "[]".to_string()
    });
    versioned.replace(
        "</head>",
        &format!("<script>window.__IMAGE_SLOTS={slots_json}</script></head>"),
    )
}

/// GET / - The survey form.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(file) = FRONTEND_DIST.get_file("index.html") else {
        return (StatusCode::NOT_FOUND, "Survey form missing from build").into_response();
    };
    let template = String::from_utf8_lossy(file.contents());
    Html(render_index(&template, state.boot_time)).into_response()
}

/// GET /assets/*path - Script and stylesheet for the form.
pub async fn asset_handler(Path(path): Path<String>) -> Response {
    let name = path.split('?').next().unwrap_or_default();
    let Some(file) = FRONTEND_DIST.get_file(format!("assets/{name}")) else {
        log::debug!("Unknown asset requested: {name}");
        return (StatusCode::NOT_FOUND, "Asset not found").into_response();
    };

    let mime = mime_guess::from_path(name).first_or_octet_stream();
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, ASSET_CACHE_CONTROL.to_string()),
        ],
        file.contents(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_index() {
        let page = render_index(
            r#"<head><link href="/assets/app.css"></head><script src="/assets/app.js"></script>"#,
            42,
        );
        assert!(page.contains(r#"href="/assets/app.css?v=42""#));
        assert!(page.contains(r#"src="/assets/app.js?v=42""#));
        assert!(page.contains("window.__IMAGE_SLOTS=[{\"id\":\"1\""));
        assert_eq!(page.matches("</head>").count(), 1);
    }

    #[test]
    fn test_form_is_embedded() {
        for name in ["index.html", "assets/app.js", "assets/app.css"] {
            assert!(FRONTEND_DIST.get_file(name).is_some(), "{name} not embedded");
        }
    }
}
