//! Print and preview of backend documents.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error_response;
use crate::api::{fetch_page_image, load_document};
use crate::layout::clamp_zoom;
use crate::render::{RenderOptions, Surface, document_page, document_pages, html::print_html};

use super::super::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PrintQuery {
    /// Viewer e-mail; only affects which placeholders would be marked.
    pub viewer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub surface: Option<Surface>,
    #[serde(default)]
    pub scale: Option<f64>,
    pub viewer: Option<String>,
}

fn viewer_or_default(state: &AppState, viewer: Option<String>) -> Option<String> {
    viewer.or_else(|| state.config.client.viewer_email.clone())
}

/// Handle GET /api/documents/:id/print - self-contained print HTML.
pub async fn print(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PrintQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let doc = load_document(state.api.as_ref(), &id)
        .await
        .map_err(error_response)?;

    let mut opts = RenderOptions::print();
    opts.viewer_email = viewer_or_default(&state, query.viewer);

    let mut pages = document_pages(&doc, &opts);
    for page in &mut pages {
        page.image = page.image.take().map(|p| state.config.client.asset_url(&p));
    }
    tracing::info!("[print] document {}: {} pages", id, pages.len());

    let title = if doc.title.is_empty() { &doc.id } else { &doc.title };
    Ok(Html(print_html(title, &pages)))
}

/// Handle GET /api/documents/:id/pages/:page/preview - composited PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(String, u32)>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let doc = load_document(state.api.as_ref(), &id)
        .await
        .map_err(error_response)?;

    let mut opts = RenderOptions::new(
        query.surface.unwrap_or(Surface::Readonly),
        clamp_zoom(query.scale.unwrap_or(1.0)),
    )
    .on_page(page);
    opts.viewer_email = viewer_or_default(&state, query.viewer);

    let rendered = document_page(&doc, &opts).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Document {} has no page {}", id, page),
        )
    })?;

    let background = fetch_page_image(state.api.as_ref(), rendered.image.as_deref()).await;

    let compositor = state.compositor.clone();
    let png = tokio::task::spawn_blocking(move || compositor.render_png(background.as_deref(), &rendered))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task error: {}", e)))?
        .map_err(error_response)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
