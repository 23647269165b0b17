//! Stateless overlay rendering.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentTask, LabelFallback, merge_fields};
use crate::field::{SignatureField, decode_fields};
use crate::render::{RenderInput, RenderNode, RenderOptions, html::overlay_html, render_fields};

/// Body of `POST /api/render`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Template field shapes (array or JSON-encoded array).
    #[serde(default)]
    pub template_fields: serde_json::Value,
    /// Document field copies (array or JSON-encoded array).
    #[serde(default)]
    pub fields: serde_json::Value,
    #[serde(default)]
    pub signature_fields: Vec<SignatureField>,
    #[serde(default)]
    pub tasks: Vec<DocumentTask>,
    pub options: RenderOptions,
    /// Also return the overlay as HTML.
    #[serde(default)]
    pub html: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub nodes: Vec<RenderNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_fallbacks: Vec<LabelFallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Handle POST /api/render - fields + options to positioned nodes.
pub async fn render(Json(req): Json<RenderRequest>) -> Result<Json<RenderResponse>, (StatusCode, String)> {
    if !(req.options.scale.is_finite() && req.options.scale > 0.0) {
        return Err((StatusCode::BAD_REQUEST, "scale must be a positive number".to_string()));
    }

    let template_fields = decode_fields(req.template_fields)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid templateFields: {}", e)))?;
    let fields = decode_fields(req.fields)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid fields: {}", e)))?;

    let merged = merge_fields(&template_fields, &fields);
    let input = RenderInput::new(&merged.fields)
        .with_signatures(&req.signature_fields)
        .with_tasks(&req.tasks);
    let nodes = render_fields(&input, &req.options);
    let html = req.html.then(|| overlay_html(&nodes));

    Ok(Json(RenderResponse {
        nodes,
        label_fallbacks: merged.label_fallbacks,
        html,
    }))
}
