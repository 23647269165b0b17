//! # Render Service
//!
//! Serves overlay rendering over HTTP: stateless node rendering, print HTML
//! and PNG previews of documents fetched from the backend.
//!
//! ## Usage
//!
//! ```bash
//! docflow serve --listen 0.0.0.0:3000 --api-url http://backend:8080/api
//! ```
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /health` | `{"status":"ok",...}` |
//! | `POST /api/render` | nodes JSON |
//! | `GET /api/documents/:id/print` | print HTML |
//! | `GET /api/documents/:id/pages/:page/preview` | PNG |

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::DocflowError;

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/render", post(handlers::render::render))
        .route("/api/documents/:id/print", get(handlers::documents::print))
        .route(
            "/api/documents/:id/pages/:page/preview",
            get(handlers::documents::preview),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.started.elapsed().as_secs(),
    }))
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use docflow::config::ClientConfig;
/// use docflow::server::{ServerConfig, serve};
///
/// # async fn example() -> Result<(), docflow::error::DocflowError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:3000".to_string(),
///     client: ClientConfig::default(),
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), DocflowError> {
    let app_state = Arc::new(AppState::new(config.clone())?);
    let app = router(app_state);

    tracing::info!("docflow render service listening on {}", config.listen_addr);
    tracing::info!("Backend API: {}", config.client.api_base_url);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            DocflowError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DocflowError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}
