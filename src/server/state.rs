//! Server state and configuration.

use std::sync::Arc;
use std::time::Instant;

use crate::api::{DocumentApi, HttpApi};
use crate::config::ClientConfig;
use crate::error::DocflowError;
use crate::render::raster::PageCompositor;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:3000")
    pub listen_addr: String,
    /// Backend the service renders documents from
    pub client: ClientConfig,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub api: Arc<dyn DocumentApi>,
    pub compositor: PageCompositor,
    pub started: Instant,
}

impl AppState {
    /// State backed by the HTTP API described in `config`.
    pub fn new(config: ServerConfig) -> Result<Self, DocflowError> {
        let api: Arc<dyn DocumentApi> = Arc::new(HttpApi::new(config.client.clone())?);
        let compositor = match &config.client.font_path {
            Some(path) => PageCompositor::with_font_file(path)?,
            None => {
                tracing::info!("No font configured, PNG previews will not contain text");
                PageCompositor::new()
            }
        };
        Ok(Self::with_api(config, api, compositor))
    }

    pub fn with_api(config: ServerConfig, api: Arc<dyn DocumentApi>, compositor: PageCompositor) -> Self {
        Self {
            config,
            api,
            compositor,
            started: Instant::now(),
        }
    }
}
