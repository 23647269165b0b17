//! Client configuration shared by the CLI and the render service.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Backend endpoints and client-side tuning.
///
/// Every option can also be set through a `DOCFLOW_*` environment variable.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend REST API
    #[arg(long = "api-url", env = "DOCFLOW_API_URL", default_value = "http://localhost:8080/api")]
    pub api_base_url: String,

    /// Base URL that serves uploaded page images
    #[arg(long = "uploads-url", env = "DOCFLOW_UPLOADS_URL", default_value = "http://localhost:8080")]
    pub uploads_base_url: String,

    /// Request timeout in seconds
    #[arg(long = "timeout", env = "DOCFLOW_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Debounce window for field autosave, in milliseconds
    #[arg(long = "autosave-ms", env = "DOCFLOW_AUTOSAVE_MS", default_value_t = 1000)]
    pub autosave_debounce_ms: u64,

    /// TTF/OTF font used for text in PNG previews
    #[arg(long = "font", env = "DOCFLOW_FONT", value_name = "FILE")]
    pub font_path: Option<PathBuf>,

    /// E-mail of the viewing user (marks their own signature slots)
    #[arg(long = "viewer", env = "DOCFLOW_VIEWER_EMAIL")]
    pub viewer_email: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            uploads_base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            autosave_debounce_ms: 1000,
            font_path: None,
            viewer_email: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Absolute URL of an API path (`/documents/1` → `<api>/documents/1`).
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }

    /// Absolute URL of an uploaded asset. Absolute inputs pass through.
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        join_url(&self.uploads_base_url, path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
