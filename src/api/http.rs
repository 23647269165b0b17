//! `reqwest` implementation of [`DocumentApi`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    ActionPayload, BulkCommitResult, BulkStagingItem, DocumentApi, FieldValueUpdate, Notification,
};
use crate::config::ClientConfig;
use crate::document::{Document, DocumentData, Template, WorkflowAction};
use crate::error::DocflowError;
use crate::field::Field;

/// HTTP client for the document backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    config: ClientConfig,
}

/// Message of an error response: the backend's `{"message": ...}` when
/// present, else the raw body, else the status reason.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = value.get("message").and_then(|m| m.as_str())
    {
        return message.to_string();
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

impl HttpApi {
    pub fn new(config: ClientConfig) -> Result<Self, DocflowError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("docflow/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| DocflowError::Transport(format!("HTTP client error: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.config.api_url(path))
    }

    /// Send and return the response if it has a success status.
    async fn send(&self, req: RequestBuilder) -> Result<Response, DocflowError> {
        let response = req
            .send()
            .await
            .map_err(|e| DocflowError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        tracing::warn!("[api] {} {}", status.as_u16(), message);
        Err(DocflowError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, DocflowError> {
        let bytes = self
            .send(req)
            .await?
            .bytes()
            .await
            .map_err(|e| DocflowError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| DocflowError::Decode(e.to_string()))
    }

    async fn empty(&self, req: RequestBuilder) -> Result<(), DocflowError> {
        self.send(req).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DocflowError> {
        tracing::debug!("[api] GET {}", path);
        self.json(self.request(Method::GET, path)).await
    }

    async fn with_body<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, DocflowError> {
        tracing::debug!("[api] {} {}", method, path);
        self.json(self.request(method, path).json(body)).await
    }
}

#[async_trait]
impl DocumentApi for HttpApi {
    async fn list_templates(&self) -> Result<Vec<Template>, DocflowError> {
        self.get("/templates").await
    }

    async fn get_template(&self, id: &str) -> Result<Template, DocflowError> {
        self.get(&format!("/templates/{}", id)).await
    }

    async fn update_template_fields(&self, id: &str, fields: &[Field]) -> Result<Template, DocflowError> {
        self.with_body(
            Method::PUT,
            &format!("/templates/{}", id),
            &json!({ "coordinateFields": fields }),
        )
        .await
    }

    async fn delete_template(&self, id: &str) -> Result<(), DocflowError> {
        self.empty(self.request(Method::DELETE, &format!("/templates/{}", id)))
            .await
    }

    async fn list_documents(&self) -> Result<Vec<Document>, DocflowError> {
        self.get("/documents").await
    }

    async fn get_document(&self, id: &str) -> Result<Document, DocflowError> {
        self.get(&format!("/documents/{}", id)).await
    }

    async fn save_document(&self, id: &str, data: &DocumentData) -> Result<Document, DocflowError> {
        self.with_body(Method::PUT, &format!("/documents/{}", id), &json!({ "data": data }))
            .await
    }

    async fn upsert_field_value(&self, id: &str, update: &FieldValueUpdate) -> Result<(), DocflowError> {
        let req = self
            .request(Method::POST, &format!("/documents/{}/field-values", id))
            .json(update);
        self.empty(req).await
    }

    async fn workflow_action(
        &self,
        id: &str,
        action: WorkflowAction,
        payload: &ActionPayload,
    ) -> Result<Document, DocflowError> {
        self.with_body(
            Method::POST,
            &format!("/documents/{}/{}", id, action.slug()),
            payload,
        )
        .await
    }

    async fn bulk_staging_items(&self, staging_id: &str) -> Result<Vec<BulkStagingItem>, DocflowError> {
        self.get(&format!("/documents/bulk/staging/{}/items", staging_id))
            .await
    }

    async fn bulk_commit(&self, staging_id: &str) -> Result<BulkCommitResult, DocflowError> {
        self.with_body(
            Method::POST,
            "/documents/bulk/commit",
            &json!({ "stagingId": staging_id }),
        )
        .await
    }

    async fn bulk_cancel(&self, staging_id: &str) -> Result<(), DocflowError> {
        let req = self
            .request(Method::POST, "/documents/bulk/cancel")
            .json(&json!({ "stagingId": staging_id }));
        self.empty(req).await
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, DocflowError> {
        self.get("/notifications").await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), DocflowError> {
        self.empty(self.request(Method::PUT, &format!("/notifications/{}/read", id)))
            .await
    }

    async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, DocflowError> {
        let url = self.config.asset_url(path);
        tracing::debug!("[api] GET asset {}", url);
        let bytes = self
            .send(self.client.get(&url))
            .await?
            .bytes()
            .await
            .map_err(|e| DocflowError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_backend_message() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":"문서를 찾을 수 없습니다"}"#),
            "문서를 찾을 수 없습니다"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"error":"x"}"#),
            r#"{"error":"x"}"#
        );
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let api = HttpApi::new(ClientConfig::default()).unwrap();
        assert_eq!(api.config().timeout_secs, 30);
    }
}
