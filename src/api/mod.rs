//! # Backend API
//!
//! REST contract of the document backend, as a trait so stores and the
//! render service can run against [`HttpApi`] or an in-memory stand-in.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | `list_templates` | `GET /templates` |
//! | `get_template` | `GET /templates/:id` |
//! | `update_template_fields` | `PUT /templates/:id` |
//! | `delete_template` | `DELETE /templates/:id` |
//! | `list_documents` | `GET /documents` |
//! | `get_document` | `GET /documents/:id` |
//! | `save_document` | `PUT /documents/:id` (`{data}`) |
//! | `upsert_field_value` | `POST /documents/:id/field-values` |
//! | `workflow_action` | `POST /documents/:id/<action>` |
//! | `bulk_staging_items` | `GET /documents/bulk/staging/:id/items` |
//! | `bulk_commit` / `bulk_cancel` | `POST /documents/bulk/{commit,cancel}` |
//! | `list_notifications` | `GET /notifications` |
//! | `mark_notification_read` | `PUT /notifications/:id/read` |
//! | `fetch_asset` | `GET <uploads>/<path>` |

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpApi;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentData, Template, WorkflowAction};
use crate::error::DocflowError;
use crate::field::Field;

/// Body of `POST /documents/:id/field-values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValueUpdate {
    pub field_id: String,
    pub value: String,
}

/// Optional body of a workflow action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    /// Rejection reason or review comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Signature image for `sign`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_data: Option<String>,
}

impl ActionPayload {
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            comment: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn signature(data_uri: impl Into<String>) -> Self {
        Self {
            signature_data: Some(data_uri.into()),
            ..Default::default()
        }
    }
}

/// One in-app notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, alias = "read")]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Validation state of a staged bulk-creation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StagingStatus {
    #[default]
    Valid,
    Invalid,
    Committed,
}

/// One row of a bulk-creation staging set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStagingItem {
    pub id: String,
    #[serde(default)]
    pub row_index: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: StagingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Field values keyed by field id or label, as read from the sheet.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Result of committing a staging set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCommitResult {
    #[serde(default)]
    pub created_count: usize,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

/// The backend, as seen by the client.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<Template>, DocflowError>;
    async fn get_template(&self, id: &str) -> Result<Template, DocflowError>;
    async fn update_template_fields(&self, id: &str, fields: &[Field]) -> Result<Template, DocflowError>;
    async fn delete_template(&self, id: &str) -> Result<(), DocflowError>;

    async fn list_documents(&self) -> Result<Vec<Document>, DocflowError>;
    async fn get_document(&self, id: &str) -> Result<Document, DocflowError>;
    async fn save_document(&self, id: &str, data: &DocumentData) -> Result<Document, DocflowError>;
    async fn upsert_field_value(&self, id: &str, update: &FieldValueUpdate) -> Result<(), DocflowError>;
    async fn workflow_action(
        &self,
        id: &str,
        action: WorkflowAction,
        payload: &ActionPayload,
    ) -> Result<Document, DocflowError>;

    async fn bulk_staging_items(&self, staging_id: &str) -> Result<Vec<BulkStagingItem>, DocflowError>;
    async fn bulk_commit(&self, staging_id: &str) -> Result<BulkCommitResult, DocflowError>;
    async fn bulk_cancel(&self, staging_id: &str) -> Result<(), DocflowError>;

    async fn list_notifications(&self) -> Result<Vec<Notification>, DocflowError>;
    async fn mark_notification_read(&self, id: &str) -> Result<(), DocflowError>;

    /// Raw bytes of an uploaded file (page images).
    async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, DocflowError>;
}

/// Fetch a document with its template attached.
///
/// Documents fetched from the list endpoint may come without the embedded
/// template; in that case it is loaded separately.
pub async fn load_document(api: &dyn DocumentApi, id: &str) -> Result<Document, DocflowError> {
    let mut doc = api.get_document(id).await?;
    if doc.template.is_none() {
        doc.template = Some(api.get_template(&doc.template_id).await?);
    }
    Ok(doc)
}

/// Page image bytes for a rendered page.
///
/// A missing or unreachable image is logged and yields `None`, so the page is
/// drawn on a blank background instead of failing.
pub async fn fetch_page_image(api: &dyn DocumentApi, image: Option<&str>) -> Option<Vec<u8>> {
    let path = image?;
    match api.fetch_asset(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("[api] page image {} unavailable: {}", path, e);
            None
        }
    }
}
