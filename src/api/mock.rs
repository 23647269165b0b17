//! In-memory [`DocumentApi`] for tests. Records every call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    ActionPayload, BulkCommitResult, BulkStagingItem, DocumentApi, FieldValueUpdate, Notification,
};
use crate::document::{Document, DocumentData, Template, WorkflowAction};
use crate::error::DocflowError;
use crate::field::Field;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    ListTemplates,
    GetTemplate(String),
    UpdateTemplateFields(String, usize),
    DeleteTemplate(String),
    ListDocuments,
    GetDocument(String),
    SaveDocument(String, DocumentData),
    UpsertFieldValue(String, FieldValueUpdate),
    WorkflowAction(String, WorkflowAction),
    BulkItems(String),
    BulkCommit(String),
    BulkCancel(String),
    ListNotifications,
    MarkRead(String),
    FetchAsset(String),
}

#[derive(Default)]
struct MockState {
    templates: HashMap<String, Template>,
    documents: HashMap<String, Document>,
    notifications: Vec<Notification>,
    staging: HashMap<String, Vec<BulkStagingItem>>,
    assets: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
    fail_next: Option<(u16, String)>,
    calls: Vec<ApiCall>,
}

#[derive(Default)]
pub(crate) struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn insert_template(&self, template: Template) {
        self.lock().templates.insert(template.id.clone(), template);
    }

    pub fn insert_document(&self, document: Document) {
        self.lock().documents.insert(document.id.clone(), document);
    }

    pub fn insert_notification(&self, notification: Notification) {
        self.lock().notifications.push(notification);
    }

    pub fn insert_staging(&self, staging_id: &str, items: Vec<BulkStagingItem>) {
        self.lock().staging.insert(staging_id.to_string(), items);
    }

    pub fn insert_asset(&self, path: &str, bytes: Vec<u8>) {
        self.lock().assets.insert(path.to_string(), bytes);
    }

    /// Delay `get_document(id)` responses.
    pub fn delay_document(&self, id: &str, delay: Duration) {
        self.lock().delays.insert(id.to_string(), delay);
    }

    /// Make the next call fail with an API error.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.lock().fail_next = Some((status, message.to_string()));
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn saves(&self) -> Vec<(String, DocumentData)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::SaveDocument(id, data) => Some((id, data)),
                _ => None,
            })
            .collect()
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.lock().documents.get(id).cloned()
    }

    fn record(&self, call: ApiCall) -> Result<(), DocflowError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.take() {
            Some((status, message)) => Err(DocflowError::Api { status, message }),
            None => Ok(()),
        }
    }

    fn not_found(what: &str, id: &str) -> DocflowError {
        DocflowError::Api {
            status: 404,
            message: format!("{} {} not found", what, id),
        }
    }
}

#[async_trait]
impl DocumentApi for MockApi {
    async fn list_templates(&self) -> Result<Vec<Template>, DocflowError> {
        self.record(ApiCall::ListTemplates)?;
        let mut templates: Vec<_> = self.lock().templates.values().cloned().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    async fn get_template(&self, id: &str) -> Result<Template, DocflowError> {
        self.record(ApiCall::GetTemplate(id.to_string()))?;
        self.lock()
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("template", id))
    }

    async fn update_template_fields(&self, id: &str, fields: &[Field]) -> Result<Template, DocflowError> {
        self.record(ApiCall::UpdateTemplateFields(id.to_string(), fields.len()))?;
        let mut state = self.lock();
        let template = state
            .templates
            .get_mut(id)
            .ok_or_else(|| Self::not_found("template", id))?;
        template.coordinate_fields = fields.to_vec();
        Ok(template.clone())
    }

    async fn delete_template(&self, id: &str) -> Result<(), DocflowError> {
        self.record(ApiCall::DeleteTemplate(id.to_string()))?;
        self.lock()
            .templates
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("template", id))
    }

    async fn list_documents(&self) -> Result<Vec<Document>, DocflowError> {
        self.record(ApiCall::ListDocuments)?;
        let mut documents: Vec<_> = self.lock().documents.values().cloned().collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn get_document(&self, id: &str) -> Result<Document, DocflowError> {
        self.record(ApiCall::GetDocument(id.to_string()))?;
        let delay = self.lock().delays.get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock()
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("document", id))
    }

    async fn save_document(&self, id: &str, data: &DocumentData) -> Result<Document, DocflowError> {
        self.record(ApiCall::SaveDocument(id.to_string(), data.clone()))?;
        let mut state = self.lock();
        let doc = state
            .documents
            .get_mut(id)
            .ok_or_else(|| Self::not_found("document", id))?;
        doc.data = data.clone();
        Ok(doc.clone())
    }

    async fn upsert_field_value(&self, id: &str, update: &FieldValueUpdate) -> Result<(), DocflowError> {
        self.record(ApiCall::UpsertFieldValue(id.to_string(), update.clone()))
    }

    async fn workflow_action(
        &self,
        id: &str,
        action: WorkflowAction,
        _payload: &ActionPayload,
    ) -> Result<Document, DocflowError> {
        self.record(ApiCall::WorkflowAction(id.to_string(), action))?;
        let mut state = self.lock();
        let doc = state
            .documents
            .get_mut(id)
            .ok_or_else(|| Self::not_found("document", id))?;
        doc.apply(action).map_err(|e| DocflowError::Api {
            status: 400,
            message: e.to_string(),
        })?;
        Ok(doc.clone())
    }

    async fn bulk_staging_items(&self, staging_id: &str) -> Result<Vec<BulkStagingItem>, DocflowError> {
        self.record(ApiCall::BulkItems(staging_id.to_string()))?;
        self.lock()
            .staging
            .get(staging_id)
            .cloned()
            .ok_or_else(|| Self::not_found("staging", staging_id))
    }

    async fn bulk_commit(&self, staging_id: &str) -> Result<BulkCommitResult, DocflowError> {
        self.record(ApiCall::BulkCommit(staging_id.to_string()))?;
        let items = self
            .lock()
            .staging
            .remove(staging_id)
            .ok_or_else(|| Self::not_found("staging", staging_id))?;
        Ok(BulkCommitResult {
            created_count: items.len(),
            document_ids: items.iter().map(|i| format!("doc-{}", i.id)).collect(),
        })
    }

    async fn bulk_cancel(&self, staging_id: &str) -> Result<(), DocflowError> {
        self.record(ApiCall::BulkCancel(staging_id.to_string()))?;
        self.lock().staging.remove(staging_id);
        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, DocflowError> {
        self.record(ApiCall::ListNotifications)?;
        Ok(self.lock().notifications.clone())
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), DocflowError> {
        self.record(ApiCall::MarkRead(id.to_string()))?;
        let mut state = self.lock();
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Self::not_found("notification", id))?;
        notification.is_read = true;
        Ok(())
    }

    async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, DocflowError> {
        self.record(ApiCall::FetchAsset(path.to_string()))?;
        self.lock()
            .assets
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found("asset", path))
    }
}
