//! Document list and the open document being edited.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::autosave::{AutosaveHandle, SaveStatus};
use crate::api::{ActionPayload, DocumentApi, FieldValueUpdate, load_document};
use crate::config::ClientConfig;
use crate::document::{Document, WorkflowAction};
use crate::error::DocflowError;
use crate::field::TableValue;
use crate::layout::TableGeometry;

/// Snapshot of a [`DocumentStore`].
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    pub documents: Vec<Document>,
    /// Id requested by the last `open`; responses for other ids are stale.
    pub active_id: Option<String>,
    pub active: Option<Document>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Client-side state for the document routes.
pub struct DocumentStore {
    api: Arc<dyn DocumentApi>,
    state: RwLock<DocumentState>,
    autosave: RwLock<Option<AutosaveHandle>>,
    debounce: Duration,
    viewer_email: Option<String>,
}

impl DocumentStore {
    pub fn new(api: Arc<dyn DocumentApi>, debounce: Duration) -> Self {
        Self {
            api,
            state: RwLock::new(DocumentState::default()),
            autosave: RwLock::new(None),
            debounce,
            viewer_email: None,
        }
    }

    /// Store using the configured autosave window and viewer.
    pub fn from_config(api: Arc<dyn DocumentApi>, config: &ClientConfig) -> Self {
        let store = Self::new(api, config.autosave_debounce());
        match &config.viewer_email {
            Some(email) => store.with_viewer(email.clone()),
            None => store,
        }
    }

    /// Act on behalf of `email` (role guards, signing).
    pub fn with_viewer(mut self, email: impl Into<String>) -> Self {
        self.viewer_email = Some(email.into());
        self
    }

    pub async fn snapshot(&self) -> DocumentState {
        self.state.read().await.clone()
    }

    pub async fn active(&self) -> Option<Document> {
        self.state.read().await.active.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn save_status(&self) -> Option<SaveStatus> {
        self.autosave.read().await.as_ref().map(|h| h.status())
    }

    async fn fail<T>(&self, err: DocflowError) -> Result<T, DocflowError> {
        tracing::warn!("[store] document: {}", err);
        let mut state = self.state.write().await;
        state.error = Some(err.to_string());
        state.loading = false;
        Err(err)
    }

    pub async fn fetch_documents(&self) -> Result<(), DocflowError> {
        self.state.write().await.loading = true;
        match self.api.list_documents().await {
            Ok(documents) => {
                let mut state = self.state.write().await;
                state.documents = documents;
                state.loading = false;
                state.error = None;
                Ok(())
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Load a document (with its template) and make it the active one.
    ///
    /// Pending edits of the previous document are saved first; if that save
    /// fails the previous document stays open and the error is returned.
    /// A response that arrives after another `open` was issued is dropped.
    pub async fn open(&self, id: &str) -> Result<(), DocflowError> {
        self.close_autosave().await?;
        {
            let mut state = self.state.write().await;
            state.active_id = Some(id.to_string());
            state.active = None;
            state.loading = true;
        }

        let result = load_document(self.api.as_ref(), id).await;

        let mut state = self.state.write().await;
        if state.active_id.as_deref() != Some(id) {
            tracing::debug!("[store] discarding stale response for document {}", id);
            return Ok(());
        }
        state.loading = false;
        match result {
            Ok(doc) => {
                state.active = Some(doc);
                state.error = None;
                drop(state);
                let handle = AutosaveHandle::spawn(self.api.clone(), id, self.debounce);
                *self.autosave.write().await = Some(handle);
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.fail(e).await
            }
        }
    }

    /// Apply `f` to the active document; the change is kept only on success.
    async fn mutate_active<F>(&self, f: F) -> Result<Document, DocflowError>
    where
        F: FnOnce(&mut Document) -> Result<(), DocflowError>,
    {
        let outcome = {
            let mut state = self.state.write().await;
            match state.active.as_mut() {
                None => Err(DocflowError::NotFound("no open document".to_string())),
                Some(doc) => {
                    let mut updated = doc.clone();
                    f(&mut updated).map(|_| {
                        *doc = updated.clone();
                        updated
                    })
                }
            }
        };
        match outcome {
            Ok(doc) => Ok(doc),
            Err(e) => self.fail(e).await,
        }
    }

    /// Saver of the active document; edits without one would never reach
    /// the backend.
    async fn saver(&self) -> Result<AutosaveHandle, DocflowError> {
        let handle = self.autosave.read().await.clone();
        let active_id = self.state.read().await.active.as_ref().map(|d| d.id.clone());
        match (handle, active_id) {
            (Some(handle), Some(id)) if handle.document_id() == id => Ok(handle),
            _ => self.fail(DocflowError::NotFound("no open document".to_string())).await,
        }
    }

    /// Optimistically set a field value and schedule a debounced save.
    pub async fn edit_field(&self, field_id: &str, value: &str) -> Result<(), DocflowError> {
        let saver = self.saver().await?;
        let doc = self
            .mutate_active(|doc| doc.set_field_value(field_id, value))
            .await?;
        saver.schedule(doc.data);
        Ok(())
    }

    /// Set a field value and write it at once through the single-field
    /// endpoint, bypassing the debounce.
    ///
    /// Pending edits are saved first so no later full save carries an older
    /// value. If the write fails the value is handed to the saver instead.
    pub async fn commit_field(&self, field_id: &str, value: &str) -> Result<(), DocflowError> {
        let saver = self.saver().await?;
        self.save_now().await?;
        let doc = self
            .mutate_active(|doc| doc.set_field_value(field_id, value))
            .await?;

        let update = FieldValueUpdate {
            field_id: field_id.to_string(),
            value: value.to_string(),
        };
        if let Err(e) = self.api.upsert_field_value(&doc.id, &update).await {
            saver.schedule(doc.data);
            return self.fail(e).await;
        }
        Ok(())
    }

    /// Set one table cell, re-encoding the field's table value.
    pub async fn edit_cell(&self, field_id: &str, row: usize, col: usize, text: &str) -> Result<(), DocflowError> {
        let saver = self.saver().await?;
        let doc = self
            .mutate_active(|doc| {
                let merged = doc.merged_fields();
                let entry = merged
                    .get(field_id)
                    .ok_or_else(|| DocflowError::NotFound(format!("field {}", field_id)))?;

                let mut table = TableValue::parse(entry.field.value_str())
                    .or_else(|| entry.template.as_ref().and_then(|t| TableValue::parse(t.value_str())))
                    .or_else(|| {
                        TableGeometry::resolve(&entry.field, None).map(|g| TableValue::new(g.rows, g.cols))
                    })
                    .ok_or_else(|| DocflowError::NotFound(format!("table field {}", field_id)))?;
                if row >= table.rows || col >= table.cols {
                    return Err(DocflowError::NotFound(format!(
                        "cell ({}, {}) of {}x{} table {}",
                        row, col, table.rows, table.cols, field_id
                    )));
                }
                table.set_cell(row, col, text);
                doc.set_field_value(field_id, table.encode())
            })
            .await?;
        saver.schedule(doc.data);
        Ok(())
    }

    /// Save pending edits now.
    pub async fn save_now(&self) -> Result<(), DocflowError> {
        let handle = self.autosave.read().await.clone();
        match handle {
            Some(handle) => match handle.flush().await {
                Ok(()) => Ok(()),
                Err(e) => self.fail(e).await,
            },
            None => Ok(()),
        }
    }

    /// Run a workflow action on the active document.
    ///
    /// Pending edits are saved first so the backend sees the final values.
    pub async fn apply_action(&self, action: WorkflowAction, payload: ActionPayload) -> Result<(), DocflowError> {
        let Some(doc) = self.active().await else {
            return self
                .fail(DocflowError::NotFound("no open document".to_string()))
                .await;
        };

        if !doc.can_apply(action) {
            return self
                .fail(DocflowError::Workflow(format!(
                    "cannot {} a document in status {}",
                    action.slug(),
                    doc.status
                )))
                .await;
        }
        if let Some(email) = &self.viewer_email
            && let Err(e) = doc.require_role(email, &[action.required_role(doc.status)])
        {
            return self.fail(e).await;
        }

        self.save_now().await?;

        let updated = match self.api.workflow_action(&doc.id, action, &payload).await {
            Ok(updated) => updated,
            Err(e) => return self.fail(e).await,
        };
        tracing::info!("[store] document {}: {} -> {}", doc.id, doc.status, updated.status);

        let mut state = self.state.write().await;
        if let Some(active) = state.active.as_mut().filter(|a| a.id == updated.id) {
            active.status = updated.status;
            active.tasks = updated.tasks.clone();
            active.updated_at = updated.updated_at;
        }
        if let Some(listed) = state.documents.iter_mut().find(|d| d.id == updated.id) {
            listed.status = updated.status;
        }
        state.error = None;
        Ok(())
    }

    /// Sign a field of the active document as the viewer and save at once.
    pub async fn sign(&self, field_id: &str, data_uri: &str) -> Result<(), DocflowError> {
        let Some(email) = self.viewer_email.clone() else {
            return self
                .fail(DocflowError::PermissionDenied("no viewer to sign as".to_string()))
                .await;
        };
        let saver = self.saver().await?;
        let doc = self
            .mutate_active(|doc| doc.sign_field(field_id, data_uri, &email))
            .await?;
        saver.schedule(doc.data);
        self.save_now().await
    }

    /// Save pending edits and drop the active document.
    ///
    /// If the final save fails the document stays open with its edit pending.
    pub async fn close(&self) -> Result<(), DocflowError> {
        self.close_autosave().await?;
        let mut state = self.state.write().await;
        state.active = None;
        state.active_id = None;
        Ok(())
    }

    /// Stop the saver after its final save; on failure it stays in place.
    async fn close_autosave(&self) -> Result<(), DocflowError> {
        let handle = self.autosave.read().await.clone();
        let Some(handle) = handle else {
            return Ok(());
        };
        if let Err(e) = handle.shutdown().await {
            tracing::warn!("[store] final save of {} failed: {}", handle.document_id(), e);
            return self.fail(e).await;
        }
        let mut slot = self.autosave.write().await;
        if slot.as_ref().is_some_and(|h| h.document_id() == handle.document_id()) {
            *slot = None;
        }
        Ok(())
    }
}
