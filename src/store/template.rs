//! Template list and per-template cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::DocumentApi;
use crate::document::Template;
use crate::error::DocflowError;
use crate::field::Field;

#[derive(Debug, Clone, Default)]
pub struct TemplateState {
    pub templates: Vec<Template>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Client-side state for the template routes.
pub struct TemplateStore {
    api: Arc<dyn DocumentApi>,
    state: RwLock<TemplateState>,
    cache: RwLock<HashMap<String, Template>>,
}

impl TemplateStore {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            state: RwLock::new(TemplateState::default()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn snapshot(&self) -> TemplateState {
        self.state.read().await.clone()
    }

    async fn fail<T>(&self, err: DocflowError) -> Result<T, DocflowError> {
        tracing::warn!("[store] template: {}", err);
        let mut state = self.state.write().await;
        state.error = Some(err.to_string());
        state.loading = false;
        Err(err)
    }

    pub async fn fetch_templates(&self) -> Result<(), DocflowError> {
        self.state.write().await.loading = true;
        match self.api.list_templates().await {
            Ok(templates) => {
                let mut state = self.state.write().await;
                state.templates = templates;
                state.loading = false;
                state.error = None;
                Ok(())
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Template by id, fetched once and served from the cache afterwards.
    pub async fn fetch_template(&self, id: &str) -> Result<Template, DocflowError> {
        if let Some(template) = self.cache.read().await.get(id) {
            return Ok(template.clone());
        }
        match self.api.get_template(id).await {
            Ok(template) => {
                self.cache
                    .write()
                    .await
                    .insert(id.to_string(), template.clone());
                Ok(template)
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Replace a template's placed fields. Every field is validated first.
    pub async fn update_fields(&self, id: &str, fields: Vec<Field>) -> Result<Template, DocflowError> {
        if let Some(err) = fields.iter().find_map(|f| f.validate().err()) {
            return self.fail(err.into()).await;
        }

        let updated = match self.api.update_template_fields(id, &fields).await {
            Ok(updated) => updated,
            Err(e) => return self.fail(e).await,
        };
        tracing::info!("[store] template {}: {} fields saved", id, fields.len());

        self.cache
            .write()
            .await
            .insert(id.to_string(), updated.clone());
        let mut state = self.state.write().await;
        if let Some(listed) = state.templates.iter_mut().find(|t| t.id == id) {
            *listed = updated.clone();
        }
        state.error = None;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), DocflowError> {
        if let Err(e) = self.api.delete_template(id).await {
            return self.fail(e).await;
        }
        self.cache.write().await.remove(id);
        let mut state = self.state.write().await;
        state.templates.retain(|t| t.id != id);
        state.error = None;
        Ok(())
    }
}
