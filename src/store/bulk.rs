//! Review of a bulk-creation staging set before commit.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::{BulkCommitResult, BulkStagingItem, DocumentApi, StagingStatus};
use crate::error::DocflowError;

#[derive(Debug, Clone, Default)]
pub struct BulkStagingState {
    pub staging_id: Option<String>,
    pub items: Vec<BulkStagingItem>,
    pub result: Option<BulkCommitResult>,
    pub loading: bool,
    pub error: Option<String>,
}

impl BulkStagingState {
    pub fn invalid_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == StagingStatus::Invalid)
            .count()
    }
}

pub struct BulkStagingStore {
    api: Arc<dyn DocumentApi>,
    state: RwLock<BulkStagingState>,
}

impl BulkStagingStore {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            state: RwLock::new(BulkStagingState::default()),
        }
    }

    pub async fn snapshot(&self) -> BulkStagingState {
        self.state.read().await.clone()
    }

    async fn fail<T>(&self, err: DocflowError) -> Result<T, DocflowError> {
        tracing::warn!("[store] bulk: {}", err);
        let mut state = self.state.write().await;
        state.error = Some(err.to_string());
        state.loading = false;
        Err(err)
    }

    pub async fn load_items(&self, staging_id: &str) -> Result<(), DocflowError> {
        self.state.write().await.loading = true;
        match self.api.bulk_staging_items(staging_id).await {
            Ok(items) => {
                let mut state = self.state.write().await;
                state.staging_id = Some(staging_id.to_string());
                state.items = items;
                state.result = None;
                state.loading = false;
                state.error = None;
                Ok(())
            }
            Err(e) => self.fail(e).await,
        }
    }

    fn loaded_id(state: &BulkStagingState) -> Result<String, DocflowError> {
        state
            .staging_id
            .clone()
            .ok_or_else(|| DocflowError::NotFound("no staging set loaded".to_string()))
    }

    /// Create the documents of the loaded staging set.
    ///
    /// Refused while any row is invalid.
    pub async fn commit(&self) -> Result<BulkCommitResult, DocflowError> {
        let (staging_id, invalid) = {
            let state = self.state.read().await;
            (Self::loaded_id(&state), state.invalid_count())
        };
        let staging_id = match staging_id {
            Ok(id) => id,
            Err(e) => return self.fail(e).await,
        };
        if invalid > 0 {
            return self
                .fail(DocflowError::Workflow(format!(
                    "{} invalid rows in staging set {}",
                    invalid, staging_id
                )))
                .await;
        }

        match self.api.bulk_commit(&staging_id).await {
            Ok(result) => {
                tracing::info!("[store] bulk {}: {} documents created", staging_id, result.created_count);
                let mut state = self.state.write().await;
                for item in &mut state.items {
                    item.status = StagingStatus::Committed;
                }
                state.result = Some(result.clone());
                state.error = None;
                Ok(result)
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Discard the loaded staging set.
    pub async fn cancel(&self) -> Result<(), DocflowError> {
        let loaded = Self::loaded_id(&*self.state.read().await);
        let staging_id = match loaded {
            Ok(id) => id,
            Err(e) => return self.fail(e).await,
        };
        if let Err(e) = self.api.bulk_cancel(&staging_id).await {
            return self.fail(e).await;
        }
        *self.state.write().await = BulkStagingState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{ApiCall, MockApi};

    fn item(id: &str, status: StagingStatus) -> BulkStagingItem {
        BulkStagingItem {
            id: id.into(),
            row_index: 0,
            title: format!("row {}", id),
            status,
            error_message: None,
            data: Default::default(),
        }
    }

    fn setup(items: Vec<BulkStagingItem>) -> (Arc<MockApi>, BulkStagingStore) {
        let api = Arc::new(MockApi::new());
        api.insert_staging("stg", items);
        let dyn_api: Arc<dyn DocumentApi> = api.clone();
        (api, BulkStagingStore::new(dyn_api))
    }

    #[tokio::test]
    async fn test_commit_valid_set() {
        let (_, store) = setup(vec![item("1", StagingStatus::Valid), item("2", StagingStatus::Valid)]);
        store.load_items("stg").await.unwrap();
        let result = store.commit().await.unwrap();
        assert_eq!(result.created_count, 2);

        let snapshot = store.snapshot().await;
        assert!(snapshot.items.iter().all(|i| i.status == StagingStatus::Committed));
        assert_eq!(snapshot.result, Some(result));
    }

    #[tokio::test]
    async fn test_commit_refused_with_invalid_rows() {
        let (api, store) = setup(vec![item("1", StagingStatus::Valid), item("2", StagingStatus::Invalid)]);
        store.load_items("stg").await.unwrap();
        assert!(matches!(store.commit().await, Err(DocflowError::Workflow(_))));
        assert!(!api.calls().contains(&ApiCall::BulkCommit("stg".into())));
    }

    #[tokio::test]
    async fn test_commit_without_loaded_set() {
        let (_, store) = setup(vec![]);
        assert!(matches!(store.commit().await, Err(DocflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_resets_state() {
        let (api, store) = setup(vec![item("1", StagingStatus::Valid)]);
        store.load_items("stg").await.unwrap();
        store.cancel().await.unwrap();
        assert!(store.snapshot().await.staging_id.is_none());
        assert!(api.calls().contains(&ApiCall::BulkCancel("stg".into())));
    }
}
