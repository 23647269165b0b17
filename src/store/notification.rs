//! In-app notifications (fetched over REST).

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::{DocumentApi, Notification};
use crate::error::DocflowError;

#[derive(Debug, Clone, Default)]
pub struct NotificationState {
    pub notifications: Vec<Notification>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct NotificationStore {
    api: Arc<dyn DocumentApi>,
    state: RwLock<NotificationState>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            state: RwLock::new(NotificationState::default()),
        }
    }

    pub async fn snapshot(&self) -> NotificationState {
        self.state.read().await.clone()
    }

    async fn fail<T>(&self, err: DocflowError) -> Result<T, DocflowError> {
        tracing::warn!("[store] notification: {}", err);
        let mut state = self.state.write().await;
        state.error = Some(err.to_string());
        state.loading = false;
        Err(err)
    }

    pub async fn fetch(&self) -> Result<(), DocflowError> {
        self.state.write().await.loading = true;
        match self.api.list_notifications().await {
            Ok(notifications) => {
                let mut state = self.state.write().await;
                state.notifications = notifications;
                state.loading = false;
                state.error = None;
                Ok(())
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Mark one notification read; the local copy changes after the backend
    /// accepted it.
    pub async fn mark_read(&self, id: &str) -> Result<(), DocflowError> {
        if let Err(e) = self.api.mark_notification_read(id).await {
            return self.fail(e).await;
        }
        let mut state = self.state.write().await;
        if let Some(n) = state.notifications.iter_mut().find(|n| n.id == id) {
            n.is_read = true;
        }
        Ok(())
    }

    pub async fn unread_count(&self) -> usize {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| !n.is_read)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;

    fn notification(id: &str) -> Notification {
        Notification {
            id: id.into(),
            title: "서명 요청".into(),
            message: "문서에 서명해 주세요".into(),
            document_id: Some("doc".into()),
            is_read: false,
            created_at: None,
        }
    }

    fn setup() -> (Arc<MockApi>, NotificationStore) {
        let api = Arc::new(MockApi::new());
        api.insert_notification(notification("n1"));
        api.insert_notification(notification("n2"));
        let dyn_api: Arc<dyn DocumentApi> = api.clone();
        (api, NotificationStore::new(dyn_api))
    }

    #[tokio::test]
    async fn test_mark_read_updates_count() {
        let (_, store) = setup();
        store.fetch().await.unwrap();
        assert_eq!(store.unread_count().await, 2);
        store.mark_read("n1").await.unwrap();
        assert_eq!(store.unread_count().await, 1);
    }

    #[tokio::test]
    async fn test_mark_read_failure_leaves_local_state() {
        let (api, store) = setup();
        store.fetch().await.unwrap();
        api.fail_next(500, "boom");
        assert!(store.mark_read("n1").await.is_err());
        assert_eq!(store.unread_count().await, 2);
        assert!(store.snapshot().await.error.unwrap().contains("boom"));
    }
}
