//! crates/fundiq_core/src/documents.rs
//!
//! The document list: the user's documents as last fetched from the store,
//! refreshed whenever an upload batch finishes.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{Document, UserContext};
use crate::ports::{DocumentStore, PortResult};
use crate::queue::{BatchObserver, BatchSummary};

/// What the list currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ListState {
    Loading,
    Loaded(Vec<Document>),
    Error(String),
}

pub struct DocumentListView {
    store: Arc<dyn DocumentStore>,
    user: UserContext,
    state: RwLock<ListState>,
}

impl DocumentListView {
    pub fn new(store: Arc<dyn DocumentStore>, user: UserContext) -> Self {
        Self {
            store,
            user,
            state: RwLock::new(ListState::Loading),
        }
    }

    pub async fn state(&self) -> ListState {
        self.state.read().await.clone()
    }

    /// Reloads the list from the store. A failure replaces the list with an error.
    pub async fn refresh(&self) -> ListState {
        let next = match self.store.list_documents(&self.user).await {
            Ok(docs) => ListState::Loaded(docs),
            Err(e) => {
                error!("Failed to load documents: {}", e);
                ListState::Error(e.detail().to_string())
            }
        };
        *self.state.write().await = next.clone();
        next
    }

    pub async fn delete(&self, document_id: Uuid) -> PortResult<ListState> {
        self.store.delete_document(document_id).await?;
        info!(%document_id, "Document deleted");
        Ok(self.refresh().await)
    }
}

#[async_trait]
impl BatchObserver for DocumentListView {
    async fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn starts_loading_then_lists_newest_first() {
        let store = Arc::new(MemoryStore::default());
        let user = UserContext::new(Uuid::new_v4());
        let first = store.seed_document(&user, "jan.csv").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.seed_document(&user, "feb.csv").await;
        store
            .seed_document(&UserContext::new(Uuid::new_v4()), "other.csv")
            .await;

        let view = DocumentListView::new(store, user);
        assert_eq!(view.state().await, ListState::Loading);

        match view.refresh().await {
            ListState::Loaded(docs) => {
                let ids: Vec<_> = docs.iter().map(|d| d.id).collect();
                assert_eq!(ids, vec![second.id, first.id]);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn store_failure_becomes_error_state() {
        let store = Arc::new(MemoryStore::default());
        store.set_unavailable(true);
        let view = DocumentListView::new(store, UserContext::new(Uuid::new_v4()));

        assert_eq!(
            view.refresh().await,
            ListState::Error("store unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn batch_completion_and_delete_refresh_the_list() {
        let store = Arc::new(MemoryStore::default());
        let user = UserContext::new(Uuid::new_v4());
        let view = DocumentListView::new(store.clone(), user);
        view.refresh().await;

        let doc = store.seed_document(&user, "mar.pdf").await;
        view.on_batch_complete(&BatchSummary { entries: vec![] })
            .await;
        assert!(matches!(view.state().await, ListState::Loaded(ref d) if d.len() == 1));

        let state = view.delete(doc.id).await.unwrap();
        assert_eq!(state, ListState::Loaded(vec![]));
    }

    #[tokio::test]
    async fn delete_removes_flagged_anomalies() {
        use crate::domain::{Anomaly, AnomalySeverity};
        use chrono::Utc;

        let store = Arc::new(MemoryStore::default());
        let user = UserContext::new(Uuid::new_v4());
        let view = DocumentListView::new(store.clone(), user);
        let doc = store.seed_document(&user, "ledger.csv").await;
        let flagged = Anomaly {
            id: Uuid::new_v4(),
            document_id: doc.id,
            row_index: Some(3),
            anomaly_type: "duplicate_transaction".to_string(),
            severity: AnomalySeverity::High,
            description: "Same amount and payee twice on one day".to_string(),
            raw_json: None,
            evidence: None,
            detected_at: Utc::now(),
        };
        store.seed_anomalies(doc.id, vec![flagged.clone()]).await;

        let listed = store.get_document(doc.id).await.unwrap();
        assert_eq!(listed.anomalies_count, 1);
        assert_eq!(store.list_anomalies(doc.id).await.unwrap(), vec![flagged]);

        view.delete(doc.id).await.unwrap();
        assert!(store.list_anomalies(doc.id).await.unwrap().is_empty());
    }
}
