use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::formats::{DocumentRecord, Group, HistoryRecord};
use crate::store::{DocumentStore, sort_documents, sort_groups};

#[derive(Debug, Default)]
struct State {
    groups: HashMap<Uuid, Group>,
    documents: HashMap<Uuid, DocumentRecord>,
    history: HashMap<Uuid, HistoryRecord>,
}

/// Process-local store. Used by tests and for one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn history_len(&self) -> usize {
        self.state.read().await.history.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_group(&self, name: &str) -> anyhow::Result<Uuid> {
        let group = Group {
            id: Uuid::new_v4(),
            display_name: name.to_owned(),
            created_at: Utc::now(),
        };
        let id = group.id;
        self.state.write().await.groups.insert(id, group);
        Ok(id)
    }

    async fn get_group(&self, id: Uuid) -> anyhow::Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        let mut groups = self
            .state
            .read()
            .await
            .groups
            .values()
            .cloned()
            .collect::<Vec<_>>();
        sort_groups(&mut groups);
        Ok(groups)
    }

    async fn delete_group(&self, id: Uuid) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        let doc_ids = state
            .documents
            .values()
            .filter(|d| d.group_id == id)
            .map(|d| d.id)
            .collect::<Vec<_>>();
        for doc_id in doc_ids {
            state.documents.remove(&doc_id);
            state.history.remove(&doc_id);
        }
        state.groups.remove(&id);
        Ok(())
    }

    async fn add_document(&self, doc: &DocumentRecord) -> anyhow::Result<()> {
        self.state
            .write()
            .await
            .documents
            .insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> anyhow::Result<Option<DocumentRecord>> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn list_documents_by_group(
        &self,
        group_id: Uuid,
    ) -> anyhow::Result<Vec<DocumentRecord>> {
        let mut docs = self
            .state
            .read()
            .await
            .documents
            .values()
            .filter(|d| d.group_id == group_id)
            .cloned()
            .collect::<Vec<_>>();
        sort_documents(&mut docs);
        Ok(docs)
    }

    async fn delete_document(&self, id: Uuid) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        state.documents.remove(&id);
        state.history.remove(&id);
        Ok(())
    }

    async fn get_history(&self, document_id: Uuid) -> anyhow::Result<Option<HistoryRecord>> {
        Ok(self.state.read().await.history.get(&document_id).cloned())
    }

    async fn upsert_history(&self, record: &HistoryRecord) -> anyhow::Result<()> {
        self.state
            .write()
            .await
            .history
            .insert(record.document_id, record.clone());
        Ok(())
    }
}
