pub mod local_fs;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::formats::{DocumentRecord, Group, HistoryRecord};

pub use local_fs::LocalFsStore;
pub use memory::MemoryStore;

/// Storage for groups, documents and reading history.
///
/// Deleting a document removes its history; deleting a group removes its
/// documents. `upsert_history` replaces the previous record wholesale.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_group(&self, name: &str) -> anyhow::Result<Uuid>;
    async fn get_group(&self, id: Uuid) -> anyhow::Result<Option<Group>>;
    async fn list_groups(&self) -> anyhow::Result<Vec<Group>>;
    async fn delete_group(&self, id: Uuid) -> anyhow::Result<()>;

    async fn add_document(&self, doc: &DocumentRecord) -> anyhow::Result<()>;
    async fn get_document(&self, id: Uuid) -> anyhow::Result<Option<DocumentRecord>>;
    async fn list_documents_by_group(&self, group_id: Uuid)
    -> anyhow::Result<Vec<DocumentRecord>>;
    async fn delete_document(&self, id: Uuid) -> anyhow::Result<()>;

    async fn get_history(&self, document_id: Uuid) -> anyhow::Result<Option<HistoryRecord>>;
    async fn upsert_history(&self, record: &HistoryRecord) -> anyhow::Result<()>;
}

/// Unsplit documents first, then chunks by sequence index.
pub(crate) fn sort_documents(docs: &mut [DocumentRecord]) {
    docs.sort_by(|a, b| {
        a.sequence_index
            .cmp(&b.sequence_index)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

pub(crate) fn sort_groups(groups: &mut [Group]) {
    groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
