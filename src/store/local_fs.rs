use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::formats::{DocumentRecord, Group, HistoryRecord, StoreMeta};
use crate::store::{DocumentStore, sort_documents, sort_groups};

pub const SCHEMA_VERSION: u32 = 2;

/// JSON-file store:
///
/// ```text
/// <base>/meta.json
/// <base>/groups/<group id>.json
/// <base>/documents/<document id>.json
/// <base>/history/<document id>.json
/// ```
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    base_dir: PathBuf,
}

impl LocalFsStore {
    /// Opens (or initializes) a store directory, migrating older layouts to
    /// the current schema.
    pub async fn open(base_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let store = Self {
            base_dir: base_dir.into(),
        };
        for dir in [store.groups_dir(), store.documents_dir(), store.history_dir()] {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("create store dir: {}", dir.display()))?;
        }

        let meta: Option<StoreMeta> = read_json(&store.meta_path())
            .await
            .context("read store meta")?;
        let version = meta.map(|m| m.schema_version).unwrap_or(1);
        if version > SCHEMA_VERSION {
            anyhow::bail!(
                "store schema version {version} is newer than supported {SCHEMA_VERSION}: {}",
                store.base_dir.display()
            );
        }
        if version < SCHEMA_VERSION {
            store.migrate_v1().await.context("migrate store to v2")?;
        }
        if meta.map(|m| m.schema_version) != Some(SCHEMA_VERSION) {
            write_json_atomic(
                &store.meta_path(),
                &StoreMeta {
                    schema_version: SCHEMA_VERSION,
                },
            )
            .await
            .context("write store meta")?;
        }

        Ok(store)
    }

    fn meta_path(&self) -> PathBuf {
        self.base_dir.join("meta.json")
    }

    fn groups_dir(&self) -> PathBuf {
        self.base_dir.join("groups")
    }

    fn documents_dir(&self) -> PathBuf {
        self.base_dir.join("documents")
    }

    fn history_dir(&self) -> PathBuf {
        self.base_dir.join("history")
    }

    fn group_path(&self, id: Uuid) -> PathBuf {
        self.groups_dir().join(format!("{id}.json"))
    }

    fn document_path(&self, id: Uuid) -> PathBuf {
        self.documents_dir().join(format!("{id}.json"))
    }

    fn history_path(&self, document_id: Uuid) -> PathBuf {
        self.history_dir().join(format!("{document_id}.json"))
    }

    async fn put_group(&self, group: &Group) -> anyhow::Result<()> {
        write_json_atomic(&self.group_path(group.id), group)
            .await
            .context("write group")
    }

    /// v1 stored documents without a group and history under older field
    /// names. Orphaned documents each get a group named after their title.
    async fn migrate_v1(&self) -> anyhow::Result<()> {
        let mut adopted = 0usize;
        for mut doc in read_json_dir::<DocumentRecord>(&self.documents_dir()).await? {
            if !doc.group_id.is_nil() {
                continue;
            }
            let display_name = if doc.extracted_title.trim().is_empty() {
                "Untitled".to_owned()
            } else {
                doc.extracted_title.clone()
            };
            let group = Group {
                id: Uuid::new_v4(),
                display_name,
                created_at: doc.created_at,
            };
            self.put_group(&group).await?;
            doc.group_id = group.id;
            write_json_atomic(&self.document_path(doc.id), &doc)
                .await
                .context("rewrite migrated document")?;
            adopted += 1;
        }

        let mut rewritten = 0usize;
        for record in read_json_dir::<HistoryRecord>(&self.history_dir()).await? {
            write_json_atomic(&self.history_path(record.document_id), &record)
                .await
                .context("rewrite migrated history")?;
            rewritten += 1;
        }

        if adopted + rewritten > 0 {
            tracing::info!(
                base_dir = %self.base_dir.display(),
                adopted,
                rewritten,
                "migrated store to schema v{SCHEMA_VERSION}"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalFsStore {
    async fn create_group(&self, name: &str) -> anyhow::Result<Uuid> {
        let group = Group {
            id: Uuid::new_v4(),
            display_name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.put_group(&group).await?;
        Ok(group.id)
    }

    async fn get_group(&self, id: Uuid) -> anyhow::Result<Option<Group>> {
        let path = self.group_path(id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        let mut groups = read_json_dir::<Group>(&self.groups_dir()).await?;
        sort_groups(&mut groups);
        Ok(groups)
    }

    async fn delete_group(&self, id: Uuid) -> anyhow::Result<()> {
        for doc in self.list_documents_by_group(id).await? {
            self.delete_document(doc.id).await?;
        }
        remove_if_exists(&self.group_path(id)).await
    }

    async fn add_document(&self, doc: &DocumentRecord) -> anyhow::Result<()> {
        write_json_atomic(&self.document_path(doc.id), doc)
            .await
            .context("write document")
    }

    async fn get_document(&self, id: Uuid) -> anyhow::Result<Option<DocumentRecord>> {
        let path = self.document_path(id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn list_documents_by_group(
        &self,
        group_id: Uuid,
    ) -> anyhow::Result<Vec<DocumentRecord>> {
        let mut docs = read_json_dir::<DocumentRecord>(&self.documents_dir())
            .await?
            .into_iter()
            .filter(|d| d.group_id == group_id)
            .collect::<Vec<_>>();
        sort_documents(&mut docs);
        Ok(docs)
    }

    async fn delete_document(&self, id: Uuid) -> anyhow::Result<()> {
        remove_if_exists(&self.history_path(id)).await?;
        remove_if_exists(&self.document_path(id)).await
    }

    async fn get_history(&self, document_id: Uuid) -> anyhow::Result<Option<HistoryRecord>> {
        let path = self.history_path(document_id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn upsert_history(&self, record: &HistoryRecord) -> anyhow::Result<()> {
        write_json_atomic(&self.history_path(record.document_id), record)
            .await
            .context("write history")
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn read_json_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> anyhow::Result<Vec<T>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("read dir: {}", dir.display()))?;

    let mut values = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(value) = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?
        {
            values.push(value);
        }
    }
    Ok(values)
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    // Temp files must not end in `.json` or directory scans would pick them up.
    let tmp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> anyhow::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove: {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(group_id: Uuid, title: &str) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            group_id,
            sequence_index: None,
            total_chunks: None,
            raw_content: "Chapter 1\nbody".to_owned(),
            rendered_content: "<div class=\"chapter-content\">\nbody\n</div>\n".to_owned(),
            chapters: vec![crate::formats::Chapter::new("Chapter 1", 1, 0)],
            extracted_title: title.to_owned(),
            size_bytes: 14,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn documents_and_history_survive_reopen() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = LocalFsStore::open(temp.path()).await?;

        let group_id = store.create_group("Book").await?;
        let doc = document(group_id, "Book");
        store.add_document(&doc).await?;
        store
            .upsert_history(&HistoryRecord {
                document_id: doc.id,
                last_chapter_title: Some("Chapter 1".to_owned()),
                last_scroll_position: 42.0,
                last_read_at: Utc::now(),
                total_time_read: 30.0,
            })
            .await?;

        let reopened = LocalFsStore::open(temp.path()).await?;
        assert_eq!(reopened.get_document(doc.id).await?, Some(doc.clone()));
        assert_eq!(reopened.list_documents_by_group(group_id).await?.len(), 1);
        let history = reopened.get_history(doc.id).await?.expect("history");
        assert_eq!(history.last_scroll_position, 42.0);

        reopened.delete_document(doc.id).await?;
        assert!(reopened.get_history(doc.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn missing_records_read_as_none() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = LocalFsStore::open(temp.path()).await?;
        assert!(store.get_document(Uuid::new_v4()).await?.is_none());
        assert!(store.get_history(Uuid::new_v4()).await?.is_none());
        store.delete_document(Uuid::new_v4()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn v1_layout_is_migrated() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let base = temp.path();
        std::fs::create_dir_all(base.join("documents"))?;
        std::fs::create_dir_all(base.join("history"))?;

        let doc_id = Uuid::new_v4();
        let legacy_doc = serde_json::json!({
            "id": doc_id,
            "raw_content": "Chapter 1\nbody",
            "rendered_content": "",
            "chapters": [],
            "extracted_title": "Old Book",
            "size_bytes": 14,
            "created_at": "2024-01-01T00:00:00Z",
        });
        std::fs::write(
            base.join("documents").join(format!("{doc_id}.json")),
            serde_json::to_vec(&legacy_doc)?,
        )?;
        let legacy_history = serde_json::json!({
            "document_id": doc_id,
            "chapter": "Chapter 1",
            "scroll_position": 300,
            "last_read_at": "2024-01-02T00:00:00Z",
        });
        std::fs::write(
            base.join("history").join(format!("{doc_id}.json")),
            serde_json::to_vec(&legacy_history)?,
        )?;

        let store = LocalFsStore::open(base).await?;

        let groups = store.list_groups().await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].display_name, "Old Book");
        let doc = store.get_document(doc_id).await?.expect("document");
        assert_eq!(doc.group_id, groups[0].id);

        let history = store.get_history(doc_id).await?.expect("history");
        assert_eq!(history.last_chapter_title.as_deref(), Some("Chapter 1"));
        assert_eq!(history.last_scroll_position, 300.0);
        let on_disk = std::fs::read_to_string(base.join("history").join(format!("{doc_id}.json")))?;
        assert!(on_disk.contains("last_scroll_position"));

        let meta: StoreMeta = serde_json::from_slice(&std::fs::read(base.join("meta.json"))?)?;
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        Ok(())
    }

    #[tokio::test]
    async fn newer_schema_is_rejected() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        std::fs::write(
            temp.path().join("meta.json"),
            serde_json::to_vec(&StoreMeta {
                schema_version: SCHEMA_VERSION + 1,
            })?,
        )?;
        let err = LocalFsStore::open(temp.path())
            .await
            .expect_err("newer schema must fail");
        assert!(format!("{err:#}").contains("newer than supported"));
        Ok(())
    }
}
