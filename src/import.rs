use std::path::Path;

use anyhow::Context as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunk::{SplitPolicy, chunk_title, split_document};
use crate::formats::DocumentRecord;
use crate::patterns::HeadingRules;
use crate::store::DocumentStore;

const DERIVED_NAME_CHARS: usize = 40;
const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub raw_text: String,
    /// Explicit display name; wins over everything else.
    pub name: Option<String>,
    /// Originating file, if the text was not pasted.
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub rules: HeadingRules,
    pub policy: SplitPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedDocument {
    pub id: Uuid,
    pub title: String,
    pub sequence_index: Option<usize>,
    pub chapters: usize,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub group_id: Uuid,
    pub display_name: String,
    pub documents: Vec<ImportedDocument>,
}

pub async fn import_text(
    store: &dyn DocumentStore,
    request: ImportRequest,
    options: &ImportOptions,
) -> anyhow::Result<ImportOutcome> {
    let display_name = display_name(&request);
    let parts = split_document(&request.raw_text, &options.rules, options.policy);

    let group_id = store
        .create_group(&display_name)
        .await
        .context("create group")?;

    let created_at = Utc::now();
    let mut documents = Vec::with_capacity(parts.len());
    for part in parts {
        let title = match part.chunk.sequence_index {
            Some(seq) => chunk_title(&display_name, seq),
            None => display_name.clone(),
        };
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            group_id,
            sequence_index: part.chunk.sequence_index,
            total_chunks: part.chunk.total_chunks,
            size_bytes: part.chunk.raw_content.len() as u64,
            raw_content: part.chunk.raw_content,
            rendered_content: part.segmented.rendered_content,
            chapters: part.segmented.chapters,
            extracted_title: title,
            created_at,
        };
        store
            .add_document(&record)
            .await
            .with_context(|| format!("store document: {}", record.extracted_title))?;

        documents.push(ImportedDocument {
            id: record.id,
            title: record.extracted_title,
            sequence_index: record.sequence_index,
            chapters: record.chapters.len(),
            size_bytes: record.size_bytes,
        });
    }

    tracing::info!(
        %group_id,
        name = %display_name,
        documents = documents.len(),
        "imported text"
    );

    Ok(ImportOutcome {
        group_id,
        display_name,
        documents,
    })
}

pub async fn import_file(
    store: &dyn DocumentStore,
    path: &Path,
    name: Option<String>,
    options: &ImportOptions,
) -> anyhow::Result<ImportOutcome> {
    let raw_text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read text file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    import_text(
        store,
        ImportRequest {
            raw_text,
            name,
            file_name,
        },
        options,
    )
    .await
}

/// Explicit name, file stem, first non-empty line, then `Untitled`.
pub fn display_name(request: &ImportRequest) -> String {
    if let Some(name) = request.name.as_deref().map(str::trim)
        && !name.is_empty()
    {
        return name.to_owned();
    }

    if let Some(file_name) = request.file_name.as_deref() {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().trim().to_owned())
            .unwrap_or_default();
        if !stem.is_empty() {
            return stem;
        }
    }

    request
        .raw_text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(DERIVED_NAME_CHARS).collect())
        .unwrap_or_else(|| UNTITLED.to_owned())
}
