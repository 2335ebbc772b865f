use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A detected heading. `anchor_id` is derived from `ordinal` only, so two
/// chapters sharing a title still get distinct anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub anchor_id: String,
    pub ordinal: usize,
    pub source_line_index: usize,
}

impl Chapter {
    pub fn new(title: impl Into<String>, ordinal: usize, source_line_index: usize) -> Self {
        Self {
            title: title.into(),
            anchor_id: anchor_id(ordinal),
            ordinal,
            source_line_index,
        }
    }

    pub fn to_ref(&self) -> ChapterRef {
        ChapterRef {
            ordinal: self.ordinal,
            title: self.title.clone(),
            anchor_id: self.anchor_id.clone(),
        }
    }
}

pub fn anchor_id(ordinal: usize) -> String {
    format!("chapter-{ordinal}")
}

/// Lightweight pointer to a chapter, used for navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub ordinal: usize,
    pub title: String,
    pub anchor_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub line_index: usize,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// One stored, independently readable unit of text.
///
/// When `sequence_index` is set, `total_chunks` is set too and
/// `1 <= sequence_index <= total_chunks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    #[serde(default = "Uuid::nil")]
    pub group_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    pub raw_content: String,
    pub rendered_content: String,
    pub chapters: Vec<Chapter>,
    pub extracted_title: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub document_id: Uuid,
    #[serde(default, alias = "chapter")]
    pub last_chapter_title: Option<String>,
    #[serde(default, alias = "scroll_position")]
    pub last_scroll_position: f64,
    #[serde(default)]
    pub last_read_at: DateTime<Utc>,
    /// Seconds.
    #[serde(default)]
    pub total_time_read: f64,
}

/// Sidebar entry. `display_title` may be truncated; the chapter's stored
/// title is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub ordinal: usize,
    pub display_title: String,
    pub anchor_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
}
