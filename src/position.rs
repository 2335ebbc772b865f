//! Reading-position restore and capture.
//!
//! Everything here is pure: callers pass the document, the stored history
//! and the clock, and apply the returned values themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::formats::{Chapter, ChapterRef, HistoryRecord, TocEntry};

pub const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialPosition {
    pub scroll_target: Option<f64>,
    pub chapter_target: Option<ChapterRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub scroll_offset: f64,
    pub chapter_title: Option<String>,
}

impl HistorySnapshot {
    /// Full replacement record for the store. `elapsed_secs` is added to
    /// whatever total the previous record carried.
    pub fn into_record(
        self,
        document_id: Uuid,
        previous: Option<&HistoryRecord>,
        elapsed_secs: f64,
        now: DateTime<Utc>,
    ) -> HistoryRecord {
        let carried = previous.map(|h| h.total_time_read).unwrap_or(0.0);
        HistoryRecord {
            document_id,
            last_chapter_title: self.chapter_title,
            last_scroll_position: self.scroll_offset,
            last_read_at: now,
            total_time_read: carried + elapsed_secs.max(0.0),
        }
    }
}

/// Scroll and chapter are restored independently. A missing or unmatched
/// chapter title falls back to the first chapter.
pub fn compute_initial_position(
    chapters: &[Chapter],
    history: Option<&HistoryRecord>,
) -> InitialPosition {
    let first = chapters.first().map(Chapter::to_ref);
    let Some(history) = history else {
        return InitialPosition {
            scroll_target: None,
            chapter_target: first,
        };
    };

    let scroll_target = Some(history.last_scroll_position)
        .filter(|offset| offset.is_finite() && *offset >= 0.0);

    let matched = history
        .last_chapter_title
        .as_deref()
        .and_then(|title| find_chapter_by_title(chapters, title));

    InitialPosition {
        scroll_target,
        chapter_target: matched.map(Chapter::to_ref).or(first),
    }
}

pub fn capture_current_position(
    current_scroll_offset: f64,
    current_chapter: Option<&ChapterRef>,
) -> HistorySnapshot {
    let scroll_offset = if current_scroll_offset.is_finite() {
        current_scroll_offset.max(0.0)
    } else {
        0.0
    };
    HistorySnapshot {
        scroll_offset,
        chapter_title: current_chapter.map(|c| c.title.clone()),
    }
}

/// Exact title first, then the first chapter whose title contains the saved
/// one or is contained in it.
pub fn find_chapter_by_title<'a>(chapters: &'a [Chapter], saved: &str) -> Option<&'a Chapter> {
    let saved = saved.trim();
    if saved.is_empty() {
        return None;
    }
    chapters.iter().find(|c| c.title == saved).or_else(|| {
        chapters.iter().find(|c| {
            !c.title.is_empty() && (c.title.contains(saved) || saved.contains(c.title.as_str()))
        })
    })
}

/// `anchor_offsets[i]` is the measured top of chapter `i`'s anchor. The
/// current chapter is the last one whose anchor is at or above `scroll`.
pub fn chapter_at_offset(
    chapters: &[Chapter],
    anchor_offsets: &[f64],
    scroll: f64,
) -> Option<ChapterRef> {
    let current = chapters
        .iter()
        .zip(anchor_offsets)
        .take_while(|(_, offset)| **offset <= scroll)
        .last()
        .map(|(chapter, _)| chapter);
    current.or(chapters.first()).map(Chapter::to_ref)
}

pub fn next_chapter(chapters: &[Chapter], current: &ChapterRef) -> Option<ChapterRef> {
    chapters
        .iter()
        .find(|c| c.ordinal == current.ordinal + 1)
        .map(Chapter::to_ref)
}

pub fn previous_chapter(chapters: &[Chapter], current: &ChapterRef) -> Option<ChapterRef> {
    let ordinal = current.ordinal.checked_sub(1)?;
    chapters
        .iter()
        .find(|c| c.ordinal == ordinal)
        .map(Chapter::to_ref)
}

pub fn toc_entries(chapters: &[Chapter], max_chars: usize) -> Vec<TocEntry> {
    chapters
        .iter()
        .map(|c| TocEntry {
            ordinal: c.ordinal,
            display_title: truncate_title(&c.title, max_chars),
            anchor_id: c.anchor_id.clone(),
        })
        .collect()
}

pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if max_chars == 0 || title.chars().count() <= max_chars {
        return title.to_owned();
    }
    let mut out = title.chars().take(max_chars).collect::<String>();
    out.push('…');
    out
}
