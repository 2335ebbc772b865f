//! Splitting oversized documents into independently stored chunks.
//!
//! With the chapter-count policy, text before the first detected boundary
//! belongs to no chunk once a split happens. Unsplit documents keep it.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::formats::Boundary;
use crate::patterns::HeadingRules;
use crate::segment::{Segmented, segment, split_lines};

pub const DEFAULT_MAX_CHAPTERS_PER_CHUNK: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "limit")]
pub enum SplitPolicy {
    /// Split every `k` detected chapters.
    ChapterCount(usize),
    /// Split every `n` lines, ignoring headings.
    LineCount(usize),
}

impl Default for SplitPolicy {
    fn default() -> Self {
        SplitPolicy::ChapterCount(DEFAULT_MAX_CHAPTERS_PER_CHUNK)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based; `None` when the document was not split.
    pub sequence_index: Option<usize>,
    pub total_chunks: Option<usize>,
    /// Line range in the source, end exclusive.
    pub line_range: Range<usize>,
    pub raw_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedChunk {
    pub chunk: Chunk,
    pub segmented: Segmented,
}

/// Heading lines only, without building markup.
pub fn detect_boundaries(raw_text: &str, rules: &HeadingRules) -> Vec<Boundary> {
    split_lines(raw_text)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() || !rules.is_heading(trimmed) {
                return None;
            }
            Some(Boundary {
                line_index: idx,
                title: trimmed.to_owned(),
            })
        })
        .collect()
}

/// Groups every `max_chapters_per_chunk` boundaries into one chunk. Boundary
/// order and duplicates do not matter; only their distinct line indices do.
pub fn chunk(raw_text: &str, boundaries: &[Boundary], max_chapters_per_chunk: usize) -> Vec<Chunk> {
    let max_chapters_per_chunk = max_chapters_per_chunk.max(1);
    let lines = split_lines(raw_text);

    let mut starts = boundaries
        .iter()
        .map(|b| b.line_index.min(lines.len()))
        .collect::<Vec<_>>();
    starts.sort_unstable();
    starts.dedup();
    if starts.len() <= max_chapters_per_chunk {
        return vec![whole(raw_text)];
    }

    let groups = starts.chunks(max_chapters_per_chunk).collect::<Vec<_>>();
    let total = groups.len();

    let mut chunks = Vec::with_capacity(total);
    for (idx, group) in groups.iter().enumerate() {
        let start = group[0];
        let end = groups
            .get(idx + 1)
            .map(|next| next[0])
            .unwrap_or(lines.len());
        chunks.push(slice(&lines, start..end, idx + 1, total));
    }
    chunks
}

pub fn chunk_by_lines(raw_text: &str, max_lines: usize) -> Vec<Chunk> {
    let max_lines = max_lines.max(1);
    let lines = split_lines(raw_text);
    if lines.len() <= max_lines {
        return vec![whole(raw_text)];
    }

    let total = lines.len().div_ceil(max_lines);
    (0..total)
        .map(|idx| {
            let start = idx * max_lines;
            let end = (start + max_lines).min(lines.len());
            slice(&lines, start..end, idx + 1, total)
        })
        .collect()
}

/// Boundaries, then chunks, then a fresh segmentation of every chunk.
/// Chapter ordinals restart at 1 in each chunk.
pub fn split_document(
    raw_text: &str,
    rules: &HeadingRules,
    policy: SplitPolicy,
) -> Vec<SegmentedChunk> {
    let chunks = match policy {
        SplitPolicy::ChapterCount(max) => {
            let boundaries = detect_boundaries(raw_text, rules);
            chunk(raw_text, &boundaries, max)
        }
        SplitPolicy::LineCount(max) => chunk_by_lines(raw_text, max),
    };

    chunks
        .into_iter()
        .map(|chunk| {
            let segmented = segment(&chunk.raw_content, rules);
            SegmentedChunk { chunk, segmented }
        })
        .collect()
}

pub fn chunk_title(base: &str, sequence_index: usize) -> String {
    format!("{base}_{sequence_index:03}")
}

fn whole(raw_text: &str) -> Chunk {
    Chunk {
        sequence_index: None,
        total_chunks: None,
        line_range: 0..split_lines(raw_text).len(),
        raw_content: raw_text.to_owned(),
    }
}

fn slice(lines: &[&str], range: Range<usize>, sequence_index: usize, total: usize) -> Chunk {
    Chunk {
        sequence_index: Some(sequence_index),
        total_chunks: Some(total),
        raw_content: lines[range.clone()].join("\n"),
        line_range: range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(chapters: usize, front_matter: &str) -> String {
        let mut text = String::from(front_matter);
        for n in 1..=chapters {
            text.push_str(&format!("Chapter {n}\nline a of {n}\nline b of {n}\n"));
        }
        text
    }

    #[test]
    fn boundaries_match_segmenter_headings() {
        let text = "\nChapter 1\nbody\n第二章 风\nbody";
        let rules = HeadingRules::standard();
        let boundaries = detect_boundaries(text, &rules);
        let segmented = segment(text, &rules);

        assert_eq!(boundaries.len(), segmented.chapters.len());
        for (boundary, chapter) in boundaries.iter().zip(&segmented.chapters) {
            assert_eq!(boundary.title, chapter.title);
            assert_eq!(boundary.line_index, chapter.source_line_index);
        }
    }

    #[test]
    fn small_documents_are_not_split() {
        let text = book(3, "Preface\n");
        let boundaries = detect_boundaries(&text, &HeadingRules::standard());
        let chunks = chunk(&text, &boundaries, 3);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence_index, None);
        assert_eq!(chunks[0].total_chunks, None);
        assert_eq!(chunks[0].raw_content, text);
    }

    #[test]
    fn one_hundred_twenty_chapters_split_into_three() {
        let text = book(120, "");
        let boundaries = detect_boundaries(&text, &HeadingRules::standard());
        assert_eq!(boundaries.len(), 120);

        let chunks = chunk(&text, &boundaries, 50);
        assert_eq!(chunks.len(), 3);
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, Some(idx + 1));
            assert_eq!(chunk.total_chunks, Some(3));
        }
        assert!(chunks[2].raw_content.starts_with("Chapter 101\n"));
    }

    #[test]
    fn split_ranges_cover_first_boundary_to_eof_without_gaps() {
        let text = book(7, "Title page\nCopyright\n");
        let lines = split_lines(&text);
        let boundaries = detect_boundaries(&text, &HeadingRules::standard());
        let chunks = chunk(&text, &boundaries, 3);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].line_range.start, boundaries[0].line_index);
        assert_eq!(chunks.last().map(|c| c.line_range.end), Some(lines.len()));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].line_range.end, pair[1].line_range.start);
        }

        let rejoined = chunks
            .iter()
            .map(|c| c.raw_content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(rejoined, lines[boundaries[0].line_index..].join("\n"));
    }

    #[test]
    fn front_matter_is_dropped_when_splitting() {
        let text = book(4, "Title page\n");
        let boundaries = detect_boundaries(&text, &HeadingRules::standard());
        let chunks = chunk(&text, &boundaries, 2);
        assert!(chunks.iter().all(|c| !c.raw_content.contains("Title page")));
    }

    #[test]
    fn zero_boundaries_never_split() {
        let chunks = chunk("just\nsome\ntext", &[], 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence_index, None);
    }

    #[test]
    fn split_document_restarts_ordinals_per_chunk() {
        let text = book(5, "");
        let parts = split_document(&text, &HeadingRules::standard(), SplitPolicy::ChapterCount(2));

        assert_eq!(parts.len(), 3);
        let first_titles = parts
            .iter()
            .map(|p| p.segmented.chapters[0].title.clone())
            .collect::<Vec<_>>();
        assert_eq!(first_titles, vec!["Chapter 1", "Chapter 3", "Chapter 5"]);
        for part in &parts {
            assert_eq!(part.segmented.chapters[0].ordinal, 1);
            assert_eq!(part.segmented.chapters[0].anchor_id, "chapter-1");
        }
    }

    #[test]
    fn line_policy_keeps_every_line() {
        let text = "a\nb\nc\nd\ne";
        let chunks = chunk_by_lines(text, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].raw_content, "a\nb");
        assert_eq!(chunks[2].raw_content, "e");
        assert_eq!(chunks[2].total_chunks, Some(3));
    }

    #[test]
    fn unordered_and_repeated_boundaries_are_normalized() {
        let text = "a\nb\nc\nd\ne\nf";
        let boundary = |line_index: usize, title: &str| Boundary {
            line_index,
            title: title.to_owned(),
        };

        let chunks = chunk(text, &[boundary(4, "x"), boundary(1, "y")], 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].line_range, 1..4);
        assert_eq!(chunks[0].raw_content, "b\nc\nd");
        assert_eq!(chunks[1].line_range, 4..6);

        let repeated = [boundary(2, "x"), boundary(2, "x"), boundary(99, "past end")];
        let chunks = chunk(text, &repeated, 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].raw_content, "c\nd\ne\nf");
        assert_eq!(chunks[1].line_range, 6..6);
        assert_eq!(chunks[1].raw_content, "");

        assert_eq!(chunk(text, &repeated[..2], 1).len(), 1);
    }

    #[test]
    fn zero_limits_are_clamped() {
        let text = book(2, "");
        let boundaries = detect_boundaries(&text, &HeadingRules::standard());
        assert_eq!(chunk(&text, &boundaries, 0).len(), 2);
    }

    #[test]
    fn chunk_titles_are_zero_padded() {
        assert_eq!(chunk_title("War and Peace", 7), "War and Peace_007");
        assert_eq!(chunk_title("Book", 120), "Book_120");
    }
}
