//! Heading detection and markup rendering for plain-text documents.
//!
//! The rendered output is a flat sequence of chapter blocks. Every block
//! starts with an anchor element carrying the chapter's `anchor_id`, then a
//! heading, then a content container holding the escaped source lines with
//! their original line breaks. Scroll targeting measures the anchor, so the
//! anchor always precedes the heading.

use serde::{Deserialize, Serialize};

use crate::formats::Chapter;
use crate::patterns::HeadingRules;

pub const DEFAULT_FALLBACK_TITLE: &str = "Full text";
pub const CJK_FALLBACK_TITLE: &str = "全文";

const CONTAINER_OPEN: &str = "<div class=\"chapter-content\">\n";
const CONTAINER_CLOSE: &str = "</div>\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOptions {
    /// Title of the synthetic chapter used when no heading is found.
    /// `None` picks one from the dominant script of the input.
    pub fallback_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmented {
    pub chapters: Vec<Chapter>,
    pub rendered_content: String,
}

pub fn segment(raw_text: &str, rules: &HeadingRules) -> Segmented {
    segment_with(raw_text, rules, &SegmentOptions::default())
}

pub fn segment_with(raw_text: &str, rules: &HeadingRules, options: &SegmentOptions) -> Segmented {
    let lines = split_lines(raw_text);

    let mut rendered = String::with_capacity(raw_text.len() + raw_text.len() / 8);
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut container_open = false;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if idx == 0 && trimmed.is_empty() {
            continue;
        }

        if !trimmed.is_empty() && rules.is_heading(trimmed) {
            if container_open {
                rendered.push_str(CONTAINER_CLOSE);
            }
            let chapter = Chapter::new(trimmed, chapters.len() + 1, idx);
            push_heading(&mut rendered, &chapter);
            rendered.push_str(CONTAINER_OPEN);
            container_open = true;
            chapters.push(chapter);
            continue;
        }

        if !container_open {
            if trimmed.is_empty() {
                continue;
            }
            rendered.push_str(CONTAINER_OPEN);
            container_open = true;
        }
        push_escaped_line(&mut rendered, line);
    }

    if container_open {
        rendered.push_str(CONTAINER_CLOSE);
    }

    if chapters.is_empty() {
        return single_chapter(&lines, raw_text, options);
    }

    Segmented {
        chapters,
        rendered_content: rendered,
    }
}

/// Splits on `\n` and drops the `\r` of CRLF line endings.
pub fn split_lines(raw_text: &str) -> Vec<&str> {
    raw_text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Replaces the five HTML-sensitive characters. Nothing else is touched.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

fn push_escaped_line(out: &mut String, line: &str) {
    push_escaped(out, line);
    out.push('\n');
}

fn push_heading(out: &mut String, chapter: &Chapter) {
    out.push_str("<a class=\"chapter-anchor\" id=\"");
    out.push_str(&chapter.anchor_id);
    out.push_str("\"></a>\n<h2 class=\"chapter-title\">");
    push_escaped(out, &chapter.title);
    out.push_str("</h2>\n");
}

fn single_chapter(lines: &[&str], raw_text: &str, options: &SegmentOptions) -> Segmented {
    let title = options
        .fallback_title
        .clone()
        .unwrap_or_else(|| fallback_title_for(raw_text).to_owned());
    let chapter = Chapter::new(title, 1, 0);

    let mut body = lines.iter().filter(|line| !line.trim().is_empty()).peekable();
    if body.peek().is_none() {
        return Segmented {
            chapters: vec![chapter],
            rendered_content: String::new(),
        };
    }

    let mut rendered = String::with_capacity(raw_text.len() + 128);
    push_heading(&mut rendered, &chapter);
    rendered.push_str(CONTAINER_OPEN);
    for line in body {
        push_escaped_line(&mut rendered, line);
    }
    rendered.push_str(CONTAINER_CLOSE);

    Segmented {
        chapters: vec![chapter],
        rendered_content: rendered,
    }
}

/// `全文` when CJK ideographs outnumber other letters, `Full text` otherwise.
pub fn fallback_title_for(raw_text: &str) -> &'static str {
    let mut cjk = 0usize;
    let mut other = 0usize;
    for ch in raw_text.chars() {
        if is_cjk_ideograph(ch) {
            cjk += 1;
        } else if ch.is_alphabetic() {
            other += 1;
        }
    }
    if cjk > other {
        CJK_FALLBACK_TITLE
    } else {
        DEFAULT_FALLBACK_TITLE
    }
}

fn is_cjk_ideograph(ch: char) -> bool {
    matches!(ch, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}
