use std::path::PathBuf;
use std::time::Duration;

use crate::chunk::{DEFAULT_MAX_CHAPTERS_PER_CHUNK, SplitPolicy};
use crate::patterns::HeadingRules;
use crate::position::DEFAULT_CAPTURE_INTERVAL_SECS;

pub const DEFAULT_TOC_TITLE_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub data_dir: PathBuf,
    pub max_chapters_per_chunk: usize,
    /// When set, split by line count instead of chapter count.
    pub split_lines: Option<usize>,
    pub uppercase_headings: bool,
    pub capture_interval: Duration,
    pub toc_title_chars: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("txtshelf-data"),
            max_chapters_per_chunk: DEFAULT_MAX_CHAPTERS_PER_CHUNK,
            split_lines: None,
            uppercase_headings: false,
            capture_interval: Duration::from_secs(DEFAULT_CAPTURE_INTERVAL_SECS),
            toc_title_chars: DEFAULT_TOC_TITLE_CHARS,
        }
    }
}

impl ReaderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ReaderConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let positive = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
        };

        Self {
            data_dir: lookup("TXTSHELF_DATA_DIR")
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_chapters_per_chunk: positive("TXTSHELF_MAX_CHAPTERS_PER_CHUNK")
                .unwrap_or(defaults.max_chapters_per_chunk),
            split_lines: positive("TXTSHELF_SPLIT_LINES"),
            uppercase_headings: lookup("TXTSHELF_UPPERCASE_HEADINGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.uppercase_headings),
            capture_interval: positive("TXTSHELF_CAPTURE_INTERVAL_SECS")
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.capture_interval),
            toc_title_chars: positive("TXTSHELF_TOC_TITLE_CHARS")
                .unwrap_or(defaults.toc_title_chars),
        }
    }

    pub fn heading_rules(&self) -> HeadingRules {
        HeadingRules::standard().with_uppercase_headings(self.uppercase_headings)
    }

    pub fn split_policy(&self) -> SplitPolicy {
        match self.split_lines {
            Some(lines) => SplitPolicy::LineCount(lines),
            None => SplitPolicy::ChapterCount(self.max_chapters_per_chunk),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
