use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CHINESE_ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^第?[〇零一二三四五六七八九十百千万两壹贰叁肆伍陆柒捌玖拾佰仟\d]+[章节卷部篇回]")
        .expect("chinese ordinal heading regex")
});

static ENGLISH_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^chapter\s+(?:\d+|[ivxlcdm]+)\b").expect("chapter heading regex")
});

static ENGLISH_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^section\s+(?:\d+|[ivxlcdm]+)\b").expect("section heading regex")
});

static ROMAN_NUMERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(m{0,4}(?:cm|cd|d?c{0,3})(?:xc|xl|l?x{0,3})(?:ix|iv|v?i{0,3}))\.\s")
        .expect("roman numeral heading regex")
});

static DECIMAL_OUTLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+(?:\.\d+)*(?:\s|$)").expect("decimal outline heading regex")
});

static PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^part\s+\w+").expect("part heading regex"));

static PROLOGUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^prologue(?:$|[\s:.\-])").expect("prologue heading regex"));

static EPILOGUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^epilogue(?:$|[\s:.\-])").expect("epilogue heading regex"));

const UPPERCASE_MIN_CHARS: usize = 5;
const UPPERCASE_MAX_CHARS: usize = 100;

/// One heading convention. Variants are declared in priority order: when a
/// line matches several, the earliest variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingPattern {
    /// `第十章 风起`, `3回`, `第二卷`.
    ChineseOrdinal,
    /// `Chapter 12`, `CHAPTER IV`.
    EnglishChapter,
    /// `Section 3`.
    EnglishSection,
    /// `IV. The Storm`.
    RomanNumeral,
    /// `2.1 Scope`.
    DecimalOutline,
    /// `PART ONE`.
    Part,
    Prologue,
    Epilogue,
    /// Advisory fallback: a whole line in capitals. Shouted sentences match
    /// too, so it is never part of the standard set.
    UppercaseLine,
}

impl HeadingPattern {
    pub const STANDARD: [HeadingPattern; 8] = [
        HeadingPattern::ChineseOrdinal,
        HeadingPattern::EnglishChapter,
        HeadingPattern::EnglishSection,
        HeadingPattern::RomanNumeral,
        HeadingPattern::DecimalOutline,
        HeadingPattern::Part,
        HeadingPattern::Prologue,
        HeadingPattern::Epilogue,
    ];

    /// Lower is stronger.
    pub fn priority(self) -> u8 {
        self as u8
    }

    /// `line` is expected to be trimmed.
    pub fn matches(self, line: &str) -> bool {
        match self {
            HeadingPattern::ChineseOrdinal => CHINESE_ORDINAL.is_match(line),
            HeadingPattern::EnglishChapter => ENGLISH_CHAPTER.is_match(line),
            HeadingPattern::EnglishSection => ENGLISH_SECTION.is_match(line),
            HeadingPattern::RomanNumeral => ROMAN_NUMERAL
                .captures(line)
                .and_then(|caps| caps.get(1))
                .is_some_and(|numeral| !numeral.is_empty()),
            HeadingPattern::DecimalOutline => DECIMAL_OUTLINE.is_match(line),
            HeadingPattern::Part => PART.is_match(line),
            HeadingPattern::Prologue => PROLOGUE.is_match(line),
            HeadingPattern::Epilogue => EPILOGUE.is_match(line),
            HeadingPattern::UppercaseLine => is_uppercase_line(line),
        }
    }
}

fn is_uppercase_line(line: &str) -> bool {
    let len = line.chars().count();
    if !(UPPERCASE_MIN_CHARS..=UPPERCASE_MAX_CHARS).contains(&len) {
        return false;
    }
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

/// Ordered set of heading patterns used by the segmenter and the chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRules {
    patterns: Vec<HeadingPattern>,
}

impl HeadingRules {
    /// Builds a rule set from any selection of patterns. The result is
    /// always ordered by priority, without duplicates.
    pub fn new(patterns: impl IntoIterator<Item = HeadingPattern>) -> Self {
        let mut patterns = patterns.into_iter().collect::<Vec<_>>();
        patterns.sort_by_key(|p| p.priority());
        patterns.dedup();
        Self { patterns }
    }

    pub fn standard() -> Self {
        Self::new(HeadingPattern::STANDARD)
    }

    pub fn with_uppercase_headings(mut self, enabled: bool) -> Self {
        self.patterns.retain(|p| *p != HeadingPattern::UppercaseLine);
        if enabled {
            self.patterns.push(HeadingPattern::UppercaseLine);
        }
        self
    }

    pub fn patterns(&self) -> &[HeadingPattern] {
        &self.patterns
    }

    /// First pattern, in priority order, matching the trimmed line.
    pub fn classify(&self, line: &str) -> Option<HeadingPattern> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.patterns.iter().copied().find(|p| p.matches(line))
    }

    pub fn is_heading(&self, line: &str) -> bool {
        self.classify(line).is_some()
    }
}

impl Default for HeadingRules {
    fn default() -> Self {
        Self::standard()
    }
}
