//! Structural anchors located in extracted body text.
//!
//! Pure and deterministic: the same text always yields the same offsets.
//! Offsets count characters, not bytes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Marker inserted between pages by the body-text assembly.
pub const PAGE_BREAK_MARKER: &str = "--- Page Break ---";

/// Sentinel reported for an anchor that was not found.
pub const NOT_FOUND: i64 = -1;

static ABSTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)A\s*B\s*S\s*T\s*R\s*A\s*C\s*T|ABSTRACT").expect("valid regex")
});
static KEYWORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Keywords|Key words|Index Terms").expect("valid regex"));
static INTRODUCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)1\.\sIntroduction|Introduction").expect("valid regex"));
static REFERENCES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)References|Bibliography").expect("valid regex"));
static PAGE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)--- Page Break ---").expect("valid regex"));

/// Character offset of each anchor, `None` when the pattern never matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Landmarks {
    pub abstract_start: Option<usize>,
    pub keywords_start: Option<usize>,
    pub introduction_start: Option<usize>,
    pub references_start: Option<usize>,
    pub page_end: Option<usize>,
}

impl Landmarks {
    pub fn locate(text: &str) -> Self {
        Self {
            abstract_start: first_match(&ABSTRACT_RE, text),
            keywords_start: first_match(&KEYWORDS_RE, text),
            introduction_start: first_match(&INTRODUCTION_RE, text),
            references_start: first_match(&REFERENCES_RE, text),
            page_end: first_match(&PAGE_END_RE, text),
        }
    }

    /// Neither the abstract nor the introduction was found, which usually
    /// means the text layer is missing or garbled.
    pub fn missing_front_matter(&self) -> bool {
        self.abstract_start.is_none() && self.introduction_start.is_none()
    }

    /// Landmark name to offset, with `-1` for anchors that were not found.
    pub fn sentinel_map(&self) -> BTreeMap<&'static str, i64> {
        let as_sentinel = |offset: Option<usize>| offset.map_or(NOT_FOUND, |o| o as i64);
        BTreeMap::from([
            ("abstract_start", as_sentinel(self.abstract_start)),
            ("keywords_start", as_sentinel(self.keywords_start)),
            ("introduction_start", as_sentinel(self.introduction_start)),
            ("references_start", as_sentinel(self.references_start)),
            ("page_end", as_sentinel(self.page_end)),
        ])
    }
}

fn first_match(pattern: &Regex, text: &str) -> Option<usize> {
    pattern
        .find(text)
        .map(|m| text[..m.start()].chars().count())
}

/// The first `count` characters of `text`.
pub fn char_prefix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Up to `count` characters of `text` starting at character `start`.
pub fn char_window(text: &str, start: usize, count: usize) -> &str {
    let from = match text.char_indices().nth(start) {
        Some((byte_idx, _)) => byte_idx,
        None => return "",
    };
    char_prefix(&text[from..], count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_standard_front_matter() {
        let text = "Title\nABSTRACT\nWe forecast.\nKeywords: demand\n1. Introduction\nBody";
        let marks = Landmarks::locate(text);
        assert_eq!(marks.abstract_start, Some(6));
        assert_eq!(marks.keywords_start, text.find("Keywords"));
        assert_eq!(marks.introduction_start, text.find("1. Introduction"));
        assert_eq!(marks.references_start, None);
        assert_eq!(marks.page_end, None);
        assert!(!marks.missing_front_matter());
    }

    #[test]
    fn matches_are_case_insensitive() {
        let marks = Landmarks::locate("the abstract says... index terms: x. introduction");
        assert!(marks.abstract_start.is_some());
        assert!(marks.keywords_start.is_some());
        assert!(marks.introduction_start.is_some());
    }

    #[test]
    fn letter_spaced_abstract_heading_is_found() {
        let marks = Landmarks::locate("A B S T R A C T\nText");
        assert_eq!(marks.abstract_start, Some(0));
    }

    #[test]
    fn garbled_text_misses_front_matter() {
        let marks = Landmarks::locate("%%$# 0x3f ~~ \u{fffd}\u{fffd}");
        assert!(marks.missing_front_matter());
        assert_eq!(marks.sentinel_map()["abstract_start"], NOT_FOUND);
        assert_eq!(marks.sentinel_map()["introduction_start"], NOT_FOUND);
    }

    #[test]
    fn empty_text_finds_nothing() {
        assert_eq!(Landmarks::locate(""), Landmarks::default());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let text = "Résumé — ABSTRACT";
        let marks = Landmarks::locate(text);
        assert_eq!(marks.abstract_start, Some(9));
        assert_ne!(text.find("ABSTRACT"), Some(9));
    }

    #[test]
    fn page_break_marker_is_located() {
        let text = format!("page one\n{PAGE_BREAK_MARKER}\npage two");
        let marks = Landmarks::locate(&text);
        assert_eq!(marks.page_end, Some(9));
    }

    #[test]
    fn first_occurrence_wins() {
        let marks = Landmarks::locate("Introduction ... Introduction");
        assert_eq!(marks.introduction_start, Some(0));
    }

    #[test]
    fn char_prefix_handles_short_and_multibyte_text() {
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("", 5), "");
    }

    #[test]
    fn char_window_clamps_to_text() {
        assert_eq!(char_window("0123456789", 3, 4), "3456");
        assert_eq!(char_window("0123", 2, 200), "23");
        assert_eq!(char_window("0123", 9, 2), "");
    }
}
