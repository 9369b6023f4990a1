//! Body text assembly from per-page text.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::landmarks::PAGE_BREAK_MARKER;

static REFERENCES_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bReferences\b").expect("valid regex"));

/// Join pages, each followed by a page-break marker line, and drop
/// everything from the first `References` heading on.
///
/// The heading match is case-sensitive so that prose mentioning
/// "references" in lower case does not truncate the body.
pub fn assemble_body_text(pages: &[String]) -> String {
    let mut body = String::new();
    for page in pages {
        body.push_str(page);
        body.push('\n');
        body.push_str(PAGE_BREAK_MARKER);
        body.push('\n');
    }

    match REFERENCES_HEADING_RE.find(&body) {
        Some(m) => body[..m.start()].to_string(),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn every_page_is_followed_by_a_marker() {
        let body = assemble_body_text(&pages(&["one", "two"]));
        assert_eq!(body, "one\n--- Page Break ---\ntwo\n--- Page Break ---\n");
    }

    #[test]
    fn body_is_cut_at_references_heading() {
        let body = assemble_body_text(&pages(&[
            "Abstract\nWe forecast.",
            "Results.\nReferences\n[1] Box and Jenkins",
        ]));
        assert!(body.ends_with("Results.\n"));
        assert!(!body.contains("Box and Jenkins"));
    }

    #[test]
    fn lowercase_references_does_not_cut() {
        let body = assemble_body_text(&pages(&["see the references below"]));
        assert!(body.contains("references below"));
    }

    #[test]
    fn references_inside_a_word_does_not_cut() {
        let body = assemble_body_text(&pages(&["CrossReferences are kept"]));
        assert!(body.contains("kept"));
    }

    #[test]
    fn no_pages_gives_empty_body() {
        assert_eq!(assemble_body_text(&[]), "");
    }
}
