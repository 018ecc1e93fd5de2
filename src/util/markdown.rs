//! Detect whether text already uses markdown formatting.

use std::sync::OnceLock;

use regex::Regex;

const MARKDOWN_PATTERN: &str = concat!(
    r"(?m)",
    r"(^#{1,6}\s)",
    r"|(^\s*([-*+]|\d+\.)\s+\S)",
    r"|(^>\s)",
    r"|(^\|.*\|\s*$)",
    r"|(```)",
    r"|(\*\*[^*\n]+\*\*)",
    r"|(\[[^\]\n]+\]\([^)\s]+\))",
);

static MARKDOWN: OnceLock<Option<Regex>> = OnceLock::new();

/// True when `text` contains headings, lists, quotes, tables, fences, bold
/// spans or links.
pub fn has_markdown_syntax(text: &str) -> bool {
    MARKDOWN
        .get_or_init(|| Regex::new(MARKDOWN_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_markdown() {
        assert!(has_markdown_syntax("# Title"));
        assert!(has_markdown_syntax("intro\n- item one"));
        assert!(has_markdown_syntax("1. first"));
        assert!(has_markdown_syntax("> quoted"));
        assert!(has_markdown_syntax("| a | b |"));
        assert!(has_markdown_syntax("see ```rust\nfn x() {}\n```"));
        assert!(has_markdown_syntax("this is **bold**"));
        assert!(has_markdown_syntax("[docs](https://example.com)"));
    }

    #[test]
    fn plain_text_is_not_markdown() {
        assert!(!has_markdown_syntax("30 degrees, clear"));
        assert!(!has_markdown_syntax(r#"{"city":"Shenzhen"}"#));
        assert!(!has_markdown_syntax("2 * 3 = 6"));
    }
}
