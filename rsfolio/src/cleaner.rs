//! Markdown cleanup applied to an assembled chapter body.
//!
//! This module provides functionality for:
//! - Removing ornament glyphs and their leftovers
//! - Joining words hyphenated across line and page breaks
//! - Re-merging emphasis spans that a line break split in two
//! - Normalizing spacing around footnote markers and blank lines

use regex::Regex;
use std::sync::LazyLock;

const ORNAMENT_GLYPHS: [char; 3] = ['\u{f021}', '\u{f022}', '\u{f023}'];
const SOFT_HYPHEN: &str = "\u{00ad}";

static SOFT_HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{00AD}\s*").unwrap());
static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\p{Cyrillic}\p{Latin}])-\s+([\p{Cyrillic}\p{Latin}])").unwrap());
static SPLIT_ITALIC_HYPHENATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([\p{Cyrillic}\p{Latin}]+)-\*\s+\*([\p{Cyrillic}\p{Latin}]+)\*").unwrap()
});
static SPLIT_ITALIC_ADJACENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([\p{Cyrillic}\p{Latin}]+)\*\*([\p{Cyrillic}\p{Latin}]+)\*").unwrap()
});
static LETTER_BEFORE_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\p{Cyrillic}\p{Latin}])\[").unwrap());
static LETTER_AFTER_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]([\p{Cyrillic}\p{Latin}])").unwrap());
static REPEATED_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"  +").unwrap());
static BLANK_LINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Removes ornament glyphs and the lines reduced to a lone `]` by their removal.
pub fn strip_ornaments(text: &str) -> String {
    let text: String = text.chars().filter(|c| !ORNAMENT_GLYPHS.contains(c)).collect();
    text.split('\n').filter(|line| line.trim() != "]").collect::<Vec<_>>().join("\n")
}

/// Joins words broken at a line end.
///
/// A soft hyphen and the whitespace after it disappear outright; a hard
/// hyphen between two letters followed by whitespace is removed together
/// with that whitespace.
pub fn join_hyphenated(text: &str) -> String {
    let text = SOFT_HYPHEN_BREAK.replace_all(text, "");
    let text = text.replace(SOFT_HYPHEN, "");
    HYPHEN_BREAK.replace_all(&text, "$1$2").to_string()
}

/// Merges `*сло-* *во*` and `*сло**во*` back into `*слово*`.
pub fn merge_split_emphasis(text: &str) -> String {
    let text = SPLIT_ITALIC_HYPHENATED.replace_all(text, "*$1$2*");
    SPLIT_ITALIC_ADJACENT.replace_all(&text, "*$1$2*").to_string()
}

/// Puts a space between letters and brackets on both sides.
pub fn space_markers(text: &str) -> String {
    let text = LETTER_BEFORE_BRACKET.replace_all(text, "$1 [");
    LETTER_AFTER_BRACKET.replace_all(&text, "] $1").to_string()
}

/// Runs the full cleanup pipeline over a chapter body.
pub fn clean_markdown(text: &str) -> String {
    let text = strip_ornaments(text);
    let text = join_hyphenated(&text);
    let text = merge_split_emphasis(&text);
    let text = space_markers(&text);
    let text = REPEATED_SPACES.replace_all(&text, " ");
    let text = BLANK_LINE_RUNS.replace_all(&text, "\n\n");
    text.split('\n').map(str::trim_end).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_hyphen_across_line_break() {
        assert_eq!(join_hyphenated("сло-\nво"), "слово");
        assert_eq!(clean_markdown("сло-\nво"), "слово");
        assert_eq!(join_hyphenated("пере- ход"), "переход");
    }

    #[test]
    fn test_hyphen_inside_word_is_kept() {
        assert_eq!(join_hyphenated("кто-то"), "кто-то");
        assert_eq!(join_hyphenated("1- 2"), "1- 2");
        assert_eq!(join_hyphenated("слово - слово"), "слово - слово");
    }

    #[test]
    fn test_soft_hyphen_removed() {
        assert_eq!(join_hyphenated("при\u{ad}\nмер"), "пример");
        assert_eq!(join_hyphenated("при\u{ad}мер"), "пример");
    }

    #[test]
    fn test_merge_split_emphasis() {
        assert_eq!(merge_split_emphasis("*сло-* *во*"), "*слово*");
        assert_eq!(merge_split_emphasis("*сло**во*"), "*слово*");
        assert_eq!(merge_split_emphasis("*одно* *другое*"), "*одно* *другое*");
        assert_eq!(merge_split_emphasis("**жирный** *курсив*"), "**жирный** *курсив*");
    }

    #[test]
    fn test_space_markers() {
        assert_eq!(space_markers("слово[^3]дальше"), "слово [^3] дальше");
        assert_eq!(space_markers("слово [^3], дальше"), "слово [^3], дальше");
    }

    #[test]
    fn test_strip_ornaments() {
        let text = "начало \u{f021}\n]\nконец";
        assert_eq!(strip_ornaments(text), "начало \nконец");
    }

    #[test]
    fn test_clean_markdown_normalizes_whitespace() {
        let text = "# Глава\n\n\n\nАбзац  с  пробелами   \n\n\n**Раздел**\n";
        assert_eq!(clean_markdown(text), "# Глава\n\nАбзац с пробелами\n\n**Раздел**\n");
    }
}
