//! Block classification by geometry and typography.
//!
//! Classification is an ordered rule table: every rule pairs a predicate with
//! the handler that renders the block, and the first matching rule wins. The
//! order of [`RULES`] is the precedence:
//!
//! 1. footnote area (bottom of the page) feeds the page footnotes
//! 2. running headers and folios are dropped
//! 3. indented blocks set in a large font are subheadings
//! 4. other indented blocks of two or more lines are verse
//! 5. blocks with bold-italic text are section headers
//! 6. everything else is prose

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use strum::Display;

use crate::config::LayoutConfig;
use crate::formatter::format_line;
use crate::models::{Block, BlockKind, ClassifiedBlock, Page, PageContent};

static ROMAN_NUMERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[IVXLCDM]+$").unwrap());
static DECIMAL_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static LEAF_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*\p{L}?$").unwrap());
static FOOTNOTE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(\d+)\s+(.+)$").unwrap());
static REPEATED_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"  +").unwrap());

/// The role a geometric block plays on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BlockRole {
    FootnoteArea,
    PageHeader,
    Subheading,
    Poetry,
    Header,
    Normal,
}

type Predicate = fn(&Block, &LayoutConfig) -> bool;
type Handler = fn(&Block, &LayoutConfig, &mut BTreeMap<u32, String>) -> Option<ClassifiedBlock>;

/// One entry of the classification table.
pub struct ClassificationRule {
    pub role: BlockRole,
    pub matches: Predicate,
    pub handle: Handler,
}

pub static RULES: [ClassificationRule; 6] = [
    ClassificationRule {
        role: BlockRole::FootnoteArea,
        matches: is_footnote_area,
        handle: collect_footnote,
    },
    ClassificationRule {
        role: BlockRole::PageHeader,
        matches: is_page_header,
        handle: drop_block,
    },
    ClassificationRule {
        role: BlockRole::Subheading,
        matches: is_subheading,
        handle: render_subheading,
    },
    ClassificationRule {
        role: BlockRole::Poetry,
        matches: is_poetry,
        handle: render_poetry,
    },
    ClassificationRule {
        role: BlockRole::Header,
        matches: is_header,
        handle: render_header,
    },
    ClassificationRule {
        role: BlockRole::Normal,
        matches: always,
        handle: render_normal,
    },
];

pub fn is_footnote_area(block: &Block, config: &LayoutConfig) -> bool {
    block.y > config.footnote_bottom_margin
}

pub fn is_page_header(block: &Block, config: &LayoutConfig) -> bool {
    if block.y >= config.header_top_margin {
        return false;
    }
    let Some(first) = block.first_fragment() else {
        return false;
    };
    let text = first.text.trim();
    ROMAN_NUMERAL.is_match(text) || DECIMAL_NUMBER.is_match(text) || config.is_header_font(&first.font)
}

fn is_indented(block: &Block, config: &LayoutConfig) -> bool {
    block.first_line_x().is_some_and(|x| x > config.poetry_indent_threshold)
}

pub fn is_subheading(block: &Block, config: &LayoutConfig) -> bool {
    is_indented(block, config)
        && block.max_font_size(config.superscript_size) > config.subheading_font_size
}

pub fn is_poetry(block: &Block, config: &LayoutConfig) -> bool {
    is_indented(block, config) && !is_subheading(block, config) && block.lines.len() >= 2
}

pub fn is_header(block: &Block, config: &LayoutConfig) -> bool {
    block.fragments().any(|f| f.is_bold_italic() && f.size >= config.header_min_size)
}

fn always(_: &Block, _: &LayoutConfig) -> bool {
    true
}

/// A line holding only a leaf or folio number such as `12` or `3 б`.
pub fn is_leaf_number(text: &str) -> bool {
    LEAF_NUMBER.is_match(text.trim())
}

fn collect_footnote(
    block: &Block,
    _: &LayoutConfig,
    footnotes: &mut BTreeMap<u32, String>,
) -> Option<ClassifiedBlock> {
    let text = block.spaced_text();
    match FOOTNOTE_DEFINITION.captures(&text) {
        Some(caps) => match caps[1].parse::<u32>() {
            Ok(number) => {
                footnotes.insert(number, caps[2].trim().to_string());
            }
            Err(e) => tracing::debug!("footnote number out of range: {}", e),
        },
        None => tracing::debug!(text = %text, "discarding unnumbered footnote-area block"),
    }
    None
}

fn drop_block(_: &Block, _: &LayoutConfig, _: &mut BTreeMap<u32, String>) -> Option<ClassifiedBlock> {
    None
}

fn formatted_lines(block: &Block, config: &LayoutConfig) -> Vec<String> {
    block
        .lines
        .iter()
        .map(|line| format_line(&line.fragments, config).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

fn raw_lines(block: &Block) -> String {
    block
        .lines
        .iter()
        .map(|line| line.raw_text().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_subheading(
    block: &Block,
    config: &LayoutConfig,
    _: &mut BTreeMap<u32, String>,
) -> Option<ClassifiedBlock> {
    let text = formatted_lines(block, config).join(" ");
    if text.is_empty() {
        return None;
    }
    Some(ClassifiedBlock::new(BlockKind::Subheading, format!("### {}", text)))
}

fn render_poetry(
    block: &Block,
    config: &LayoutConfig,
    _: &mut BTreeMap<u32, String>,
) -> Option<ClassifiedBlock> {
    let lines = formatted_lines(block, config);
    if lines.is_empty() {
        return None;
    }
    Some(ClassifiedBlock::new(BlockKind::Poetry, lines.join("\n")))
}

// Header blocks are emphasis containers already, so no inline markup.
fn render_header(
    block: &Block,
    _: &LayoutConfig,
    _: &mut BTreeMap<u32, String>,
) -> Option<ClassifiedBlock> {
    let text = raw_lines(block);
    if text.is_empty() {
        return None;
    }
    Some(ClassifiedBlock::new(BlockKind::Header, format!("**{}**", text)))
}

fn render_normal(
    block: &Block,
    config: &LayoutConfig,
    _: &mut BTreeMap<u32, String>,
) -> Option<ClassifiedBlock> {
    let lines: Vec<String> = block
        .lines
        .iter()
        .map(|line| format_line(&line.fragments, config))
        .filter(|text| !text.trim().is_empty() && !is_leaf_number(text))
        .collect();
    let text = REPEATED_SPACES.replace_all(&lines.join(" "), " ").trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(ClassifiedBlock::new(BlockKind::Normal, text))
}

/// Returns the first rule whose predicate accepts the block.
pub fn match_rule(block: &Block, config: &LayoutConfig) -> &'static ClassificationRule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(block, config))
        .unwrap_or(&RULES[RULES.len() - 1])
}

pub fn classify_block(block: &Block, config: &LayoutConfig) -> BlockRole {
    match_rule(block, config).role
}

/// Classifies and renders one block.
///
/// Footnote-area blocks add to `footnotes` and yield nothing.
pub fn process_block(
    block: &Block,
    config: &LayoutConfig,
    footnotes: &mut BTreeMap<u32, String>,
) -> Option<ClassifiedBlock> {
    if block.lines.is_empty() {
        return None;
    }
    let rule = match_rule(block, config);
    (rule.handle)(block, config, footnotes)
}

/// Classifies every block of a page, keeping top-to-bottom order.
pub fn classify_page(page: &Page, config: &LayoutConfig) -> PageContent {
    let mut content = PageContent::default();
    for block in page.blocks.iter() {
        if let Some(classified) = process_block(block, config, &mut content.footnotes) {
            content.blocks.push(classified);
        }
    }
    tracing::debug!(
        page = page.number,
        blocks = content.blocks.len(),
        footnotes = content.footnotes.len(),
        "classified page"
    );
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn config() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn two_line_block(x: f32, size: f32) -> Block {
        styled_block(
            x,
            200.0,
            vec![
                vec![styled("первая строка", BODY_FONT, size, 0)],
                vec![styled("вторая строка", BODY_FONT, size, 0)],
            ],
        )
    }

    #[test]
    fn test_rule_order_is_documented_precedence() {
        let roles: Vec<BlockRole> = RULES.iter().map(|rule| rule.role).collect();
        assert_eq!(
            roles,
            vec![
                BlockRole::FootnoteArea,
                BlockRole::PageHeader,
                BlockRole::Subheading,
                BlockRole::Poetry,
                BlockRole::Header,
                BlockRole::Normal,
            ]
        );
    }

    #[test]
    fn test_indent_and_size_thresholds_are_exclusive() {
        let config = config();
        assert_eq!(classify_block(&two_line_block(100.0, 10.5), &config), BlockRole::Normal);
        assert_eq!(classify_block(&two_line_block(101.0, 10.5), &config), BlockRole::Poetry);
        assert_eq!(classify_block(&two_line_block(101.0, 11.5), &config), BlockRole::Subheading);
    }

    #[test]
    fn test_single_indented_line_is_not_poetry() {
        let block = text_block(120.0, 200.0, &["одна строка"]);
        assert_eq!(classify_block(&block, &config()), BlockRole::Normal);
    }

    #[test]
    fn test_subheading_ignores_marker_size() {
        let block = styled_block(
            120.0,
            200.0,
            vec![vec![styled("Заголовок", BODY_FONT, 10.0, 0), styled("3", BODY_FONT, 6.0, 0)]],
        );
        assert!(!is_subheading(&block, &config()));
    }

    #[test]
    fn test_page_header_detection() {
        let config = config();
        assert_eq!(classify_block(&text_block(200.0, 30.0, &["XIV"]), &config), BlockRole::PageHeader);
        assert_eq!(classify_block(&text_block(200.0, 30.0, &["123"]), &config), BlockRole::PageHeader);
        let running = styled_block(
            150.0,
            30.0,
            vec![vec![styled("ЛАМРИМ", "PragmaticaBook-Reg", 8.0, 0)]],
        );
        assert_eq!(classify_block(&running, &config), BlockRole::PageHeader);
        // same text lower on the page is content
        assert_eq!(classify_block(&text_block(54.0, 55.0, &["123"]), &config), BlockRole::Normal);
        assert_eq!(classify_block(&text_block(54.0, 30.0, &["Текст"]), &config), BlockRole::Normal);
    }

    #[test]
    fn test_footnote_area_feeds_page_footnotes() {
        let config = config();
        let mut footnotes = BTreeMap::new();
        let block = styled_block(
            54.0,
            515.0,
            vec![
                vec![styled("12", BODY_FONT, 8.0, 0), styled("Пояснение", BODY_FONT, 8.0, 0)],
                vec![styled("продолжение.", BODY_FONT, 8.0, 0)],
            ],
        );
        assert!(process_block(&block, &config, &mut footnotes).is_none());
        assert_eq!(footnotes.get(&12).unwrap(), "Пояснение продолжение.");

        let stray = text_block(54.0, 520.0, &["без номера"]);
        assert!(process_block(&stray, &config, &mut footnotes).is_none());
        assert_eq!(footnotes.len(), 1);
    }

    #[test]
    fn test_header_block_uses_raw_text() {
        let block = styled_block(
            120.0,
            200.0,
            vec![vec![styled("Раздел ", "Times-BoldItalic", 10.0, 0), styled("первый", "Times-BoldItalic", 10.0, 0)]],
        );
        let rendered = process_block(&block, &config(), &mut BTreeMap::new()).unwrap();
        assert_eq!(rendered.kind, BlockKind::Header);
        assert_eq!(rendered.text, "**Раздел первый**");
    }

    #[test]
    fn test_small_bold_italic_is_not_header() {
        let block = styled_block(54.0, 200.0, vec![vec![styled("мелко", "Times-BoldItalic", 8.0, 0)]]);
        assert_eq!(classify_block(&block, &config()), BlockRole::Normal);
    }

    #[test]
    fn test_normal_block_drops_leaf_numbers() {
        let block = styled_block(
            54.0,
            200.0,
            vec![
                vec![fragment("Начало  абзаца")],
                vec![fragment("12 б")],
                vec![fragment("и "), italic("конец")],
            ],
        );
        let rendered = process_block(&block, &config(), &mut BTreeMap::new()).unwrap();
        assert_eq!(rendered.kind, BlockKind::Normal);
        assert_eq!(rendered.text, "Начало абзаца и *конец*");
    }

    #[test]
    fn test_leaf_number_shapes() {
        assert!(is_leaf_number("12"));
        assert!(is_leaf_number(" 3 а "));
        assert!(is_leaf_number("7b"));
        assert!(!is_leaf_number("12 слов"));
        assert!(!is_leaf_number("глава 3"));
    }

    #[test]
    fn test_subheading_and_poetry_rendering() {
        let config = config();
        let heading = styled_block(
            130.0,
            200.0,
            vec![vec![styled("Большой ", BODY_FONT, 12.0, 0)], vec![styled("заголовок", BODY_FONT, 12.0, 0)]],
        );
        let rendered = process_block(&heading, &config, &mut BTreeMap::new()).unwrap();
        assert_eq!(rendered.text, "### Большой заголовок");

        let verse = text_block(110.0, 200.0, &[" Строфа первая ", "строфа вторая"]);
        let rendered = process_block(&verse, &config, &mut BTreeMap::new()).unwrap();
        assert_eq!(rendered.kind, BlockKind::Poetry);
        assert_eq!(rendered.text, "Строфа первая\nстрофа вторая");
    }

    #[test]
    fn test_classify_page_preserves_order() {
        let page = page(
            0,
            vec![
                text_block(200.0, 20.0, &["15"]),
                paragraph(100.0, "Первый абзац."),
                text_block(110.0, 150.0, &["стих один", "стих два"]),
                paragraph(300.0, "Второй абзац."),
                text_block(54.0, 520.0, &["1 Сноска."]),
            ],
        );
        let content = classify_page(&page, &config());
        let texts: Vec<&str> = content.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Первый абзац.", "стих один\nстих два", "Второй абзац."]);
        assert_eq!(content.footnotes.get(&1).unwrap(), "Сноска.");
    }
}
