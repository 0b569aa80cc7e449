//! Fixture builders for unit tests and downstream integration tests.
//!
//! The builders produce fragments, lines, blocks and pages with plausible
//! geometry so that tests only spell out what matters to them.

use crate::config::PageNumber;
use crate::converter::Document;
use crate::models::{Block, Fragment, Line, Page};

pub const BODY_FONT: &str = "Times-Roman";
pub const BODY_SIZE: f32 = 10.0;
pub const BODY_LEFT: f32 = 54.0;
pub const BODY_TOP: f32 = 120.0;

/// A plain body-text fragment.
pub fn fragment(text: &str) -> Fragment {
    styled(text, BODY_FONT, BODY_SIZE, 0)
}

/// A fragment with explicit font, size and style flags.
pub fn styled(text: &str, font: &str, size: f32, flags: u32) -> Fragment {
    Fragment {
        text: text.to_string(),
        font: font.to_string(),
        size,
        flags,
        left: BODY_LEFT,
        right: BODY_LEFT + text.chars().count() as f32 * size * 0.5,
        top: BODY_TOP,
    }
}

pub fn italic(text: &str) -> Fragment {
    styled(text, "Times-Italic", BODY_SIZE, 0)
}

pub fn bold(text: &str, size: f32) -> Fragment {
    styled(text, "Times-Bold", size, 0)
}

pub fn marker(number: u32) -> Fragment {
    styled(&number.to_string(), BODY_FONT, 6.0, 0)
}

pub fn line_at(x: f32, fragments: Vec<Fragment>) -> Line {
    Line { fragments, x }
}

/// A block whose lines all start at `x`, one plain fragment per line.
pub fn text_block(x: f32, y: f32, lines: &[&str]) -> Block {
    styled_block(x, y, lines.iter().map(|text| vec![fragment(text)]).collect())
}

/// A block whose lines all start at `x`, with caller-supplied fragments.
pub fn styled_block(x: f32, y: f32, lines: Vec<Vec<Fragment>>) -> Block {
    let mut block = Block::new(x, y);
    for (i, fragments) in lines.into_iter().enumerate() {
        let top = y + i as f32 * 12.0;
        let fragments = fragments.into_iter().map(|f| Fragment { top, ..f }).collect();
        block.lines.push(line_at(x, fragments));
    }
    block
}

/// A body paragraph at the regular left margin.
pub fn paragraph(y: f32, text: &str) -> Block {
    text_block(BODY_LEFT, y, &[text])
}

pub fn page(number: PageNumber, blocks: Vec<Block>) -> Page {
    let mut page = Page::new(number, 538.0);
    page.blocks = blocks;
    page
}

/// A page carrying only extractor plain text, as used in the notes region.
pub fn text_page(number: PageNumber, text: &str) -> Page {
    let mut page = Page::new(number, 538.0);
    page.text = Some(text.to_string());
    page
}

pub fn document(pages: Vec<Page>) -> Document {
    Document::new(pages)
}
