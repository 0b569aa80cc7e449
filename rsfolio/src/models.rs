use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use strum::Display;

use crate::config::PageNumber;

const ITALIC_FLAG: u32 = 1 << 1;
const BOLD_FLAG: u32 = 1 << 4;

/// Separator placed between the chapter body and its footnote definitions.
pub const FOOTNOTE_SEPARATOR: &str = "\n\n---\n\n";

static FOOTNOTE_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\n---\n\n(\[\^\d+\]:.*)$").unwrap());
static FOOTNOTE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[\^(\d+)\]:").unwrap());

/// The `Fragment` struct represents one run of uniformly styled text on a page.
///
/// # Fields
///
/// * `text` - The text content, including any surrounding spaces.
/// * `font` - The font name reported by the extractor.
/// * `size` - The font size in points.
/// * `flags` - Extractor style flags (bit 1 italic, bit 4 bold).
/// * `left` - The x-coordinate of the left edge.
/// * `right` - The x-coordinate of the right edge.
/// * `top` - The y-coordinate of the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub flags: u32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
}

impl Fragment {
    pub fn is_italic(&self) -> bool {
        self.flags & ITALIC_FLAG != 0 || self.font.contains("Italic")
    }

    pub fn is_bold(&self) -> bool {
        self.flags & BOLD_FLAG != 0 || self.font.contains("Bold")
    }

    pub fn is_bold_italic(&self) -> bool {
        self.is_bold() && self.is_italic()
    }

    /// A small, purely numeric fragment: an inline footnote marker.
    pub fn is_superscript(&self, threshold: f32) -> bool {
        let stripped = self.text.trim();
        self.size < threshold
            && !stripped.is_empty()
            && stripped.chars().all(|c| c.is_ascii_digit())
    }
}

/// The `Line` struct represents fragments sharing one baseline.
///
/// # Fields
///
/// * `fragments` - The fragments of the line, left to right.
/// * `x` - The x-coordinate of the leftmost fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub x: f32,
}

impl Line {
    pub fn new(x: f32) -> Line {
        Line {
            fragments: Vec::new(),
            x,
        }
    }

    /// Returns the fragment texts concatenated without any markup.
    pub fn raw_text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// The `Block` struct represents one geometric layout block of a page.
///
/// # Fields
///
/// * `lines` - The lines of the block, top to bottom.
/// * `x` - The x-coordinate of the leftmost line.
/// * `y` - The y-coordinate of the top of the block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub lines: Vec<Line>,
    pub x: f32,
    pub y: f32,
}

impl Block {
    pub fn new(x: f32, y: f32) -> Block {
        Block {
            lines: Vec::new(),
            x,
            y,
        }
    }

    pub fn first_fragment(&self) -> Option<&Fragment> {
        self.lines.first().and_then(|line| line.fragments.first())
    }

    pub fn first_line_x(&self) -> Option<f32> {
        self.lines.first().map(|line| line.x)
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.lines.iter().flat_map(|line| line.fragments.iter())
    }

    /// Largest font size in the block, ignoring footnote markers.
    pub fn max_font_size(&self, superscript_size: f32) -> f32 {
        self.fragments()
            .filter(|f| !f.is_superscript(superscript_size))
            .map(|f| f.size)
            .fold(0.0, f32::max)
    }

    /// Fragment texts joined with single spaces, used for footnote-area blocks.
    pub fn spaced_text(&self) -> String {
        self.fragments().map(|f| f.text.as_str()).collect::<Vec<_>>().join(" ").trim().to_string()
    }
}

/// The `Page` struct represents one page of the fragment dump.
///
/// # Fields
///
/// * `number` - Zero-based page index.
/// * `height` - The page height in points.
/// * `blocks` - Geometric blocks in top-to-bottom order.
/// * `text` - Plain text as reported by the extractor, if it provided one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: PageNumber,
    pub height: f32,
    pub blocks: Vec<Block>,
    pub text: Option<String>,
}

impl Page {
    pub fn new(number: PageNumber, height: f32) -> Page {
        Page {
            number,
            height,
            blocks: Vec::new(),
            text: None,
        }
    }

    /// Returns the plain text of the page, one source line per text line.
    ///
    /// When the extractor did not supply plain text it is rebuilt from the
    /// fragments, which keeps tab separators intact.
    pub fn plain_text(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        let mut text = String::new();
        for block in &self.blocks {
            for line in &block.lines {
                text.push_str(&line.raw_text());
                text.push('\n');
            }
        }
        text
    }
}

/// Block type assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum BlockKind {
    Normal,
    Poetry,
    Header,
    Subheading,
}

/// A geometric block after classification and inline rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedBlock {
    pub kind: BlockKind,
    pub text: String,
}

impl ClassifiedBlock {
    pub fn new(kind: BlockKind, text: String) -> ClassifiedBlock {
        ClassifiedBlock { kind, text }
    }

    /// Renders the block for the chapter body.
    ///
    /// Poetry with more than one line becomes a quote; a single-line poetry
    /// block is emitted as is.
    pub fn to_markdown(&self) -> String {
        match self.kind {
            BlockKind::Poetry if self.text.contains('\n') => {
                self.text.lines().map(|line| format!("> {}", line)).collect::<Vec<_>>().join("\n")
            }
            _ => self.text.clone(),
        }
    }
}

/// Classified blocks of one page plus the footnote definitions found at its bottom.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageContent {
    pub blocks: Vec<ClassifiedBlock>,
    pub footnotes: BTreeMap<u32, String>,
}

/// Mutable accumulator for footnote bodies, owned by a single extraction pass.
#[derive(Debug, Clone, Default)]
pub struct FootnoteStoreBuilder {
    entries: BTreeMap<u32, String>,
}

impl FootnoteStoreBuilder {
    pub fn new() -> FootnoteStoreBuilder {
        FootnoteStoreBuilder::default()
    }

    /// Records a footnote body, replacing an earlier one for the same number.
    pub fn insert(&mut self, number: u32, body: String) {
        if let Some(previous) = self.entries.get(&number) {
            if *previous != body {
                tracing::warn!(number, "footnote number reused with a different body");
            }
        }
        self.entries.insert(number, body);
    }

    pub fn extend(&mut self, entries: BTreeMap<u32, String>) {
        for (number, body) in entries {
            self.insert(number, body);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn freeze(self) -> FootnoteStore {
        FootnoteStore {
            entries: self.entries,
        }
    }
}

/// Immutable mapping from footnote number to footnote body.
///
/// Serialized as a flat JSON object with string keys in ascending numeric order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FootnoteStore {
    entries: BTreeMap<u32, String>,
}

impl FootnoteStore {
    pub fn get(&self, number: u32) -> Option<&str> {
        self.entries.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(n, body)| (*n, body.as_str()))
    }

    /// Numbers absent between the smallest and the largest stored footnote.
    pub fn missing_numbers(&self) -> Vec<u32> {
        let (Some(first), Some(last)) =
            (self.entries.keys().next(), self.entries.keys().next_back())
        else {
            return Vec::new();
        };
        (*first..=*last).filter(|n| !self.entries.contains_key(n)).collect()
    }

    /// Returns a new store with every body passed through `rewrite`.
    pub fn map_bodies<F>(&self, mut rewrite: F) -> FootnoteStore
    where
        F: FnMut(u32, &str) -> String,
    {
        FootnoteStore {
            entries: self.entries.iter().map(|(n, body)| (*n, rewrite(*n, body))).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize footnotes")
    }

    pub fn from_json(text: &str) -> Result<FootnoteStore> {
        serde_json::from_str(text).context("invalid footnotes JSON")
    }
}

impl From<BTreeMap<u32, String>> for FootnoteStore {
    fn from(entries: BTreeMap<u32, String>) -> Self {
        FootnoteStore { entries }
    }
}

/// The `ChapterDocument` struct represents one rendered markdown chapter.
///
/// # Fields
///
/// * `title` - Text of the level-1 heading, if the document has one.
/// * `body` - Body markdown without trailing whitespace.
/// * `footnotes` - Trailing footnote definitions keyed by number.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterDocument {
    pub title: Option<String>,
    pub body: String,
    pub footnotes: BTreeMap<u32, String>,
}

impl ChapterDocument {
    pub fn new(title: &str, body: String, footnotes: BTreeMap<u32, String>) -> ChapterDocument {
        ChapterDocument {
            title: Some(title.to_string()),
            body: body.trim_end().to_string(),
            footnotes,
        }
    }

    /// Splits rendered markdown back into heading, body and footnote section.
    pub fn from_markdown(content: &str) -> ChapterDocument {
        let (head, footnotes) = match FOOTNOTE_SECTION.captures(content) {
            Some(caps) => {
                let start = caps.get(0).map_or(content.len(), |m| m.start());
                let section = caps.get(1).map_or("", |m| m.as_str());
                (&content[..start], parse_definitions(section))
            }
            None => (content, BTreeMap::new()),
        };
        let head = head.trim_end();
        let (title, body) = match head.strip_prefix("# ") {
            Some(rest) => match rest.split_once('\n') {
                Some((title, body)) => (Some(title.trim().to_string()), body.trim_start()),
                None => (Some(rest.trim().to_string()), ""),
            },
            None => (None, head),
        };
        ChapterDocument {
            title,
            body: body.to_string(),
            footnotes,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut content = String::new();
        if let Some(title) = &self.title {
            content.push_str("# ");
            content.push_str(title);
            if !self.body.is_empty() {
                content.push_str("\n\n");
            }
        }
        content.push_str(&self.body);
        if !self.footnotes.is_empty() {
            content.push_str(FOOTNOTE_SEPARATOR);
            let definitions = self
                .footnotes
                .iter()
                .map(|(number, body)| format!("[^{}]: {}", number, body))
                .collect::<Vec<_>>();
            content.push_str(&definitions.join("\n\n"));
        }
        content.push('\n');
        content
    }
}

fn parse_definitions(section: &str) -> BTreeMap<u32, String> {
    let heads: Vec<(usize, usize, u32)> = FOOTNOTE_DEFINITION
        .captures_iter(section)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
            Some((whole.start(), whole.end(), number))
        })
        .collect();
    let mut definitions = BTreeMap::new();
    for (i, (_, body_start, number)) in heads.iter().enumerate() {
        let body_end = heads.get(i + 1).map_or(section.len(), |next| next.0);
        definitions.insert(*number, section[*body_start..body_end].trim().to_string());
    }
    definitions
}
