//! Conversion of the extractor's JSON dump into page models, plus footnote
//! persistence.
//!
//! The dump mirrors the per-page "dict" export of common PDF text extractors:
//! pages hold blocks, blocks hold lines, lines hold styled spans with
//! bounding boxes `[x0, y0, x1, y1]`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::config::PageNumber;
use crate::models::{Block, FootnoteStore, Fragment, Line, Page};

const TEXT_BLOCK: u8 = 0;

#[derive(Debug, Deserialize)]
struct RawDocument {
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    number: Option<PageNumber>,
    #[serde(default)]
    height: f32,
    text: Option<String>,
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(rename = "type", default)]
    kind: u8,
    bbox: [f32; 4],
    #[serde(default)]
    lines: Vec<RawLine>,
}

#[derive(Debug, Deserialize)]
struct RawLine {
    bbox: [f32; 4],
    #[serde(default)]
    spans: Vec<RawSpan>,
}

#[derive(Debug, Deserialize)]
struct RawSpan {
    text: String,
    #[serde(default)]
    font: String,
    size: f32,
    #[serde(default)]
    flags: u32,
    bbox: [f32; 4],
}

impl From<RawSpan> for Fragment {
    fn from(span: RawSpan) -> Self {
        Fragment {
            text: span.text,
            font: span.font,
            size: span.size,
            flags: span.flags,
            left: span.bbox[0],
            right: span.bbox[2],
            top: span.bbox[1],
        }
    }
}

fn convert_page(position: usize, raw: RawPage) -> Page {
    let mut page = Page::new(raw.number.unwrap_or(position), raw.height);
    page.text = raw.text;
    for raw_block in raw.blocks {
        if raw_block.kind != TEXT_BLOCK {
            continue;
        }
        let mut block = Block::new(raw_block.bbox[0], raw_block.bbox[1]);
        for raw_line in raw_block.lines {
            if raw_line.spans.is_empty() {
                continue;
            }
            let mut line = Line::new(raw_line.bbox[0]);
            line.fragments = raw_line.spans.into_iter().map(Fragment::from).collect();
            block.lines.push(line);
        }
        if !block.lines.is_empty() {
            page.blocks.push(block);
        }
    }
    page
}

/// Read access to the pages of a source document.
///
/// The assembler and the footnote extractor only need random access to
/// pages, which keeps them independent of where the pages come from.
pub trait PageSource {
    fn page_count(&self) -> usize;

    fn page(&self, number: PageNumber) -> Option<&Page>;

    fn page_text(&self, number: PageNumber) -> Option<String> {
        self.page(number).map(Page::plain_text)
    }
}

/// A fully loaded fragment dump.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    /// Builds a document; pages are addressed by their position.
    pub fn new(pages: Vec<Page>) -> Document {
        Document { pages }
    }

    pub fn from_json(text: &str) -> Result<Document> {
        let raw: RawDocument = serde_json::from_str(text).context("invalid fragment dump")?;
        let pages = raw
            .pages
            .into_iter()
            .enumerate()
            .map(|(position, page)| convert_page(position, page))
            .collect();
        Ok(Document { pages })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
}

impl PageSource for Document {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, number: PageNumber) -> Option<&Page> {
        self.pages.get(number)
    }
}

/// Loads a fragment dump from disk.
pub async fn load_document(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read fragment dump {}", path.display()))?;
    Document::from_json(&text).with_context(|| format!("while loading {}", path.display()))
}

pub async fn load_footnotes(path: &Path) -> Result<FootnoteStore> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read footnotes {}", path.display()))?;
    FootnoteStore::from_json(&text).with_context(|| format!("while loading {}", path.display()))
}

/// Writes the store as indented JSON with non-ASCII text kept literal.
pub async fn save_footnotes(path: &Path, store: &FootnoteStore) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = store.to_json()?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| anyhow!("failed to write footnotes {}: {}", path.display(), e))
}
