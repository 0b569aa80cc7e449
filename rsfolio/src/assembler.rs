//! Chapter assembly from classified page content.
//!
//! Pages are walked strictly in ascending order. Two flags bound the output:
//! `started` opens the chapter at the block containing the start marker (the
//! marker block itself is not emitted) and `ended` closes it at the block
//! containing the end marker, discarding that block, everything after it and
//! the footnotes of the page it sits on.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use crate::classifier::classify_page;
use crate::cleaner::clean_markdown;
use crate::config::LayoutConfig;
use crate::converter::PageSource;
use crate::models::{ChapterDocument, FootnoteStoreBuilder};
use crate::registry::ChapterDescriptor;

/// Outcome of assembling one chapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyReport {
    pub pages: usize,
    pub blocks: usize,
    pub footnotes: usize,
    pub start_found: bool,
    pub end_found: bool,
}

pub struct ChapterAssembler<'a> {
    config: &'a LayoutConfig,
}

impl<'a> ChapterAssembler<'a> {
    pub fn new(config: &'a LayoutConfig) -> ChapterAssembler<'a> {
        ChapterAssembler { config }
    }

    /// Builds the chapter document described by `chapter`.
    ///
    /// # Errors
    ///
    /// Returns an error when the chapter's page range is empty or reaches
    /// past the end of the source document.
    pub fn assemble<S: PageSource>(
        &self,
        source: &S,
        chapter: &ChapterDescriptor,
    ) -> Result<(ChapterDocument, AssemblyReport)> {
        if chapter.end_page <= chapter.start_page {
            bail!("chapter '{}' has an empty page range", chapter.title);
        }
        if chapter.end_page > source.page_count() {
            bail!(
                "chapter '{}' needs pages {}..{} but the document has {} pages",
                chapter.title,
                chapter.start_page,
                chapter.end_page,
                source.page_count()
            );
        }

        let start_marker = chapter.start_marker.as_deref();
        let end_marker = chapter.end_marker.as_deref();
        let mut started = start_marker.is_none();
        let mut ended = false;
        let mut rendered: Vec<String> = Vec::new();
        let mut footnotes = FootnoteStoreBuilder::new();
        let mut pages = 0;

        for number in chapter.start_page..chapter.end_page {
            let page = source
                .page(number)
                .ok_or_else(|| anyhow!("page {} is missing from the document", number))?;
            let content = classify_page(page, self.config);
            pages += 1;

            for block in content.blocks.iter() {
                if end_marker.is_some_and(|marker| block.text.contains(marker)) {
                    ended = true;
                    break;
                }
                if !started {
                    if start_marker.is_some_and(|marker| block.text.contains(marker)) {
                        started = true;
                    }
                    continue;
                }
                rendered.push(block.to_markdown());
            }

            if ended {
                break;
            }
            footnotes.extend(content.footnotes);
        }

        if let Some(marker) = start_marker {
            if !started {
                tracing::warn!(chapter = %chapter.title, marker, "start marker not found, chapter is empty");
            }
        }
        if let Some(marker) = end_marker {
            if !ended {
                tracing::warn!(chapter = %chapter.title, marker, "end marker not found, read to the end of the range");
            }
        }

        let body = clean_markdown(&rendered.join("\n\n"));
        let report = AssemblyReport {
            pages,
            blocks: rendered.len(),
            footnotes: footnotes.len(),
            start_found: started,
            end_found: ended,
        };
        let store = footnotes.freeze();
        let definitions = store.iter().map(|(n, body)| (n, body.to_string())).collect();
        Ok((ChapterDocument::new(&chapter.title, body.trim().to_string(), definitions), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn assemble(
        pages: Vec<crate::models::Page>,
        chapter: &ChapterDescriptor,
    ) -> Result<(ChapterDocument, AssemblyReport)> {
        let config = LayoutConfig::default();
        ChapterAssembler::new(&config).assemble(&document(pages), chapter)
    }

    #[test_log::test]
    fn test_start_marker_excludes_preceding_and_trigger_blocks() {
        let pages = vec![page(
            0,
            vec![
                paragraph(100.0, "Блок A перед началом."),
                paragraph(150.0, "1. Автор учения"),
                paragraph(200.0, "Блок B после начала."),
            ],
        )];
        let chapter = ChapterDescriptor::new("Величие автора", 0, 1, "velichie-avtora")
            .with_markers(Some("1. Автор"), None);
        let (doc, report) = assemble(pages, &chapter).unwrap();
        assert!(doc.body.contains("Блок B"));
        assert!(!doc.body.contains("Блок A"));
        assert!(!doc.body.contains("1. Автор"));
        assert!(report.start_found);
    }

    #[test_log::test]
    fn test_end_marker_stops_and_drops_page_footnotes() {
        let pages = vec![
            page(0, vec![paragraph(100.0, "Текст[^1] главы."), text_block(54.0, 520.0, &["1 Первая сноска."])]),
            page(
                1,
                vec![
                    paragraph(100.0, "Последний абзац."),
                    paragraph(200.0, "3. Правила слушания"),
                    paragraph(300.0, "Следующая глава."),
                    text_block(54.0, 520.0, &["2 Чужая сноска."]),
                ],
            ),
            page(2, vec![paragraph(100.0, "Совсем другая глава.")]),
        ];
        let chapter = ChapterDescriptor::new("Глава", 0, 3, "glava")
            .with_markers(None, Some("3. Правила слушания"));
        let (doc, report) = assemble(pages, &chapter).unwrap();
        assert_eq!(doc.body, "Текст [^1] главы.\n\nПоследний абзац.");
        assert_eq!(doc.footnotes.len(), 1);
        assert_eq!(doc.footnotes.get(&1).unwrap(), "Первая сноска.");
        assert!(report.end_found);
        assert_eq!(report.pages, 2);
    }

    #[test_log::test]
    fn test_missing_start_marker_yields_empty_chapter() {
        let pages = vec![page(0, vec![paragraph(100.0, "Текст.")])];
        let chapter = ChapterDescriptor::new("Пусто", 0, 1, "pusto").with_markers(Some("нет такого"), None);
        let (doc, report) = assemble(pages, &chapter).unwrap();
        assert_eq!(doc.body, "");
        assert!(!report.start_found);
        assert_eq!(doc.to_markdown(), "# Пусто\n");
    }

    #[test]
    fn test_block_order_is_preserved_across_pages() {
        let pages = vec![
            page(0, vec![paragraph(100.0, "один"), paragraph(200.0, "два")]),
            page(1, vec![paragraph(100.0, "три"), paragraph(200.0, "четыре")]),
        ];
        let chapter = ChapterDescriptor::new("Порядок", 0, 2, "poryadok");
        let (doc, _) = assemble(pages, &chapter).unwrap();
        assert_eq!(doc.body, "один\n\nдва\n\nтри\n\nчетыре");
    }

    #[test]
    fn test_hyphen_joined_across_pages_and_poetry_quoted() {
        let pages = vec![
            page(0, vec![paragraph(100.0, "Нача-")]),
            page(
                1,
                vec![
                    paragraph(100.0, "ло текста."),
                    text_block(110.0, 200.0, &["Строка стиха,", "ещё строка."]),
                ],
            ),
        ];
        let chapter = ChapterDescriptor::new("Стихи", 0, 2, "stihi");
        let (doc, _) = assemble(pages, &chapter).unwrap();
        assert_eq!(doc.body, "Начало текста.\n\n> Строка стиха,\n> ещё строка.");
    }

    #[test]
    fn test_footnotes_sorted_numerically() {
        let pages = vec![
            page(0, vec![paragraph(100.0, "а"), text_block(54.0, 515.0, &["10 Десятая."])]),
            page(1, vec![paragraph(100.0, "б"), text_block(54.0, 515.0, &["9 Девятая."])]),
        ];
        let chapter = ChapterDescriptor::new("Сноски", 0, 2, "snoski");
        let (doc, _) = assemble(pages, &chapter).unwrap();
        let markdown = doc.to_markdown();
        assert!(markdown.ends_with("---\n\n[^9]: Девятая.\n\n[^10]: Десятая.\n"));
    }

    #[test]
    fn test_range_past_document_is_an_error() {
        let pages = vec![page(0, vec![paragraph(100.0, "а")])];
        let chapter = ChapterDescriptor::new("Далеко", 0, 5, "daleko");
        assert!(assemble(pages, &chapter).is_err());
    }
}
