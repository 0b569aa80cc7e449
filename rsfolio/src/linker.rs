//! Rebuilding of the footnote-definitions section of chapter files.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::models::{ChapterDocument, FootnoteStore};

static FOOTNOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\^(\d+)\]").unwrap());

/// Counts produced by linking one chapter.
///
/// # Fields
///
/// * `markers` - Distinct footnote markers in the body.
/// * `linked` - Definitions taken from the footnote store.
/// * `preserved` - Definitions kept from the chapter's previous section.
/// * `unresolved` - Marker numbers left without any definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub markers: usize,
    pub linked: usize,
    pub preserved: usize,
    pub unresolved: Vec<u32>,
}

/// Distinct footnote marker numbers appearing in `body`.
pub fn find_markers(body: &str) -> BTreeSet<u32> {
    FOOTNOTE_MARKER
        .captures_iter(body)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .collect()
}

/// Replaces the document's footnote section with one matching its markers.
///
/// Each marker gets the store's definition when there is one, otherwise the
/// definition the document already carried. Markers with neither are left
/// undefined and listed in the report.
pub fn link_document(document: &mut ChapterDocument, store: &FootnoteStore) -> LinkReport {
    let markers = find_markers(&document.body);
    let mut report = LinkReport {
        markers: markers.len(),
        ..LinkReport::default()
    };
    let mut definitions = BTreeMap::new();

    for number in markers {
        if let Some(body) = store.get(number) {
            definitions.insert(number, body.to_string());
            report.linked += 1;
        } else if let Some(body) = document.footnotes.remove(&number) {
            definitions.insert(number, body);
            report.preserved += 1;
        } else {
            report.unresolved.push(number);
        }
    }

    if !report.unresolved.is_empty() {
        tracing::warn!(
            title = document.title.as_deref().unwrap_or_default(),
            unresolved = ?report.unresolved,
            "footnote markers without definition"
        );
    }
    document.footnotes = definitions;
    report
}

/// Links the footnotes of a rendered chapter file.
///
/// A file with neither markers nor a footnote section is returned untouched.
pub fn link_markdown(content: &str, store: &FootnoteStore) -> (String, LinkReport) {
    let mut document = ChapterDocument::from_markdown(content);
    let had_section = !document.footnotes.is_empty();
    let report = link_document(&mut document, store);
    if report.markers == 0 && !had_section {
        return (content.to_string(), report);
    }
    (document.to_markdown(), report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FootnoteStore {
        let mut entries = BTreeMap::new();
        entries.insert(1, "Первая из хранилища.".to_string());
        entries.insert(2, "Вторая из хранилища.".to_string());
        entries.insert(9, "Не упомянута.".to_string());
        FootnoteStore::from(entries)
    }

    const CHAPTER: &str = "# Глава\n\nТекст [^1] и [^2], ещё [^3] и [^4]. Снова [^1].\n\n---\n\n[^2]: Старая вторая.\n\n[^3]: Старая третья,\nв две строки.\n\n[^7]: Лишняя.\n";

    #[test]
    fn test_find_markers() {
        let markers = find_markers("a [^3] b [^12] c [^3] [^x] [2]");
        assert_eq!(markers.into_iter().collect::<Vec<_>>(), vec![3, 12]);
    }

    #[test_log::test]
    fn test_link_prefers_store_and_preserves_fallback() {
        let (linked, report) = link_markdown(CHAPTER, &store());
        assert_eq!(
            linked,
            "# Глава\n\nТекст [^1] и [^2], ещё [^3] и [^4]. Снова [^1].\n\n---\n\n[^1]: Первая из хранилища.\n\n[^2]: Вторая из хранилища.\n\n[^3]: Старая третья,\nв две строки.\n"
        );
        assert_eq!(report.markers, 4);
        assert_eq!(report.linked, 2);
        assert_eq!(report.preserved, 1);
        assert_eq!(report.unresolved, vec![4]);
    }

    #[test_log::test]
    fn test_linking_is_idempotent() {
        let store = store();
        let (once, first) = link_markdown(CHAPTER, &store);
        let (twice, second) = link_markdown(&once, &store);
        assert_eq!(once, twice);
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_without_markers_is_untouched() {
        let content = "# Глава\n\nТекст без сносок.  \n";
        let (linked, report) = link_markdown(content, &store());
        assert_eq!(linked, content);
        assert_eq!(report, LinkReport::default());
    }

    #[test]
    fn test_stale_section_is_removed() {
        let content = "# Глава\n\nСноски убраны.\n\n---\n\n[^1]: Старая.\n";
        let (linked, report) = link_markdown(content, &store());
        assert_eq!(linked, "# Глава\n\nСноски убраны.\n");
        assert_eq!(report.markers, 0);
    }

    #[test]
    fn test_link_document_in_place() {
        let mut document = ChapterDocument::new("Т", "Слово [^2].".to_string(), BTreeMap::new());
        let report = link_document(&mut document, &store());
        assert_eq!(report.linked, 1);
        assert_eq!(document.footnotes.get(&2).unwrap(), "Вторая из хранилища.");
        assert_eq!(
            document.to_markdown(),
            "# Т\n\nСлово [^2].\n\n---\n\n[^2]: Вторая из хранилища.\n"
        );
    }
}
