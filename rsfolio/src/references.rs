//! Rewriting of "see page N" citations into chapter links.
//!
//! Footnotes cite other parts of the book by printed page (`См. С. 170`,
//! `см.: С. 124–126`). Pages move between editions, chapters do not, so each
//! citation whose page falls inside a known chapter becomes a link to that
//! chapter. Citations outside every range are left as they are.

use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

use crate::models::FootnoteStore;
use crate::registry::{ReferenceEntry, ReferenceTable};

static PAGE_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([Сс]м)\.?\s*:?\s*[Сс]\.?\s*(\d+)(?:\s*[-–—]\s*(\d+))?").unwrap()
});

const LINK_BASE: &str = "/read/";

/// One rewritten citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub page: u32,
    pub title: String,
}

/// A rewritten store together with what changed in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFix {
    pub store: FootnoteStore,
    /// Footnotes that had at least one citation rewritten, in ascending order.
    pub changed: Vec<(u32, Vec<Replacement>)>,
}

impl ReferenceFix {
    pub fn total_replacements(&self) -> usize {
        self.changed.iter().map(|(_, replacements)| replacements.len()).sum()
    }
}

fn chapter_link(entry: &ReferenceEntry) -> String {
    format!("[«{}»]({}{})", entry.title, LINK_BASE, entry.id)
}

pub struct ReferenceResolver<'a> {
    table: &'a ReferenceTable,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(table: &'a ReferenceTable) -> ReferenceResolver<'a> {
        ReferenceResolver { table }
    }

    fn rewrite(&self, caps: &Captures, replacements: &mut Vec<Replacement>) -> String {
        let original = caps[0].to_string();
        let prefix = &caps[1];
        let Ok(first_page) = caps[2].parse::<u32>() else {
            return original;
        };
        let Some(start) = self.table.lookup(first_page) else {
            return original;
        };
        replacements.push(Replacement {
            page: first_page,
            title: start.title.clone(),
        });

        let end = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .and_then(|page| self.table.lookup(page));
        match end {
            Some(end) if end.title != start.title => format!(
                "{}. главы {} — {}",
                prefix,
                chapter_link(start),
                chapter_link(end)
            ),
            _ => format!("{}. главу {}", prefix, chapter_link(start)),
        }
    }

    /// Rewrites every resolvable citation in `text`.
    ///
    /// Returns the new text and one [`Replacement`] per rewritten citation.
    pub fn resolve(&self, text: &str) -> (String, Vec<Replacement>) {
        let mut replacements = Vec::new();
        let result = PAGE_CITATION
            .replace_all(text, |caps: &Captures| self.rewrite(caps, &mut replacements))
            .into_owned();
        (result, replacements)
    }

    /// Rewrites the citations of every footnote body in the store.
    pub fn fix_store(&self, store: &FootnoteStore) -> ReferenceFix {
        let mut changed = Vec::new();
        let fixed = store.map_bodies(|number, body| {
            let (text, replacements) = self.resolve(body);
            if !replacements.is_empty() {
                tracing::debug!(number, count = replacements.len(), "rewrote page citations");
                changed.push((number, replacements));
            }
            text
        });
        ReferenceFix {
            store: fixed,
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn table() -> ReferenceTable {
        ReferenceTable::new(vec![
            ReferenceEntry::new("Глава X", 163, 187, "1-10"),
            ReferenceEntry::new("Глава Y", 188, 215, "1-11"),
        ])
    }

    #[test]
    fn test_single_page_resolves_to_chapter_link() {
        let table = table();
        let resolver = ReferenceResolver::new(&table);
        let (text, replacements) = resolver.resolve("См. С. 170");
        assert_eq!(text, "См. главу [«Глава X»](/read/1-10)");
        assert!(text.contains("главу"));
        assert!(text.contains("/read/1-10"));
        assert_eq!(
            replacements,
            vec![Replacement {
                page: 170,
                title: "Глава X".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_page_is_left_unchanged() {
        let table = table();
        let resolver = ReferenceResolver::new(&table);
        let (text, replacements) = resolver.resolve("См. С. 9999");
        assert_eq!(text, "См. С. 9999");
        assert!(replacements.is_empty());
    }

    #[test]
    fn test_citation_variants() {
        let table = table();
        let resolver = ReferenceResolver::new(&table);
        let (text, _) = resolver.resolve("Подробнее см.: С. 200 и далее.");
        assert_eq!(text, "Подробнее см. главу [«Глава Y»](/read/1-11) и далее.");
        let (text, _) = resolver.resolve("(см. с.170)");
        assert_eq!(text, "(см. главу [«Глава X»](/read/1-10))");
    }

    #[test]
    fn test_page_ranges() {
        let table = table();
        let resolver = ReferenceResolver::new(&table);

        let (text, replacements) = resolver.resolve("См. С. 185–190.");
        assert_eq!(
            text,
            "См. главы [«Глава X»](/read/1-10) — [«Глава Y»](/read/1-11)."
        );
        assert_eq!(replacements.len(), 1);

        let (text, _) = resolver.resolve("см. С. 164-166");
        assert_eq!(text, "см. главу [«Глава X»](/read/1-10)");

        let (text, _) = resolver.resolve("см. С. 210 — 9000");
        assert_eq!(text, "см. главу [«Глава Y»](/read/1-11)");
    }

    #[test]
    fn test_fix_store_reports_changed_footnotes() {
        let mut entries = BTreeMap::new();
        entries.insert(1, "См. С. 170; см. С. 200.".to_string());
        entries.insert(2, "Без ссылок.".to_string());
        entries.insert(3, "См. С. 5.".to_string());
        let store = FootnoteStore::from(entries);

        let table = table();
        let fix = ReferenceResolver::new(&table).fix_store(&store);
        assert_eq!(fix.changed.len(), 1);
        assert_eq!(fix.changed[0].0, 1);
        assert_eq!(fix.total_replacements(), 2);
        assert_eq!(fix.store.get(2), Some("Без ссылок."));
        assert_eq!(fix.store.get(3), Some("См. С. 5."));
        assert!(fix.store.get(1).unwrap().contains("/read/1-11"));
    }

    #[test]
    fn test_builtin_table() {
        let table = ReferenceTable::builtin();
        let (text, _) = ReferenceResolver::new(&table).resolve("см. С. 170");
        assert!(text.contains("/read/1-10"));
    }
}
