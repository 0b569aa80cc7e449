//! Static chapter and cross-reference registries.
//!
//! The registries are plain immutable values: they are built once and then
//! handed to the assembler and the reference resolver explicitly.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::config::PageNumber;

/// `ChapterDescriptor` defines where one output chapter lives in the source document.
///
/// # Fields
///
/// * `title` - Chapter title, rendered as the level-1 heading.
/// * `start_page` - First page index (inclusive).
/// * `end_page` - Page index after the last page (exclusive).
/// * `slug` - Output identifier used in the file name.
/// * `start_marker` - Text whose first occurrence opens the chapter.
/// * `end_marker` - Text whose first occurrence closes the chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub title: String,
    pub start_page: PageNumber,
    pub end_page: PageNumber,
    pub slug: String,
    pub start_marker: Option<String>,
    pub end_marker: Option<String>,
}

impl ChapterDescriptor {
    pub fn new(title: &str, start_page: PageNumber, end_page: PageNumber, slug: &str) -> Self {
        ChapterDescriptor {
            title: title.to_string(),
            start_page,
            end_page,
            slug: slug.to_string(),
            start_marker: None,
            end_marker: None,
        }
    }

    pub fn with_markers(mut self, start_marker: Option<&str>, end_marker: Option<&str>) -> Self {
        self.start_marker = start_marker.map(str::to_string);
        self.end_marker = end_marker.map(str::to_string);
        self
    }

    /// Returns the output file name for the chapter at the given 1-based position.
    pub fn file_name(&self, number: usize) -> String {
        format!("{:02}-{}.md", number, self.slug)
    }
}

/// An ordered, validated list of chapters for one volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRegistry {
    chapters: Vec<ChapterDescriptor>,
}

impl ChapterRegistry {
    /// Builds a registry, rejecting chapters whose page range is empty.
    pub fn new(chapters: Vec<ChapterDescriptor>) -> Result<ChapterRegistry> {
        for chapter in chapters.iter() {
            if chapter.end_page <= chapter.start_page {
                bail!(
                    "chapter '{}' has an empty page range {}..{}",
                    chapter.title,
                    chapter.start_page,
                    chapter.end_page
                );
            }
        }
        Ok(ChapterRegistry { chapters })
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterDescriptor> {
        self.chapters.iter()
    }

    /// Resolves 1-based chapter numbers into `(number, descriptor)` pairs.
    ///
    /// An empty selection means every chapter. Any number outside the
    /// registry is a configuration error.
    pub fn select(&self, numbers: &[usize]) -> Result<Vec<(usize, &ChapterDescriptor)>> {
        if numbers.is_empty() {
            return Ok(self.chapters.iter().enumerate().map(|(i, c)| (i + 1, c)).collect());
        }
        let mut selected = Vec::with_capacity(numbers.len());
        for &number in numbers {
            if number == 0 || number > self.chapters.len() {
                bail!(
                    "chapter {} is out of range (registry has {} chapters)",
                    number,
                    self.chapters.len()
                );
            }
            selected.push((number, &self.chapters[number - 1]));
        }
        Ok(selected)
    }

    /// Lines used by the `--list` mode: `N. Title (pages start+1-end)`.
    pub fn listing(&self) -> Vec<String> {
        self.chapters
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {} (pages {}-{})", i + 1, c.title, c.start_page + 1, c.end_page))
            .collect()
    }
}

/// One row of the cross-reference table, in printed book pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub title: String,
    pub first_page: u32,
    pub last_page: u32,
    pub id: String,
}

impl ReferenceEntry {
    pub fn new(title: &str, first_page: u32, last_page: u32, id: &str) -> Self {
        ReferenceEntry {
            title: title.to_string(),
            first_page,
            last_page,
            id: id.to_string(),
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        self.first_page <= page && page <= self.last_page
    }
}

/// Book-page to chapter lookup used when rewriting "see page N" citations.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceTable {
    pub fn new(entries: Vec<ReferenceEntry>) -> ReferenceTable {
        ReferenceTable { entries }
    }

    /// Finds the chapter containing a printed page.
    ///
    /// Neighbouring chapters may share their boundary page; the earlier
    /// entry wins in that case.
    pub fn lookup(&self, page: u32) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|entry| entry.contains(page))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The table covering both volumes of the book.
    pub fn builtin() -> ReferenceTable {
        ReferenceTable::new(
            REFERENCE_ROWS
                .iter()
                .map(|(title, first, last, id)| ReferenceEntry::new(title, *first, *last, id))
                .collect(),
        )
    }
}

/// Volumes with a built-in chapter registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Volume {
    #[strum(to_string = "volume-1")]
    One,
    #[strum(to_string = "volume-2")]
    Two,
}

impl Volume {
    pub fn from_number(number: u8) -> Result<Volume> {
        match number {
            1 => Ok(Volume::One),
            2 => Ok(Volume::Two),
            _ => bail!("volume {} is not configured", number),
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Volume::One => 1,
            Volume::Two => 2,
        }
    }

    pub fn chapters(&self) -> Result<ChapterRegistry> {
        let rows = match self {
            Volume::One => VOLUME_1_ROWS,
            Volume::Two => VOLUME_2_ROWS,
        };
        ChapterRegistry::new(
            rows.iter()
                .map(|(title, start, end, slug, start_marker, end_marker)| {
                    ChapterDescriptor::new(title, *start, *end, slug)
                        .with_markers(*start_marker, *end_marker)
                })
                .collect(),
        )
    }
}

type ChapterRow = (
    &'static str,
    PageNumber,
    PageNumber,
    &'static str,
    Option<&'static str>,
    Option<&'static str>,
);

// Page indices are zero-based positions in the PDF, not printed page numbers.
const VOLUME_1_ROWS: &[ChapterRow] = &[
    ("Введение", 110, 116, "vvedenie", None, Some("1. Автор")),
    ("Величие автора", 114, 128, "velichie-avtora", Some("1. Автор"), Some("Дхарма, [о которой идет речь]")),
    ("Величие Дхармы", 126, 141, "velichie-dharmy", Some("Дхарма, [о которой идет речь]"), Some("3. Правила слушания")),
    ("Правила слушания и проповедования Дхармы", 139, 160, "pravila-slushaniya-i-propovedovaniya", Some("3. Правила слушания"), Some("Основа пути")),
    ("Вверение себя благому другу", 157, 195, "vverenie-sebya-blagomu-drugu", Some("Основа пути"), Some("II. Краткое изложение")),
    ("Краткое изложение правил практики", 192, 218, "kratkoe-izlozhenie-pravil-praktiki", Some("II. Краткое изложение"), Some("§2 Упразднение ложных")),
    ("Упразднение ложных представлений об аналитическом созерцании", 215, 230, "uprazdnenie-lozhnyh-predstavleniy", Some("§2 Упразднение ложных"), Some("после вверения")),
    ("Наделение смыслом благоприятного рождения", 227, 270, "nadelenie-smyslom-blagopriyatnogo-rozhdeniya", Some("после вверения"), Some("Здесь три [книги]")),
    ("Этап духовного развития низшей личности", 265, 270, "etap-nizshey-lichnosti", Some("Здесь три [книги]"), None),
    ("Памятование о смерти", 270, 294, "pamyatovanie-o-smerti", None, None),
    ("После смерти: счастливые и несчастные уделы", 294, 322, "posle-smerti", None, None),
    ("Обращение к Прибежищу", 322, 368, "obrashhenie-k-pribezhishhu", None, None),
    ("Общие размышления о законе кармы", 368, 377, "obshchie-razmyshleniya-o-zakone-karmy", None, None),
    ("Дурные пути кармы", 377, 419, "durnye-puti-karmy", None, None),
    ("Выбор правильного поведения", 419, 426, "vybor-pravilnogo-povedeniya", None, None),
    ("Очищение четырьмя силами", 426, 444, "ochishchenie-chetyrmya-silami", None, None),
    ("Этап духовного развития средней личности", 444, 452, "etap-sredney-lichnosti", None, None),
    ("Размышление о страдании", 452, 490, "razmyshlenie-o-stradanii", None, None),
    ("Истина источника — причины страдания", 490, 542, "istina-istochnika", None, None),
    ("Основы пути Освобождения", 542, 552, "osnovy-puti-osvobozhdeniya", None, None),
    ("Особенности трех практик", 552, 574, "osobennosti-treh-praktik", None, None),
    ("Этап духовного развития высшей личности", 574, 580, "etap-vysshey-lichnosti", None, None),
    ("Устремленность к Пробуждению", 580, 600, "ustremlennost-k-probuzhdeniyu", None, None),
    ("Основа пути Махаяны — сострадание", 600, 644, "osnova-puti-mahayany-sostradanie", None, None),
    ("Обретение устремленности к Пробуждению", 644, 686, "obretenie-ustremlennosti", None, None),
    ("Почему нельзя достичь Будды без метода и мудрости", 686, 706, "pochemu-nelzya-dostich-buddy", None, None),
    ("Этапы практики бодхисаттвы", 706, 730, "etapy-praktiki-bodhisattvy", None, None),
    ("Даяние", 730, 767, "dayanie", None, None),
    ("Нравственность", 767, 778, "nravstvennost", None, None),
    ("Терпение", 778, 822, "terpenie", None, None),
    ("Усердие", 822, 860, "userdie", None, None),
    ("Медитация", 860, 863, "meditatsiya", None, None),
    ("Мудрость", 863, 882, "mudrost", None, None),
];

// Volume 2: PDF index = printed page - 781.
const VOLUME_2_ROWS: &[ChapterRow] = &[
    ("Безмятежность и проникновение", 9, 33, "bezmyatezhnost-i-proniknovenie", None, None),
    ("Правила практики безмятежности", 33, 124, "pravila-praktiki-bezmyatezhnosti", None, None),
    ("Способы продвижения на основе безмятежности", 124, 149, "sposoby-prodvizheniya", None, None),
    ("Снаряжение для проникновения", 149, 166, "snaryazhenie-dlya-proniknoveniya", None, None),
    ("Определение объекта отрицания", 166, 299, "opredelenie-obekta-otritsaniya", None, None),
    ("Прасанга или сватантра", 299, 367, "prasanga-ili-svatantra", None, None),
    ("Как развить воззрение посредством прасанги", 367, 441, "kak-razvit-vozzrenie", None, None),
    ("Разновидности проникновения", 441, 447, "raznovidnosti-proniknoveniya", None, None),
    ("Правила освоения проникновения", 447, 488, "pravila-osvoeniya-proniknoveniya", None, None),
    ("Метод сочетания безмятежности и проникновения", 488, 500, "metod-sochetaniya", None, None),
    ("Особая практика Ваджраяны", 500, 504, "osobaya-praktika-vadzhrayany", None, None),
    ("Завершающие строфы и колофон", 504, 512, "zavershenie", None, None),
];

const REFERENCE_ROWS: &[(&str, u32, u32, &str)] = &[
    ("Введение", 3, 9, "1-01"),
    ("Величие автора", 7, 21, "1-02"),
    ("Величие Дхармы", 19, 34, "1-03"),
    ("Правила слушания и проповедования Дхармы", 32, 53, "1-04"),
    ("Вверение себя благому другу", 50, 88, "1-05"),
    ("Краткое изложение правил практики", 85, 111, "1-06"),
    ("Упразднение ложных представлений об аналитическом созерцании", 108, 123, "1-07"),
    ("Наделение смыслом благоприятного рождения", 120, 163, "1-08"),
    ("Этап духовного развития низшей личности", 158, 163, "1-09"),
    ("Памятование о смерти", 163, 187, "1-10"),
    ("После смерти: счастливые и несчастные уделы", 187, 215, "1-11"),
    ("Обращение к Прибежищу", 215, 261, "1-12"),
    ("Общие размышления о законе кармы", 261, 270, "1-13"),
    ("Дурные пути кармы", 270, 312, "1-14"),
    ("Выбор правильного поведения", 312, 319, "1-15"),
    ("Очищение четырьмя силами", 319, 337, "1-16"),
    ("Этап духовного развития средней личности", 337, 345, "1-17"),
    ("Размышление о страдании", 345, 383, "1-18"),
    ("Истина источника — причины страдания", 383, 435, "1-19"),
    ("Основы пути Освобождения", 435, 445, "1-20"),
    ("Особенности трех практик", 445, 467, "1-21"),
    ("Этап духовного развития высшей личности", 467, 473, "1-22"),
    ("Устремленность к Пробуждению", 473, 493, "1-23"),
    ("Основа пути Махаяны — сострадание", 493, 537, "1-24"),
    ("Обретение устремленности к Пробуждению", 537, 579, "1-25"),
    ("Почему нельзя достичь Будды без метода и мудрости", 579, 599, "1-26"),
    ("Этапы практики бодхисаттвы", 599, 623, "1-27"),
    ("Даяние", 623, 660, "1-28"),
    ("Нравственность", 660, 671, "1-29"),
    ("Терпение", 671, 715, "1-30"),
    ("Усердие", 715, 753, "1-31"),
    ("Медитация", 753, 756, "1-32"),
    ("Мудрость", 756, 775, "1-33"),
    ("Безмятежность и проникновение", 790, 814, "2-01"),
    ("Правила практики безмятежности", 814, 905, "2-02"),
    ("Способы продвижения на основе безмятежности", 905, 930, "2-03"),
    ("Снаряжение для проникновения", 930, 947, "2-04"),
    ("Определение объекта отрицания", 947, 1080, "2-05"),
    ("Прасанга или сватантра", 1080, 1148, "2-06"),
    ("Как развить воззрение посредством прасанги", 1148, 1222, "2-07"),
    ("Разновидности проникновения", 1222, 1228, "2-08"),
    ("Правила освоения проникновения", 1228, 1269, "2-09"),
    ("Метод сочетания безмятежности и проникновения", 1269, 1281, "2-10"),
    ("Особая практика Ваджраяны", 1281, 1285, "2-11"),
    ("Завершающие строфы и колофон", 1285, 1293, "2-12"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_builtin_registries_are_valid() {
        for volume in Volume::iter() {
            let registry = volume.chapters().unwrap();
            assert!(!registry.is_empty());
        }
        assert_eq!(Volume::One.chapters().unwrap().len(), 33);
        assert_eq!(Volume::Two.chapters().unwrap().len(), 12);
    }

    #[test]
    fn test_unknown_volume_is_an_error() {
        assert!(Volume::from_number(3).is_err());
        assert_eq!(Volume::from_number(2).unwrap(), Volume::Two);
        assert_eq!(Volume::Two.to_string(), "volume-2");
    }

    #[test]
    fn test_empty_page_range_rejected() {
        let chapters = vec![ChapterDescriptor::new("Broken", 10, 10, "broken")];
        assert!(ChapterRegistry::new(chapters).is_err());
    }

    #[test]
    fn test_select_chapters() {
        let registry = Volume::One.chapters().unwrap();
        let selected = registry.select(&[2, 10]).unwrap();
        assert_eq!(selected[0].0, 2);
        assert_eq!(selected[0].1.slug, "velichie-avtora");
        assert_eq!(selected[1].1.title, "Памятование о смерти");
        assert_eq!(registry.select(&[]).unwrap().len(), 33);
        assert!(registry.select(&[0]).is_err());
        assert!(registry.select(&[34]).is_err());
    }

    #[test]
    fn test_listing_and_file_name() {
        let registry = Volume::Two.chapters().unwrap();
        let listing = registry.listing();
        assert_eq!(listing[0], "1. Безмятежность и проникновение (pages 10-33)");
        let first = registry.iter().next().unwrap();
        assert_eq!(first.file_name(1), "01-bezmyatezhnost-i-proniknovenie.md");
    }

    #[test]
    fn test_reference_lookup() {
        let table = ReferenceTable::builtin();
        assert_eq!(table.lookup(170).unwrap().id, "1-10");
        assert_eq!(table.lookup(1000).unwrap().id, "2-05");
        // shared boundary page resolves to the earlier chapter
        assert_eq!(table.lookup(163).unwrap().id, "1-08");
        assert!(table.lookup(780).is_none());
        assert!(table.lookup(9999).is_none());
    }
}
