use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Zero-based page index inside the loaded fragment dump.
pub type PageNumber = usize;

/// `LayoutConfig` holds the typographic thresholds used to classify blocks.
///
/// All coordinates are in points, measured from the top-left corner of the page.
/// The defaults describe the single typographic convention of the source book;
/// other layouts need re-tuned values.
///
/// # Fields
///
/// * `normal_left_margin` - Left edge of regular prose lines.
/// * `poetry_indent_threshold` - A first line starting strictly right of this is indented.
/// * `header_top_margin` - Blocks starting strictly above this may be running headers.
/// * `footnote_bottom_margin` - Blocks starting strictly below this belong to the footnote area.
/// * `subheading_font_size` - Indented blocks with a larger font are subheadings.
/// * `superscript_size` - Numeric fragments smaller than this are footnote markers.
/// * `bold_min_size` - Bold fragments at or above this size are rendered as strong emphasis.
/// * `header_min_size` - Bold-italic fragments at or above this size make a section header.
/// * `header_fonts` - Fonts used only by running headers.
/// * `ornament_fonts` - Font name fragments whose glyphs are decorative and dropped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub normal_left_margin: f32,
    pub poetry_indent_threshold: f32,
    pub header_top_margin: f32,
    pub footnote_bottom_margin: f32,
    pub subheading_font_size: f32,
    pub superscript_size: f32,
    pub bold_min_size: f32,
    pub header_min_size: f32,
    pub header_fonts: Vec<String>,
    pub ornament_fonts: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            normal_left_margin: 54.0,
            poetry_indent_threshold: 100.0,
            header_top_margin: 55.0,
            footnote_bottom_margin: 510.0,
            subheading_font_size: 10.5,
            superscript_size: 7.0,
            bold_min_size: 10.0,
            header_min_size: 9.0,
            header_fonts: vec!["PragmaticaBold-Reg".to_string(), "PragmaticaBook-Reg".to_string()],
            ornament_fonts: vec!["TibetanMachine".to_string()],
        }
    }
}

impl LayoutConfig {
    /// Reads a layout override from a JSON file.
    ///
    /// Missing keys keep their default values, so a file may contain only
    /// the thresholds that differ.
    pub fn from_json_file(path: &Path) -> Result<LayoutConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read layout config {}", path.display()))?;
        let config: LayoutConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid layout config {}", path.display()))?;
        Ok(config)
    }

    pub fn is_header_font(&self, font: &str) -> bool {
        self.header_fonts.iter().any(|f| f == font)
    }

    pub fn is_ornament_font(&self, font: &str) -> bool {
        self.ornament_fonts.iter().any(|f| font.contains(f.as_str()))
    }
}

/// `FootnoteConfig` describes the notes region at the end of a volume.
///
/// # Fields
///
/// * `start_page` / `end_page` - Half-open page range holding the notes.
/// * `first_number_ceiling` - Largest number accepted as the very first footnote.
/// * `lookahead` - How far past the open footnote a new number may jump.
/// * `stop_phrases` - Section titles that end the notes region.
/// * `ignored_lines` - Running titles skipped on every notes page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FootnoteConfig {
    pub start_page: PageNumber,
    pub end_page: PageNumber,
    pub first_number_ceiling: u32,
    pub lookahead: u32,
    pub stop_phrases: Vec<String>,
    pub ignored_lines: Vec<String>,
}

impl Default for FootnoteConfig {
    fn default() -> Self {
        FootnoteConfig {
            start_page: 512,
            end_page: 700,
            first_number_ceiling: 10,
            lookahead: 5,
            stop_phrases: vec![
                "ПРИЛОЖЕНИЯ".to_string(),
                "УКАЗАТЕЛЬ-ГЛОССАРИЙ".to_string(),
                "Примечания к приложениям".to_string(),
            ],
            ignored_lines: vec!["ПРИМЕЧАНИЯ".to_string(), "Примечания".to_string()],
        }
    }
}

impl FootnoteConfig {
    pub fn with_range(start_page: PageNumber, end_page: PageNumber) -> FootnoteConfig {
        FootnoteConfig {
            start_page,
            end_page,
            ..FootnoteConfig::default()
        }
    }
}
