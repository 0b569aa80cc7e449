//! Footnote extraction from the notes region at the end of a volume.
//!
//! The notes region is plain text where every footnote starts with its number,
//! either alone on a line or followed by a tab and the first words of the body.
//! Bodies themselves contain bare numbers (lists, years, citations), so a
//! number only opens a new footnote when it is plausible for the running
//! sequence. [`FootnoteRecognizer`] is that sequence tracker, a two-state
//! machine fed one line at a time.

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::sync::LazyLock;

use crate::config::{FootnoteConfig, PageNumber};
use crate::converter::PageSource;
use crate::models::{FootnoteStore, FootnoteStoreBuilder};

static NUMBER_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,4})$").unwrap());
static NUMBER_TAB_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,4})\t\s*(.+)$").unwrap());
static RUNNING_PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Where the recognizer stands in the footnote sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerState {
    /// No footnote has been opened yet.
    Idle,
    /// Footnote `number` is open and collecting body lines.
    Open { number: u32, body: Vec<String> },
}

/// Joins collected body lines into one footnote text.
pub fn finalize_body(lines: &[String]) -> String {
    let text = lines.join(" ").replace('\u{00ad}', "");
    WHITESPACE_RUNS.replace_all(&text, " ").trim().to_string()
}

/// Sequential footnote-number recognizer.
#[derive(Debug)]
pub struct FootnoteRecognizer {
    first_number_ceiling: u32,
    lookahead: u32,
    state: RecognizerState,
    store: FootnoteStoreBuilder,
}

impl FootnoteRecognizer {
    pub fn new(first_number_ceiling: u32, lookahead: u32) -> FootnoteRecognizer {
        FootnoteRecognizer {
            first_number_ceiling,
            lookahead,
            state: RecognizerState::Idle,
            store: FootnoteStoreBuilder::new(),
        }
    }

    pub fn from_config(config: &FootnoteConfig) -> FootnoteRecognizer {
        FootnoteRecognizer::new(config.first_number_ceiling, config.lookahead)
    }

    pub fn state(&self) -> &RecognizerState {
        &self.state
    }

    pub fn current_number(&self) -> Option<u32> {
        match &self.state {
            RecognizerState::Idle => None,
            RecognizerState::Open { number, .. } => Some(*number),
        }
    }

    /// Whether `candidate` may open the next footnote.
    ///
    /// The first footnote must be small; later ones must move forward by at
    /// most `lookahead`, which tolerates a few numbers lost by the extractor.
    pub fn is_plausible(&self, candidate: u32) -> bool {
        match &self.state {
            RecognizerState::Idle => (1..=self.first_number_ceiling).contains(&candidate),
            RecognizerState::Open { number, .. } => {
                candidate > *number && candidate <= number.saturating_add(self.lookahead)
            }
        }
    }

    /// Processes one source line of the notes region.
    pub fn feed_line(&mut self, line: &str) {
        let stripped = line.trim();

        if let Some(caps) = NUMBER_ONLY.captures(stripped) {
            match caps[1].parse::<u32>() {
                Ok(number) if self.is_plausible(number) => self.open(number, None),
                _ => self.append(stripped),
            }
            return;
        }

        if let Some(caps) = NUMBER_TAB_TEXT.captures(line) {
            match caps[1].parse::<u32>() {
                Ok(number) if self.is_plausible(number) => {
                    let first = caps[2].trim().to_string();
                    self.open(number, Some(first));
                }
                _ => self.append(stripped),
            }
            return;
        }

        if !stripped.is_empty() {
            self.append(stripped);
        }
    }

    /// Closes the open footnote and returns everything recognized.
    pub fn finish(mut self) -> FootnoteStore {
        self.close_open();
        self.store.freeze()
    }

    fn open(&mut self, number: u32, first_line: Option<String>) {
        self.close_open();
        let body = first_line.into_iter().filter(|text| !text.is_empty()).collect();
        self.state = RecognizerState::Open { number, body };
    }

    fn append(&mut self, text: &str) {
        match &mut self.state {
            RecognizerState::Open { body, .. } => body.push(text.to_string()),
            RecognizerState::Idle => tracing::debug!(text, "text before the first footnote"),
        }
    }

    fn close_open(&mut self) {
        let state = std::mem::replace(&mut self.state, RecognizerState::Idle);
        if let RecognizerState::Open { number, body } = state {
            let text = finalize_body(&body);
            if text.is_empty() {
                tracing::debug!(number, "footnote without body dropped");
            } else {
                self.store.insert(number, text);
            }
        }
    }
}

/// Result of scanning the notes region.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteExtraction {
    pub store: FootnoteStore,
    pub pages_read: usize,
    /// Page and phrase that ended the scan before the end of the range.
    pub stopped_at: Option<(PageNumber, String)>,
}

impl FootnoteExtraction {
    pub fn missing_numbers(&self) -> Vec<u32> {
        self.store.missing_numbers()
    }
}

fn is_skipped_line(stripped: &str, config: &FootnoteConfig) -> bool {
    config.ignored_lines.iter().any(|ignored| ignored == stripped)
        || RUNNING_PAGE_NUMBER.is_match(stripped)
}

/// Scans the notes region of `source` and collects every footnote body.
///
/// The range end is clamped to the document length. Scanning stops at the
/// first page mentioning one of the configured stop phrases.
///
/// # Errors
///
/// Returns an error when the range starts past the end of the document.
pub fn extract_footnotes<S: PageSource>(
    source: &S,
    config: &FootnoteConfig,
) -> Result<FootnoteExtraction> {
    let end = config.end_page.min(source.page_count());
    if config.start_page >= end {
        bail!(
            "footnote range {}..{} is outside a document of {} pages",
            config.start_page,
            config.end_page,
            source.page_count()
        );
    }

    let mut recognizer = FootnoteRecognizer::from_config(config);
    let mut stopped_at = None;
    let mut pages_read = 0;

    for number in config.start_page..end {
        let text = source
            .page_text(number)
            .ok_or_else(|| anyhow!("page {} is missing from the document", number))?;

        if let Some(phrase) = config.stop_phrases.iter().find(|phrase| text.contains(phrase.as_str())) {
            tracing::info!(page = number, phrase = %phrase, "end of the notes region");
            stopped_at = Some((number, phrase.clone()));
            break;
        }

        for line in text.split('\n') {
            if is_skipped_line(line.trim(), config) {
                continue;
            }
            recognizer.feed_line(line);
        }
        pages_read += 1;
    }

    let extraction = FootnoteExtraction {
        store: recognizer.finish(),
        pages_read,
        stopped_at,
    };
    let missing = extraction.missing_numbers();
    if !missing.is_empty() {
        tracing::warn!(count = missing.len(), first = ?&missing[..missing.len().min(20)], "missing footnote numbers");
    }
    tracing::info!(footnotes = extraction.store.len(), pages = pages_read, "extracted footnotes");
    Ok(extraction)
}
